//! Fatal configuration errors
//!
//! These are content or programming mistakes: an entity with no type, or a
//! bounding box that is empty on some axis. They keep the entity out of the
//! live-update set and abort map loading. Everything else in the simulation
//! is a soft failure that is logged and skipped.

use thiserror::Error;

use crate::math::BoundingBox;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("entity '{id}' has no entity type")]
    UntypedEntity { id: String },

    /// mins must be below maxs on every axis
    #[error("entity '{id}' has an invalid bounding box {bbox}")]
    InvalidBoundingBox { id: String, bbox: BoundingBox },
}
