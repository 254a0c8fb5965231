//! Math primitives shared by the simulation
//!
//! - [`Vec3`]: positions, velocities, forces
//! - [`Quat`]: rotations
//! - [`BoundingBox`]: axis-aligned volumes with overlap and ray tests

mod bbox;
mod quat;
mod vec3;

pub use bbox::{BoundingBox, RAY_EPSILON};
pub use quat::Quat;
pub use vec3::Vec3;
