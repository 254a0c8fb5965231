//! Renderer seam
//!
//! Each frame the driver hands the renderer a read-only [`RenderSnapshot`]
//! and asks whether the render surface is shutting down.

use log::{debug, trace};

use super::entity::EntityType;
use super::handle::EntityKey;
use crate::math::{BoundingBox, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub key: EntityKey,
    pub id: String,
    pub entity_type: EntityType,
    pub position: Vec3,
    /// World-space volume
    pub bbox: BoundingBox,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrushView {
    pub id: String,
    pub bbox: BoundingBox,
}

/// What the renderer may look at for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSnapshot {
    pub frame: u64,
    pub entities: Vec<EntityView>,
    pub brushes: Vec<BrushView>,
}

pub trait Renderer {
    fn render_frame(&mut self, snapshot: &RenderSnapshot);
    /// Polled before every frame; `true` stops the driver
    fn shutting_down(&self) -> bool;
}

/// Renderer without a surface that shuts down after a fixed frame count
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    frame_limit: u64,
    rendered: u64,
    last: Option<RenderSnapshot>,
}

impl HeadlessRenderer {
    pub fn for_frames(frame_limit: u64) -> Self {
        Self {
            frame_limit,
            rendered: 0,
            last: None,
        }
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Snapshot from the most recent frame
    pub fn last_snapshot(&self) -> Option<&RenderSnapshot> {
        self.last.as_ref()
    }
}

impl Renderer for HeadlessRenderer {
    fn render_frame(&mut self, snapshot: &RenderSnapshot) {
        self.rendered += 1;
        trace!(
            "frame {}: {} entities, {} brushes",
            snapshot.frame,
            snapshot.entities.len(),
            snapshot.brushes.len()
        );
        if self.rendered == self.frame_limit {
            debug!("headless renderer reached {} frames", self.frame_limit);
        }
        self.last = Some(snapshot.clone());
    }

    fn shutting_down(&self) -> bool {
        self.rendered >= self.frame_limit
    }
}
