//! Ray queries against the scene
//!
//! A trace walks the entity list and then the brush list in order and
//! reports the first volume the ray passes through. It is a first-hit
//! query in list order, not a nearest-hit query: a far entity earlier in
//! the list wins over a near one later in the list, and every entity wins
//! over every brush.

use bitflags::bitflags;
use log::debug;

use super::entity::EntityType;
use super::handle::EntityKey;
use super::runtime::Simulation;
use super::scene::Scene;
use crate::config::defaults;
use crate::math::Vec3;

bitflags! {
    /// Categories a trace should pass through
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RayIgnore: u32 {
        const ENTITIES       = 0x01;
        const BRUSHES        = 0x02;
        /// Entities of type Brush (triggers, damageable brushes)
        const BRUSH_ENTITIES = 0x04;
        const NPCS           = 0x08;
        const PLAYERS        = 0x10;
    }
}

/// What a trace struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceHit {
    Entity(EntityKey),
    /// Index into [`Scene::brushes`]
    Brush(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Any length; normalized before use
    pub direction: Vec3,
    pub max_length: f32,
    pub hit: Option<TraceHit>,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            max_length: defaults::TRACE_LENGTH,
            hit: None,
        }
    }

    pub fn with_length(mut self, max_length: f32) -> Self {
        self.max_length = max_length;
        self
    }

    /// Point at full ray length
    pub fn end(&self) -> Vec3 {
        self.origin + self.direction.normalize() * self.max_length
    }

    /// Cast into `scene`, remembering the result in `self.hit`
    pub fn cast(&mut self, scene: &Scene, flags: RayIgnore, ignore: &[TraceHit]) -> bool {
        self.hit = trace(scene, self, flags, ignore, None);
        self.hit.is_some()
    }
}

/// Cast `ray` from the position of entity `from`, never hitting `from` itself
pub fn trace_from(
    scene: &Scene,
    from: EntityKey,
    direction: Vec3,
    flags: RayIgnore,
    ignore: &[TraceHit],
    max_length: f32,
) -> Option<TraceHit> {
    let origin = scene.get(from)?.position;
    let ray = Ray::new(origin, direction).with_length(max_length);
    trace(scene, &ray, flags, ignore, Some(from))
}

/// Cast from entity `from` toward entity `to`
pub fn trace_between(
    scene: &Scene,
    from: EntityKey,
    to: EntityKey,
    flags: RayIgnore,
    ignore: &[TraceHit],
    max_length: f32,
) -> Option<TraceHit> {
    let start = scene.get(from)?.position;
    let end = scene.get(to)?.position;
    trace_from(scene, from, end - start, flags, ignore, max_length)
}

/// First entity or brush struck by `ray`
///
/// With no `source`, an entity sitting exactly on the ray origin is skipped
/// (the caster is assumed to be standing there). Tool entities are never
/// hit. Explicit `ignore` entries are checked after the geometric test and
/// the scan continues past them.
pub fn trace(
    scene: &Scene,
    ray: &Ray,
    flags: RayIgnore,
    ignore: &[TraceHit],
    source: Option<EntityKey>,
) -> Option<TraceHit> {
    let direction = ray.direction.normalize();

    if !flags.contains(RayIgnore::ENTITIES) {
        for entity in scene.entities() {
            let skip = match entity.entity_type() {
                EntityType::Tool => true,
                EntityType::Brush => flags.contains(RayIgnore::BRUSH_ENTITIES),
                EntityType::Npc => flags.contains(RayIgnore::NPCS),
                EntityType::Player => flags.contains(RayIgnore::PLAYERS),
                _ => false,
            };
            if skip {
                continue;
            }
            let is_source = match source {
                Some(key) => entity.key() == key,
                None => entity.position == ray.origin,
            };
            if is_source {
                continue;
            }

            if !entity.world_bbox().ray_intersects(ray.origin, direction, ray.max_length) {
                continue;
            }
            let hit = TraceHit::Entity(entity.key());
            if ignore.contains(&hit) {
                continue;
            }
            debug!("trace from {} hit {}", ray.origin, entity);
            return Some(hit);
        }
    }

    if !flags.contains(RayIgnore::BRUSHES) {
        for (i, brush) in scene.brushes().iter().enumerate() {
            if !brush.bbox.ray_intersects(ray.origin, direction, ray.max_length) {
                continue;
            }
            let hit = TraceHit::Brush(i);
            if ignore.contains(&hit) {
                continue;
            }
            debug!("trace from {} hit brush \"{}\"", ray.origin, brush.id);
            return Some(hit);
        }
    }

    debug!("trace from {} toward {} hit nothing", ray.origin, ray.end());
    None
}

impl Simulation {
    /// Trace through the simulation's scene with the configured length
    pub fn trace(
        &self,
        origin: Vec3,
        direction: Vec3,
        flags: RayIgnore,
        ignore: &[TraceHit],
    ) -> Option<TraceHit> {
        let ray = Ray::new(origin, direction).with_length(self.config.trace_length);
        trace(&self.scene, &ray, flags, ignore, None)
    }

    /// Trace from entity `from`, never hitting it, with the configured length
    pub fn trace_from(
        &self,
        from: EntityKey,
        direction: Vec3,
        flags: RayIgnore,
        ignore: &[TraceHit],
    ) -> Option<TraceHit> {
        trace_from(&self.scene, from, direction, flags, ignore, self.config.trace_length)
    }
}
