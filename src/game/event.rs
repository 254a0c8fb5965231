//! Entity events and lifecycle notifications
//!
//! Two kinds of traffic live here:
//!
//! - [`EntityEvent`] + [`EventValue`]: commands delivered to one entity's
//!   event handler (`Simulation::on_event`). Trigger brushes produce these.
//! - [`Events`]: per-frame notification queues that report what happened
//!   (spawns, damage, deaths, trigger fires, removals) to hosts, logs and
//!   tests. They are cleared when the next frame begins.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityType};
use super::handle::EntityKey;
use crate::math::{BoundingBox, Quat, Vec3};

/// Kind of command sent to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityEvent {
    #[default]
    None,
    Kill,
    Delete,
    SetHealth,
    TakeDamage,
    SetPosition,
    SetBoundingBox,
    SpawnEntity,
    SetRotation,
    PlaySound,
    StopSound,
}

impl fmt::Display for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Typed payload carried alongside an [`EntityEvent`]
///
/// `Entity` carries a full prototype rather than a handle: it is what an
/// entity spawner copies into the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Vector(Vec3),
    Rotation(Quat),
    Entity(Box<Entity>),
    Bounds(BoundingBox),
}

impl EventValue {
    /// Numeric payloads as a float, for events that accept either
    pub fn as_amount(&self) -> Option<f32> {
        match self {
            EventValue::Int(i) => Some(*i as f32),
            EventValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// A queue for events of a single type.
/// Events are collected during the frame and drained by whoever cares.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Iterate over events without clearing
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Drain all events (returns iterator and clears queue)
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle notifications raised during one frame
#[derive(Debug, Default)]
pub struct Events {
    /// Entity entered the live-update set
    pub spawned: EventQueue<SpawnEvent>,
    /// Health was reduced through damage
    pub damaged: EventQueue<DamageEvent>,
    /// Death hook ran (once per invocation, see [`DeathEvent::was_alive`])
    pub died: EventQueue<DeathEvent>,
    /// A trigger brush passed its policy and forwarded its events
    pub triggered: EventQueue<TriggerEvent>,
    /// Entity left the scene at end of frame
    pub removed: EventQueue<RemovedEvent>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all event queues. Called when a new frame begins.
    pub fn clear_all(&mut self) {
        self.spawned.clear();
        self.damaged.clear();
        self.died.clear();
        self.triggered.clear();
        self.removed.clear();
    }
}

// =============================================================================
// Notification Types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnEvent {
    pub entity: EntityKey,
    pub entity_type: EntityType,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent {
    pub target: EntityKey,
    /// Who dealt the damage (if any)
    pub source: Option<EntityKey>,
    pub amount: f32,
    /// Health after the hit; may be negative
    pub health: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathEvent {
    pub entity: EntityKey,
    /// Last recorded attacker
    pub killer: Option<EntityKey>,
    pub position: Vec3,
    /// False when the death hook ran on an already dead entity
    pub was_alive: bool,
    /// Violent death (health far below zero, or `on_xdeath` called directly)
    pub gibbed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub trigger: EntityKey,
    /// Entity that caused the fire; `None` on an exit edge
    pub activator: Option<EntityKey>,
    pub target_event: EntityEvent,
    /// Typed payloads forwarded (the untyped call is not counted)
    pub payloads: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovedEvent {
    pub entity: EntityKey,
    pub id: String,
}
