//! Simulation core
//!
//! Entities placed in a scene, advanced once per frame, talking to each
//! other through typed events.
//!
//! Key concepts:
//! - Entity: shared spatial/vital state plus a behaviour variant
//! - EntityKey: generational handle; relations never own their target
//! - Scene: sole owner of one map's entities and brushes
//! - Simulation: the context every operation runs against (scene, update
//!   registry, audio, tuning, notifications)
//! - Trigger brush: volume that forwards events when entities enter or leave
//! - Trace: first-hit ray query over the scene
//!
//! Single-threaded and run-to-completion: within a frame every update,
//! overlap test and event runs sequentially. Removals are deferred to the
//! end of the frame.

pub mod audio;
mod dispatch;
pub mod entity;
pub mod event;
pub mod handle;
mod lifecycle;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod tools;
pub mod trace;
pub mod trigger;

#[cfg(test)]
mod scenario_test;

pub use audio::{AudioBackend, NullAudio, SoundHandle};
pub use entity::{Entity, EntityKind, EntityType};
pub use event::{EntityEvent, EventValue, Events};
pub use handle::EntityKey;
pub use render::{HeadlessRenderer, RenderSnapshot, Renderer};
pub use runtime::{FrameClock, GameState, Simulation};
pub use scene::{Brush, Scene};
pub use tools::{EntitySpawner, SoundEntity};
pub use trace::{trace, trace_between, trace_from, Ray, RayIgnore, TraceHit};
pub use trigger::{TriggerBrush, TriggerBy, TriggerOn, TriggerType};
