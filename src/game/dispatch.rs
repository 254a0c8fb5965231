//! Entity event handling
//!
//! `on_event` is the single entry point for commands sent to an entity.
//! It matches on the event kind and the payload variant together; any
//! combination without a handler is ignored.
//!
//! | event            | payload           | effect                              |
//! |------------------|-------------------|-------------------------------------|
//! | `Kill`           | none              | death hook                          |
//! | `Delete`         | none              | removed at end of frame, then death |
//! | `TakeDamage`     | int / float       | damage, attacker = source           |
//! | `SetHealth`      | int / float       | health set directly                 |
//! | `SetPosition`    | vector            | position                            |
//! | `SetRotation`    | rotation          | rotation                            |
//! | `SetBoundingBox` | bounds            | bounding box                        |
//! | `SpawnEntity`    | entity            | spawner copies the payload          |
//! | `SpawnEntity`    | none              | spawner copies its prototype        |
//! | `PlaySound`      | none              | sound entity starts playing         |
//! | `StopSound`      | none              | sound entity stops                  |

use log::{debug, error, info, trace, warn};

use super::entity::{Entity, EntityKind, EntityType};
use super::event::{EntityEvent, EventValue};
use super::handle::EntityKey;
use super::runtime::Simulation;

impl Simulation {
    /// Deliver `event` (with an optional payload) to entity `key`
    pub fn on_event(
        &mut self,
        key: EntityKey,
        event: EntityEvent,
        value: Option<EventValue>,
        source: Option<EntityKey>,
    ) {
        if !self.scene.contains(key) {
            warn!("event {} sent to missing entity {}", event, key);
            return;
        }

        match (event, value) {
            (EntityEvent::Kill, None) => self.on_death(key),
            (EntityEvent::Delete, None) => {
                self.scene.remove_entity(key);
                self.on_death(key);
            }
            (EntityEvent::TakeDamage, Some(value)) => {
                if let Some(amount) = value.as_amount() {
                    self.take_damage(key, amount, source);
                }
            }
            (EntityEvent::SetHealth, Some(value)) => {
                if let (Some(health), Some(entity)) = (value.as_amount(), self.scene.get_mut(key)) {
                    entity.health = health;
                }
            }
            (EntityEvent::SetPosition, Some(EventValue::Vector(position))) => {
                if let Some(entity) = self.scene.get_mut(key) {
                    entity.position = position;
                }
            }
            (EntityEvent::SetRotation, Some(EventValue::Rotation(rotation))) => {
                if let Some(entity) = self.scene.get_mut(key) {
                    entity.rotation = rotation;
                }
            }
            (EntityEvent::SetBoundingBox, Some(EventValue::Bounds(bbox))) => {
                if let Some(entity) = self.scene.get_mut(key) {
                    entity.bbox = bbox;
                }
            }
            (EntityEvent::SpawnEntity, Some(EventValue::Entity(prototype))) => {
                self.spawn_from(key, &prototype);
            }
            (EntityEvent::SpawnEntity, None) => {
                let prototype = match self.scene.get(key).map(|e| &e.kind) {
                    Some(EntityKind::Spawner(spawner)) => spawner.prototype.clone(),
                    _ => None,
                };
                if let Some(prototype) = prototype {
                    self.spawn_from(key, &prototype);
                }
            }
            (EntityEvent::PlaySound, None) => self.play_sound(key),
            (EntityEvent::StopSound, None) => self.stop_sound(key),
            (event, value) => trace!("{} ignores {} with {:?}", key, event, value),
        }
    }

    // =========================================================================
    // Entity Spawner
    // =========================================================================

    /// Have spawner `key` place a copy of `prototype` at its position
    ///
    /// Returns the new entity's key. Tools are never spawned this way.
    pub fn spawn_from(&mut self, key: EntityKey, prototype: &Entity) -> Option<EntityKey> {
        let position = match self.scene.get(key) {
            Some(e) if matches!(e.kind, EntityKind::Spawner(_)) => e.position,
            _ => return None,
        };

        if prototype.entity_type() == EntityType::Tool {
            error!("spawner {} cannot spawn tool entity {}", key, prototype);
            return None;
        }

        let mut entity = prototype.instantiate();
        entity.position = position;
        if let Err(e) = entity.validate() {
            error!("spawner {} cannot spawn: {}", key, e);
            return None;
        }

        let spawned = self.scene.add_entity(entity);
        self.scene.generate_id(spawned);
        if let Err(e) = self.spawn(spawned) {
            error!("spawned entity failed to start: {}", e);
        }

        if let Some(EntityKind::Spawner(spawner)) = self.scene.get_mut(key).map(|e| &mut e.kind) {
            spawner.spawned += 1;
        }
        if let Some(e) = self.scene.get(spawned) {
            info!("spawned {} at {} (rotation {}, box {})", e, e.position, e.rotation, e.bbox);
        }
        Some(spawned)
    }

    // =========================================================================
    // Sound Entity
    // =========================================================================

    fn play_sound(&mut self, key: EntityKey) {
        let Some(sound) = self.scene.get_mut(key).and_then(|e| e.sound_mut()) else {
            return;
        };
        if sound.playing {
            warn!("can't play \"{}\": already playing", sound.audio_path);
            return;
        }

        let handle = self.audio.play_sound(&sound.audio_path, sound.volume, sound.repeats);
        match handle {
            Some(handle) => {
                sound.handle = Some(handle);
                sound.playing = true;
            }
            None => warn!("audio backend could not play \"{}\"", sound.audio_path),
        }
    }

    fn stop_sound(&mut self, key: EntityKey) {
        let Some(sound) = self.scene.get_mut(key).and_then(|e| e.sound_mut()) else {
            return;
        };
        if !sound.playing {
            return;
        }
        if let Some(handle) = sound.handle.take() {
            self.audio.stop_sound(handle);
        }
        sound.playing = false;
        debug!("stopped \"{}\"", sound.audio_path);
    }
}
