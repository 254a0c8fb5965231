//! Entity lifecycle: spawn, per-frame update, damage and death
//!
//! Every hook takes the entity's key and looks it up in the scene; a key
//! that no longer resolves is a silent no-op.

use log::{debug, error, info, trace, warn};

use super::entity::{EntityKind, EntityType};
use super::event::{DamageEvent, DeathEvent, SpawnEvent, TriggerEvent};
use super::handle::EntityKey;
use super::runtime::Simulation;
use crate::error::ConfigError;
use crate::math::BoundingBox;

/// What an entity does in `update` beyond the box check
enum Behaviour {
    Move,
    Chase,
    Trigger,
    Sound,
    Idle,
}

impl Simulation {
    // =========================================================================
    // Spawn
    // =========================================================================

    /// Bring an entity to life and register it for per-frame updates
    ///
    /// Resets velocity, refills health, marks it alive, then runs the
    /// kind-specific spawn hook. Fails without registering when the entity
    /// has no type or an invalid box.
    pub fn spawn(&mut self, key: EntityKey) -> Result<(), ConfigError> {
        let Some(entity) = self.scene.get_mut(key) else {
            warn!("spawn: no entity {}", key);
            return Ok(());
        };

        if let Err(e) = entity.validate() {
            error!("refusing to spawn: {}", e);
            return Err(e);
        }

        entity.velocity = crate::math::Vec3::ZERO;
        entity.health = entity.max_health;
        entity.alive = true;

        let spawned = SpawnEvent {
            entity: key,
            entity_type: entity.entity_type(),
            position: entity.position,
        };
        debug!("spawned {} at {}", entity, entity.position);

        self.register(key);
        self.on_spawn(key);
        self.events.spawned.send(spawned);
        Ok(())
    }

    fn on_spawn(&mut self, key: EntityKey) {
        let Some(entity) = self.scene.get_mut(key) else {
            return;
        };
        match &mut entity.kind {
            EntityKind::Trigger(brush) => brush.reset(),
            EntityKind::Sound(sound) => {
                sound.playing = false;
                sound.handle = None;
            }
            _ => {}
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Per-frame update for one entity
    ///
    /// An entity whose box has become invalid is logged and dropped from the
    /// live-update set; the rest of the frame carries on.
    pub fn update_entity(&mut self, key: EntityKey, dt: f32) {
        let Some(entity) = self.scene.get(key) else {
            self.deregister(key);
            return;
        };

        if let Err(e) = entity.check_bbox() {
            error!("{}; removing it from updates", e);
            self.deregister(key);
            return;
        }

        let behaviour = match &entity.kind {
            EntityKind::Player => Behaviour::Move,
            EntityKind::Npc => Behaviour::Chase,
            EntityKind::Trigger(_) => Behaviour::Trigger,
            EntityKind::Sound(_) => Behaviour::Sound,
            _ => Behaviour::Idle,
        };

        match behaviour {
            Behaviour::Move => self.integrate(key, dt),
            Behaviour::Chase => {
                self.drop_lost_target(key);
                self.integrate(key, dt);
            }
            Behaviour::Trigger => self.update_trigger(key),
            Behaviour::Sound => self.update_sound(key),
            Behaviour::Idle => {}
        }
    }

    fn integrate(&mut self, key: EntityKey, dt: f32) {
        let config = self.config;
        if let Some(entity) = self.scene.get_mut(key) {
            entity.integrate(dt, &config);
        }
    }

    /// Point `key` at the entity with id `target`. Dead entities can't be targeted.
    pub fn set_target(&mut self, key: EntityKey, target: Option<&str>) -> bool {
        if let Some(id) = target {
            let alive = self.scene.find_entity(id).map(|t| t.alive).unwrap_or(false);
            if !alive {
                debug!("cannot target '{}': missing or dead", id);
                return false;
            }
        }
        match self.scene.get_mut(key) {
            Some(entity) => {
                entity.target = target.map(str::to_string);
                true
            }
            None => false,
        }
    }

    fn drop_lost_target(&mut self, key: EntityKey) {
        let Some(target) = self.scene.get(key).and_then(|e| e.target.clone()) else {
            return;
        };
        let alive = self.scene.find_entity(&target).map(|t| t.alive).unwrap_or(false);
        if !alive {
            if let Some(entity) = self.scene.get_mut(key) {
                debug!("{} lost target '{}'", entity, target);
                entity.target = None;
            }
        }
    }

    fn update_sound(&mut self, key: EntityKey) {
        let handle = self
            .scene
            .get_mut(key)
            .and_then(|e| e.sound_mut())
            .and_then(|s| s.handle);
        let playing = handle.map(|h| self.audio.is_playing(h)).unwrap_or(false);

        if let Some(sound) = self.scene.get_mut(key).and_then(|e| e.sound_mut()) {
            sound.playing = playing;
            if !playing {
                sound.handle = None;
            }
        }
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Overlap scan for a trigger brush
    ///
    /// First reports an exit edge if the previous occupant left, then walks
    /// a snapshot of the entity list and stops at the first candidate that
    /// fires the trigger.
    fn update_trigger(&mut self, key: EntityKey) {
        let Some(entity) = self.scene.get(key) else {
            return;
        };
        let Some(brush) = entity.trigger_brush() else {
            return;
        };
        let zone = entity.world_bbox();
        let previous = brush.previous_occupant;

        if let Some(occupant) = previous {
            let still_inside = self
                .scene
                .get(occupant)
                .map(|o| zone.intersects(&o.world_bbox()))
                .unwrap_or(false);
            if !still_inside {
                self.fire_trigger(key, None);
                if let Some(brush) = self.scene.get_mut(key).and_then(|e| e.trigger_brush_mut()) {
                    brush.previous_occupant = None;
                }
            }
        }

        let candidates: Vec<(EntityKey, EntityType, BoundingBox)> = self
            .scene
            .entities()
            .iter()
            .filter(|e| e.key() != key)
            .map(|e| (e.key(), e.entity_type(), e.world_bbox()))
            .collect();

        for (candidate, entity_type, bbox) in candidates {
            let finished = self
                .scene
                .get(key)
                .and_then(|e| e.trigger_brush())
                .map(|b| b.scan_finished())
                .unwrap_or(true);
            if finished {
                break;
            }

            if !zone.intersects(&bbox) {
                continue;
            }
            if self.fire_trigger(key, Some((candidate, entity_type))) {
                break;
            }
            if let Some(brush) = self.scene.get_mut(key).and_then(|e| e.trigger_brush_mut()) {
                if brush.note_occupant(candidate, entity_type) {
                    trace!("trigger {} watching {} for exit", key, candidate);
                }
            }
        }
    }

    /// Evaluate trigger `key` against `candidate` (`None` = occupant left)
    /// and fire it if the policy allows. Returns whether it fired.
    pub fn on_trigger(&mut self, key: EntityKey, candidate: Option<EntityKey>) -> bool {
        let candidate = match candidate {
            Some(c) => match self.scene.get(c) {
                Some(e) => Some((c, e.entity_type())),
                None => return false,
            },
            None => None,
        };
        self.fire_trigger(key, candidate)
    }

    fn fire_trigger(&mut self, key: EntityKey, candidate: Option<(EntityKey, EntityType)>) -> bool {
        let Some(brush) = self.scene.get(key).and_then(|e| e.trigger_brush()) else {
            return false;
        };

        if !brush.accepts(candidate) {
            trace!("trigger {} refused {:?}", key, candidate);
            return false;
        }

        let target_event = brush.target_event;
        let payloads = brush.payloads();
        let target_id = brush.target.clone();
        let activator = candidate.map(|(k, _)| k);

        debug!(
            "trigger {} fired by {:?}: {} x{} -> {:?}",
            key,
            activator,
            target_event,
            payloads.len(),
            target_id
        );

        let payload_count = payloads.len();
        match target_id.as_deref().and_then(|id| self.scene.key_of(id)) {
            Some(target) => {
                for value in payloads {
                    self.on_event(target, target_event, Some(value), Some(key));
                }
                self.on_event(target, target_event, None, Some(key));
            }
            None => warn!("trigger {} has no target entity {:?}", key, target_id),
        }

        if let Some(brush) = self.scene.get_mut(key).and_then(|e| e.trigger_brush_mut()) {
            brush.record_fire(activator);
        }

        self.events.triggered.send(TriggerEvent {
            trigger: key,
            activator,
            target_event,
            payloads: payload_count,
        });
        true
    }

    // =========================================================================
    // Damage & Death
    // =========================================================================

    /// Subtract `amount` from health (no clamping) and run the damage hook
    pub fn take_damage(&mut self, key: EntityKey, amount: f32, source: Option<EntityKey>) {
        let Some(entity) = self.scene.get_mut(key) else {
            return;
        };

        entity.last_attacker = source;
        entity.health -= amount;
        let health = entity.health;
        debug!("{} took {} damage from {:?}, health now {}", entity, amount, source, health);

        self.events.damaged.send(DamageEvent { target: key, source, amount, health });
        self.on_damage(key);
    }

    /// Death check after damage
    ///
    /// Runs the death hook whenever health is at or below zero, including
    /// for entities that are already dead.
    fn on_damage(&mut self, key: EntityKey) {
        let Some(health) = self.scene.get(key).map(|e| e.health) else {
            return;
        };

        if health <= 0.0 {
            self.on_death(key);
        } else if health <= self.config.gib_health {
            // Only reachable when gib_health is configured above zero
            self.on_xdeath(key);
        }
    }

    /// Mark dead and leave the live-update set
    pub fn on_death(&mut self, key: EntityKey) {
        self.die(key, false);
    }

    /// Violent death: everything `on_death` does, flagged as gibbed
    pub fn on_xdeath(&mut self, key: EntityKey) {
        if let Some(entity) = self.scene.get(key) {
            info!("{} was gibbed", entity);
        }
        self.die(key, true);
    }

    fn die(&mut self, key: EntityKey, gibbed: bool) {
        let Some(entity) = self.scene.get_mut(key) else {
            return;
        };

        let was_alive = entity.alive;
        entity.alive = false;
        let death = DeathEvent {
            entity: key,
            killer: entity.last_attacker,
            position: entity.position,
            was_alive,
            gibbed,
        };
        if was_alive {
            info!("{} has died (last attacker {:?})", entity, entity.last_attacker);
        } else {
            debug!("death hook ran again for {}", entity);
        }

        self.deregister(key);
        self.events.died.send(death);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::entity::Entity;
    use crate::game::scene::Scene;
    use crate::math::Vec3;

    fn sim() -> Simulation {
        Simulation::new(Scene::new(), SimConfig::default())
    }

    #[test]
    fn test_spawn_resets_state_and_registers() {
        let mut sim = sim();
        let mut npc = Entity::npc(Vec3::ZERO);
        npc.velocity = Vec3::ONE;
        npc.health = 3.0;
        let key = sim.scene.add_entity(npc);

        sim.spawn(key).unwrap();

        let npc = sim.scene.get(key).unwrap();
        assert!(npc.alive);
        assert_eq!(npc.health, 100.0);
        assert_eq!(npc.velocity, Vec3::ZERO);
        assert!(sim.is_registered(key));
        assert_eq!(sim.events.spawned.len(), 1);
    }

    #[test]
    fn test_untyped_entity_is_not_registered() {
        let mut sim = sim();
        let mut broken = Entity::prop(Vec3::ZERO);
        broken.kind = EntityKind::Basic(EntityType::None);
        let key = sim.scene.add_entity(broken);
        assert!(matches!(sim.spawn(key), Err(ConfigError::UntypedEntity { .. })));
        assert!(!sim.is_registered(key));
    }

    #[test]
    fn test_damage_to_zero_kills_once() {
        let mut sim = sim();
        let attacker = sim.add_and_spawn(Entity::player(Vec3::ZERO)).unwrap();
        let key = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();

        sim.take_damage(key, 60.0, Some(attacker));
        assert!(sim.scene.get(key).unwrap().alive);
        assert!(sim.events.died.is_empty());

        sim.take_damage(key, 40.0, Some(attacker));
        let npc = sim.scene.get(key).unwrap();
        assert!(!npc.alive);
        assert_eq!(npc.health, 0.0);
        assert_eq!(npc.last_attacker, Some(attacker));
        assert!(!sim.is_registered(key));

        let deaths: Vec<_> = sim.events.died.iter().collect();
        assert_eq!(deaths.len(), 1);
        assert!(deaths[0].was_alive);
        assert_eq!(deaths[0].killer, Some(attacker));
    }

    #[test]
    fn test_overkill_runs_plain_death_not_gib() {
        // The death branch is checked first, so a single massive hit is a
        // plain death even far past the gib threshold.
        let mut sim = sim();
        let key = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();
        sim.take_damage(key, 500.0, None);

        let deaths: Vec<_> = sim.events.died.iter().collect();
        assert_eq!(deaths.len(), 1);
        assert!(!deaths[0].gibbed);
        assert_eq!(sim.scene.get(key).unwrap().health, -400.0);
    }

    #[test]
    fn test_damage_on_corpse_reruns_death_hook_without_second_transition() {
        let mut sim = sim();
        let key = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();
        sim.take_damage(key, 100.0, None);
        sim.take_damage(key, 10.0, None);

        let deaths: Vec<_> = sim.events.died.iter().collect();
        assert_eq!(deaths.len(), 2);
        assert!(deaths[0].was_alive);
        assert!(!deaths[1].was_alive);
        assert_eq!(deaths.iter().filter(|d| d.was_alive).count(), 1);
    }

    #[test]
    fn test_xdeath_has_death_side_effects() {
        let mut sim = sim();
        let a = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();
        let b = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();

        sim.on_death(a);
        sim.on_xdeath(b);

        for key in [a, b] {
            assert!(!sim.scene.get(key).unwrap().alive);
            assert!(!sim.is_registered(key));
        }
        let gibbed: Vec<bool> = sim.events.died.iter().map(|d| d.gibbed).collect();
        assert_eq!(gibbed, vec![false, true]);
    }

    #[test]
    fn test_gib_branch_reachable_with_positive_threshold() {
        let config = SimConfig { gib_health: 10.0, ..SimConfig::default() };
        let mut sim = Simulation::new(Scene::new(), config);
        let key = sim.add_and_spawn(Entity::npc(Vec3::ZERO)).unwrap();
        sim.take_damage(key, 95.0, None);
        assert!(sim.events.died.iter().all(|d| d.gibbed));
        assert_eq!(sim.events.died.len(), 1);
    }

    #[test]
    fn test_invalid_box_drops_entity_from_updates_only() {
        let mut sim = sim();
        let bad = sim.add_and_spawn(Entity::prop(Vec3::ZERO)).unwrap();
        let good = sim.add_and_spawn(Entity::player(Vec3::ZERO)).unwrap();
        sim.apply_force_to_player(Vec3::new(1.0, 0.0, 0.0));

        sim.scene.get_mut(bad).unwrap().bbox = BoundingBox::new(Vec3::ONE, Vec3::ZERO);
        sim.step(0.1);

        assert!(!sim.is_registered(bad));
        assert!(sim.is_registered(good));
        assert!(sim.scene.get(good).unwrap().position.x > 0.0);
    }

    #[test]
    fn test_npc_drops_dead_target() {
        let mut sim = sim();
        let player = sim.add_and_spawn(Entity::player(Vec3::ZERO).with_id("player")).unwrap();
        let npc = sim.add_and_spawn(Entity::npc(Vec3::new(500.0, 0.0, 0.0))).unwrap();

        assert!(sim.set_target(npc, Some("player")));
        sim.step(0.016);
        assert_eq!(sim.scene.get(npc).unwrap().target.as_deref(), Some("player"));

        sim.on_death(player);
        assert!(!sim.set_target(npc, Some("player")));
        sim.step(0.016);
        assert_eq!(sim.scene.get(npc).unwrap().target, None);
    }
}
