//! Simulation runtime
//!
//! [`Simulation`] is the context every operation runs against: the scene,
//! the live-update registry, the audio backend, tuning and the per-frame
//! notification queues. There is no global state; hosts build one
//! simulation per loaded map and drive it with [`Simulation::run`] (wall
//! clock) or [`Simulation::step`] (fixed delta).
//!
//! One frame:
//! 1. compute delta time
//! 2. renderer pass (snapshot of the scene)
//! 3. audio backend pass
//! 4. `update` for every registered entity, in registration order
//! 5. queued removals are flushed

use std::time::Instant;

use bitflags::bitflags;
use log::{debug, info, warn};

use super::audio::{AudioBackend, NullAudio};
use super::entity::Entity;
use super::event::{Events, RemovedEvent};
use super::handle::EntityKey;
use super::render::Renderer;
use super::scene::Scene;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::math::Vec3;

bitflags! {
    /// Host-controlled run state
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GameState: u8 {
        const ACTIVE = 0x01;
        const PAUSED = 0x02;
        const MENU   = 0x04;
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::ACTIVE
    }
}

impl GameState {
    /// Entity updates only run while active and not paused
    pub fn runs_updates(self) -> bool {
        self.contains(GameState::ACTIVE) && !self.contains(GameState::PAUSED)
    }
}

/// Wall-clock frame timer, restarted every tick
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    delta: f32,
    elapsed: f64,
    max_delta: f32,
}

impl FrameClock {
    pub fn new(max_delta: f32) -> Self {
        Self {
            last: Instant::now(),
            delta: 0.0,
            elapsed: 0.0,
            max_delta,
        }
    }

    /// Seconds since the previous tick, clamped to `[0, max_delta]`
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.delta = raw.clamp(0.0, self.max_delta);
        self.elapsed += f64::from(self.delta);
        self.delta
    }

    pub fn restart(&mut self) {
        self.last = Instant::now();
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Total simulated seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

pub struct Simulation {
    pub scene: Scene,
    pub config: SimConfig,
    pub state: GameState,
    /// Notifications from the current (or most recent) frame
    pub events: Events,
    clock: FrameClock,
    pub(crate) audio: Box<dyn AudioBackend>,
    /// Live-update set in registration order
    registered: Vec<EntityKey>,
    frame: u64,
}

impl Simulation {
    pub fn new(scene: Scene, config: SimConfig) -> Self {
        Self::with_audio(scene, config, Box::new(NullAudio::new()))
    }

    pub fn with_audio(scene: Scene, config: SimConfig, audio: Box<dyn AudioBackend>) -> Self {
        Self {
            scene,
            clock: FrameClock::new(config.max_delta),
            config,
            state: GameState::default(),
            events: Events::new(),
            audio,
            registered: Vec::new(),
            frame: 0,
        }
    }

    /// Frames completed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn audio(&self) -> &dyn AudioBackend {
        self.audio.as_ref()
    }

    // =========================================================================
    // Live-Update Registry
    // =========================================================================

    pub fn registered(&self) -> &[EntityKey] {
        &self.registered
    }

    pub fn is_registered(&self, key: EntityKey) -> bool {
        self.registered.contains(&key)
    }

    pub(crate) fn register(&mut self, key: EntityKey) {
        if !self.is_registered(key) {
            self.registered.push(key);
        }
    }

    pub(crate) fn deregister(&mut self, key: EntityKey) {
        self.registered.retain(|k| *k != key);
    }

    // =========================================================================
    // Population
    // =========================================================================

    /// Add `entity` to the scene and spawn it
    ///
    /// An entity that fails validation never enters the scene.
    pub fn add_and_spawn(&mut self, entity: Entity) -> Result<EntityKey, ConfigError> {
        entity.validate()?;
        let key = self.scene.add_entity(entity);
        self.spawn(key)?;
        Ok(key)
    }

    /// Spawn every entity in the scene, in list order
    ///
    /// Entities that fail validation stay out of the live-update set; their
    /// errors are returned.
    pub fn spawn_all(&mut self) -> Vec<ConfigError> {
        let keys: Vec<EntityKey> = self.scene.entities().iter().map(Entity::key).collect();
        keys.into_iter()
            .filter_map(|key| self.spawn(key).err())
            .collect()
    }

    /// Host command: push the player
    pub fn apply_force_to_player(&mut self, force: Vec3) -> bool {
        let multiplier = self.config.force_multiplier;
        let Some(key) = self.scene.player_key() else {
            warn!("no player to apply force to");
            return false;
        };
        match self.scene.get_mut(key) {
            Some(player) => {
                player.add_force(force, multiplier);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Frame Driver
    // =========================================================================

    /// Run frames off the wall clock until the renderer shuts down.
    /// Returns the number of frames run.
    pub fn run(&mut self, renderer: &mut dyn Renderer) -> u64 {
        let start = self.frame;
        self.clock.restart();
        info!("simulation running with {} entities", self.scene.entity_count());

        while !renderer.shutting_down() {
            let dt = self.clock.tick();
            self.tick(dt, renderer);
        }

        let frames = self.frame - start;
        info!("simulation stopped after {} frames ({:.2}s)", frames, self.clock.elapsed());
        frames
    }

    /// One full frame: render, audio, entity updates
    pub fn tick(&mut self, dt: f32, renderer: &mut dyn Renderer) {
        self.begin_frame();
        renderer.render_frame(&self.scene.snapshot(self.frame));
        self.advance(dt);
    }

    /// One frame without a renderer
    pub fn step(&mut self, dt: f32) {
        self.begin_frame();
        self.advance(dt);
    }

    fn begin_frame(&mut self) {
        self.frame += 1;
        self.events.clear_all();
    }

    fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);

        self.audio.update();

        if self.state.runs_updates() {
            // Entities may spawn, kill or delete others mid-frame
            let order = self.registered.clone();
            for key in order {
                if self.is_registered(key) {
                    self.update_entity(key, dt);
                }
            }
        }

        self.end_frame();
    }

    fn end_frame(&mut self) {
        for entity in self.scene.flush_removals() {
            let key = entity.key();
            self.deregister(key);
            debug!("removed {}", entity);
            self.events.removed.send(RemovedEvent { entity: key, id: entity.id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::render::HeadlessRenderer;
    use crate::math::BoundingBox;

    #[test]
    fn test_game_state_gates_updates() {
        assert!(GameState::ACTIVE.runs_updates());
        assert!(!(GameState::ACTIVE | GameState::PAUSED).runs_updates());
        assert!((GameState::ACTIVE | GameState::MENU).runs_updates());
        assert!(!GameState::MENU.runs_updates());
    }

    #[test]
    fn test_clock_delta_is_non_negative_and_capped() {
        let mut clock = FrameClock::new(0.25);
        let dt = clock.tick();
        assert!(dt >= 0.0 && dt <= 0.25);
        assert_eq!(clock.delta(), dt);
    }

    #[test]
    fn test_run_stops_when_renderer_shuts_down() {
        let mut sim = Simulation::new(Scene::new(), SimConfig::default());
        let mut renderer = HeadlessRenderer::for_frames(5);
        assert_eq!(sim.run(&mut renderer), 5);
        assert_eq!(sim.frame(), 5);
        assert_eq!(renderer.rendered(), 5);
    }

    #[test]
    fn test_updates_follow_registration_order() {
        let mut scene = Scene::new();
        let a = scene.add_entity(Entity::prop(Vec3::ZERO));
        let b = scene.add_entity(Entity::prop(Vec3::ZERO));
        let mut sim = Simulation::new(scene, SimConfig::default());

        sim.spawn(b).unwrap();
        sim.spawn(a).unwrap();
        assert_eq!(sim.registered(), &[b, a]);
    }

    #[test]
    fn test_pause_freezes_movement() {
        let mut sim = Simulation::new(Scene::new(), SimConfig::default());
        let key = sim.add_and_spawn(Entity::player(Vec3::ZERO)).unwrap();
        sim.apply_force_to_player(Vec3::new(1.0, 0.0, 0.0));

        sim.state |= GameState::PAUSED;
        sim.step(0.1);
        assert_eq!(sim.scene.get(key).unwrap().position, Vec3::ZERO);

        sim.state.remove(GameState::PAUSED);
        sim.step(0.1);
        assert!(sim.scene.get(key).unwrap().position.x > 0.0);
    }

    #[test]
    fn test_invalid_entity_never_enters_scene() {
        let mut sim = Simulation::new(Scene::new(), SimConfig::default());
        let broken = Entity::prop(Vec3::ZERO).with_bbox(BoundingBox::new(Vec3::ONE, Vec3::ZERO));
        assert!(sim.add_and_spawn(broken).is_err());
        assert_eq!(sim.scene.entity_count(), 0);
        assert!(sim.registered().is_empty());
    }

    #[test]
    fn test_negative_delta_is_treated_as_zero() {
        let mut sim = Simulation::new(Scene::new(), SimConfig::default());
        let key = sim.add_and_spawn(Entity::player(Vec3::ZERO)).unwrap();
        sim.apply_force_to_player(Vec3::new(1.0, 0.0, 0.0));
        sim.step(-1.0);
        assert_eq!(sim.scene.get(key).unwrap().position, Vec3::ZERO);
    }
}
