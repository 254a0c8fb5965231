//! Tool entities
//!
//! Tools are invisible helpers placed in a map: they have no health, never
//! activate triggers and are skipped by ray traces.

use serde::{Deserialize, Serialize};

use super::audio::SoundHandle;
use super::entity::Entity;

pub const DEFAULT_SOUND: &str = "resources/audio/engine/error.mp3";

/// Copies entities into the scene at its own position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySpawner {
    /// Spawned by an untyped `SpawnEntity` event
    pub prototype: Option<Box<Entity>>,
    #[serde(skip)]
    pub spawned: u32,
}

impl EntitySpawner {
    pub fn with_prototype(prototype: Entity) -> Self {
        Self {
            prototype: Some(Box::new(prototype)),
            spawned: 0,
        }
    }
}

/// Plays one audio file through the audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundEntity {
    pub audio_path: String,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub repeats: bool,
    #[serde(skip)]
    pub playing: bool,
    #[serde(skip)]
    pub handle: Option<SoundHandle>,
}

impl Default for SoundEntity {
    fn default() -> Self {
        Self {
            audio_path: DEFAULT_SOUND.to_string(),
            volume: 1.0,
            repeats: false,
            playing: false,
            handle: None,
        }
    }
}

impl SoundEntity {
    pub fn new(audio_path: impl Into<String>, volume: f32, repeats: bool) -> Self {
        Self {
            audio_path: audio_path.into(),
            volume: volume.clamp(0.0, 1.0),
            repeats,
            ..Self::default()
        }
    }
}
