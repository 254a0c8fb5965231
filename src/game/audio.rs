//! Audio backend seam
//!
//! The simulation never decodes or mixes audio. Sound entities ask an
//! [`AudioBackend`] to play or stop a file and poll whether it is still
//! playing; the frame driver gives the backend one `update` per frame.

use log::debug;

/// Opaque handle for one playing sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u64);

#[cfg_attr(test, mockall::automock)]
pub trait AudioBackend {
    /// Start playing `path`; `None` if the backend could not play it
    fn play_sound(&mut self, path: &str, volume: f32, loops: bool) -> Option<SoundHandle>;
    fn stop_sound(&mut self, handle: SoundHandle);
    fn is_playing(&self, handle: SoundHandle) -> bool;
    /// Once per frame, before entity updates
    fn update(&mut self);
}

/// Backend with no output device
///
/// One-shot sounds finish at the next `update`; looping sounds play until
/// stopped.
#[derive(Debug, Default)]
pub struct NullAudio {
    next: u64,
    playing: Vec<(SoundHandle, bool)>,
}

impl NullAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for NullAudio {
    fn play_sound(&mut self, path: &str, volume: f32, loops: bool) -> Option<SoundHandle> {
        self.next += 1;
        let handle = SoundHandle(self.next);
        debug!("play {} (volume {}, loops {}) as {:?}", path, volume, loops, handle);
        self.playing.push((handle, loops));
        Some(handle)
    }

    fn stop_sound(&mut self, handle: SoundHandle) {
        debug!("stop {:?}", handle);
        self.playing.retain(|(h, _)| *h != handle);
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        self.playing.iter().any(|(h, _)| *h == handle)
    }

    fn update(&mut self) {
        self.playing.retain(|(_, loops)| *loops);
    }
}
