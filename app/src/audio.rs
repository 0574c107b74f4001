//! Audio contract.
//!
//! The renderer does not play sound itself; it talks to an [`AudioDevice`]
//! that owns positional [`SoundSource`]s. [`NullAudioDevice`] tracks source
//! state without producing output, for headless runs and `--no-audio`.

use gitech_core::slots::SlotTable;

/// Index of a source inside its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundSourceId(u32);

/// Playback state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// A positional sound emitter.
pub trait SoundSource: Send {
    /// Select the sound file to play. Stops the source.
    fn set_sound_file(&mut self, path: &str);

    /// World-space position.
    fn set_position(&mut self, position: [f32; 3]);

    /// Start or resume playback, looping if `repeat`.
    fn play(&mut self, repeat: bool);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Low-pass filter gain in `[0, 1]`.
    fn set_filter_gain(&mut self, gain: f32);

    fn status(&self) -> SoundStatus;
}

/// Owns the listener and every sound source.
pub trait AudioDevice: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    fn create_sound_source(&mut self) -> SoundSourceId;

    /// Stop and destroy a source. Returns whether it existed.
    fn remove_sound_source(&mut self, id: SoundSourceId) -> bool;

    fn sound_source(&mut self, id: SoundSourceId) -> Option<&mut dyn SoundSource>;

    fn set_listener_position(&mut self, position: [f32; 3]);

    /// Listener orientation as forward and up vectors.
    fn set_listener_orientation(&mut self, forward: [f32; 3], up: [f32; 3]);

    /// Number of live sources.
    fn source_count(&self) -> usize;
}

// ============================================================================
// Null device
// ============================================================================

/// A source that only tracks its own state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NullSoundSource {
    file: Option<String>,
    position: [f32; 3],
    gain: f32,
    repeat: bool,
    status: SoundStatus,
}

impl NullSoundSource {
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn is_looping(&self) -> bool {
        self.repeat
    }
}

impl SoundSource for NullSoundSource {
    fn set_sound_file(&mut self, path: &str) {
        self.status = SoundStatus::Stopped;
        self.file = Some(path.to_owned());
    }

    fn set_position(&mut self, position: [f32; 3]) {
        self.position = position;
    }

    fn play(&mut self, repeat: bool) {
        if self.file.is_none() {
            log::warn!("Sound source has no file; ignoring play");
            return;
        }
        self.repeat = repeat;
        self.status = SoundStatus::Playing;
    }

    fn pause(&mut self) {
        if self.status == SoundStatus::Playing {
            self.status = SoundStatus::Paused;
        }
    }

    fn stop(&mut self) {
        self.status = SoundStatus::Stopped;
    }

    fn set_filter_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn status(&self) -> SoundStatus {
        self.status
    }
}

/// Silent audio device.
#[derive(Debug, Default)]
pub struct NullAudioDevice {
    sources: SlotTable<NullSoundSource>,
    listener_position: [f32; 3],
    listener_orientation: ([f32; 3], [f32; 3]),
}

impl NullAudioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_position(&self) -> [f32; 3] {
        self.listener_position
    }

    /// Sources currently playing.
    pub fn playing(&self) -> usize {
        self.sources
            .iter()
            .filter(|(_, source)| source.status == SoundStatus::Playing)
            .count()
    }
}

impl AudioDevice for NullAudioDevice {
    fn name(&self) -> &str {
        "Null"
    }

    fn create_sound_source(&mut self) -> SoundSourceId {
        SoundSourceId(self.sources.insert(NullSoundSource {
            gain: 1.0,
            ..Default::default()
        }))
    }

    fn remove_sound_source(&mut self, id: SoundSourceId) -> bool {
        self.sources.remove(id.0).is_some()
    }

    fn sound_source(&mut self, id: SoundSourceId) -> Option<&mut dyn SoundSource> {
        self.sources
            .get_mut(id.0)
            .map(|source| source as &mut dyn SoundSource)
    }

    fn set_listener_position(&mut self, position: [f32; 3]) {
        self.listener_position = position;
    }

    fn set_listener_orientation(&mut self, forward: [f32; 3], up: [f32; 3]) {
        self.listener_orientation = (forward, up);
    }

    fn source_count(&self) -> usize {
        self.sources.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lifecycle() {
        let mut device = NullAudioDevice::new();
        let id = device.create_sound_source();
        let source = device.sound_source(id).unwrap();

        source.play(true);
        assert_eq!(source.status(), SoundStatus::Stopped, "no file yet");

        source.set_sound_file("sounds/ambient.ogg");
        source.set_filter_gain(1.5);
        source.play(true);
        assert_eq!(source.status(), SoundStatus::Playing);
        source.pause();
        assert_eq!(source.status(), SoundStatus::Paused);
        source.stop();
        assert_eq!(source.status(), SoundStatus::Stopped);

        assert!(device.remove_sound_source(id));
        assert!(!device.remove_sound_source(id));
        assert!(device.sound_source(id).is_none());
        assert_eq!(device.source_count(), 0);
    }

    #[test]
    fn test_listener() {
        let mut device = NullAudioDevice::new();
        device.set_listener_position([1.0, 2.0, 3.0]);
        device.set_listener_orientation([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
        assert_eq!(device.listener_position(), [1.0, 2.0, 3.0]);
        assert_eq!(device.name(), "Null");
    }
}
