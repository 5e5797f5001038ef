//! Alert sounds played when a phase runs out.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Failed to initialize audio output: {0}")]
    Stream(String),
    #[error("Failed to play audio: {0}")]
    Play(String),
    #[error("Audio unavailable: {0}")]
    Unavailable(String),
}

/// Which alert to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    WorkComplete,
    BreakComplete,
}

/// Fire-and-forget sound output. Implementations must not block until the
/// sound has finished.
pub trait Sound {
    fn play(&self, cue: Cue, volume: f32) -> Result<(), AudioError>;
}

/// Plays nothing. Used when no output device is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Sound for Silent {
    fn play(&self, _cue: Cue, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

#[cfg(feature = "desktop")]
pub use player::AudioPlayer;

#[cfg(feature = "desktop")]
mod player {
    use super::{AudioError, Cue, Sound};
    use rodio::source::{SineWave, Source, Zero};
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use std::time::Duration;

    impl From<rodio::StreamError> for AudioError {
        fn from(e: rodio::StreamError) -> Self {
            Self::Stream(e.to_string())
        }
    }

    impl From<rodio::PlayError> for AudioError {
        fn from(e: rodio::PlayError) -> Self {
            Self::Play(e.to_string())
        }
    }

    /// Plays generated two-tone chimes through the default output device.
    pub struct AudioPlayer {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl AudioPlayer {
        /// Creates a new audio player.
        pub fn new() -> Result<Self, AudioError> {
            let (stream, handle) = OutputStream::try_default()?;
            Ok(Self {
                _stream: stream,
                handle,
            })
        }

        fn play_tones(&self, first_hz: f32, second_hz: f32, volume: f32) -> Result<(), AudioError> {
            let sink = Sink::try_new(&self.handle)?;
            sink.set_volume(volume);

            let tone1 = SineWave::new(first_hz)
                .take_duration(Duration::from_millis(150))
                .amplify(0.3);
            let silence = Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(50));
            let tone2 = SineWave::new(second_hz)
                .take_duration(Duration::from_millis(200))
                .amplify(0.3);

            sink.append(tone1);
            sink.append(silence);
            sink.append(tone2);
            sink.detach(); // Play in background

            Ok(())
        }
    }

    impl Sound for AudioPlayer {
        fn play(&self, cue: Cue, volume: f32) -> Result<(), AudioError> {
            match cue {
                // Rising A5 -> C6 when focus ends
                Cue::WorkComplete => self.play_tones(880.0, 1046.5, volume),
                // Falling C6 -> A5 when it is time to get back to work
                Cue::BreakComplete => self.play_tones(1046.5, 880.0, volume),
            }
        }
    }

}
