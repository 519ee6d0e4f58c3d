//! Commands crossing the control→audio boundary.
//!
//! A closed sum of value-typed variants travels through the SPSC ring
//! and is decoded in a single match at block start. Commands own their
//! data: presets ride along as `Arc` clones, so nothing the audio
//! thread touches can dangle, and dropping a command there is only a
//! reference-count decrement (the library keeps every preset alive).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::preset::Preset;

/// Opaque identifier tying a `SustainStart` to its later
/// `SustainRelease`. Chosen by the producer; the audio thread never
/// interprets it.
pub type SustainKey = u64;

/// Result of a command submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The SPSC queue is full. The caller may retry next frame or
    /// drop the trigger; the engine does not block.
    #[error("command queue is full")]
    QueueFull,

    /// The named preset is not in the library.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// Cancellation flag for an in-flight command.
///
/// The producer keeps a clone and may mark the command inert any time
/// before the drain; the drainer discards cancelled commands without
/// consuming a voice. The allocation happens on the control thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the associated command inert.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Spatialization input for a trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spatial {
    /// Pre-computed gain and pan (pan 0 = left, 1 = right).
    Direct { gain: f32, pan: f32 },
    /// Listener-local position; the dispatcher derives gain from
    /// distance rolloff and pan from the horizontal offset.
    Position { x: f32, y: f32, z: f32 },
}

impl Default for Spatial {
    fn default() -> Self {
        Spatial::Direct {
            gain: 1.0,
            pan: 0.5,
        }
    }
}

/// Everything a `Fire` or `SustainStart` needs to start a note.
#[derive(Clone, Debug)]
pub struct NoteParams {
    /// Parameter bundle the voice copies at trigger time.
    pub preset: Arc<Preset>,
    /// Pitch; the preset's default note when omitted.
    pub pitch: Option<u8>,
    /// Velocity in [0, 1].
    pub velocity: f32,
    /// Gain/pan or a position to spatialize.
    pub spatial: Spatial,
    /// Auto note-off after this many seconds, when set.
    pub duration: Option<f32>,
    /// Optional cancellation flag checked at drain time.
    pub cancel: Option<CancelToken>,
}

impl NoteParams {
    /// Params for the given preset at its default note, full velocity,
    /// centered.
    pub fn new(preset: Arc<Preset>) -> Self {
        Self {
            preset,
            pitch: None,
            velocity: 1.0,
            spatial: Spatial::default(),
            duration: None,
            cancel: None,
        }
    }

    /// Set the pitch.
    pub fn pitch(mut self, pitch: u8) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the velocity.
    pub fn velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set explicit gain and pan.
    pub fn gain_pan(mut self, gain: f32, pan: f32) -> Self {
        self.spatial = Spatial::Direct { gain, pan };
        self
    }

    /// Spatialize from a listener-local position.
    pub fn position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.spatial = Spatial::Position { x, y, z };
        self
    }

    /// Schedule an automatic note-off after `secs`.
    pub fn duration(mut self, secs: f32) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// The closed set of trigger commands.
///
/// `stamp` is the submission-order sequence number assigned by the
/// handle; the dispatcher records it as the new voice's note-on time,
/// which the stealer compares with modular arithmetic.
#[derive(Clone, Debug)]
pub enum Command {
    /// Start a note on a stolen voice.
    Fire { params: NoteParams, stamp: u32 },
    /// As `Fire`, and remember the voice under `key` until released.
    SustainStart {
        key: SustainKey,
        params: NoteParams,
        stamp: u32,
    },
    /// Release the voice held under `key`; unknown keys are ignored.
    SustainRelease { key: SustainKey },
    /// Release every active voice and clear all bookkeeping tables.
    AllOff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());

        let clone = token.clone();
        assert!(clone.is_cancelled(), "clones share the flag");
    }

    #[test]
    fn params_builder_chains() {
        let preset = Arc::new(Preset::named("p"));
        let params = NoteParams::new(preset)
            .pitch(64)
            .velocity(0.5)
            .gain_pan(0.8, 0.25)
            .duration(1.5);

        assert_eq!(params.pitch, Some(64));
        assert_eq!(params.velocity, 0.5);
        assert_eq!(
            params.spatial,
            Spatial::Direct {
                gain: 0.8,
                pan: 0.25
            }
        );
        assert_eq!(params.duration, Some(1.5));
    }

    #[test]
    fn default_spatial_is_centered_unity() {
        let preset = Arc::new(Preset::named("p"));
        let params = NoteParams::new(preset);
        assert_eq!(
            params.spatial,
            Spatial::Direct {
                gain: 1.0,
                pan: 0.5
            }
        );
        assert!(params.pitch.is_none());
    }
}
