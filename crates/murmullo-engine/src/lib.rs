//! Murmullo Engine - real-time polyphonic subtractive synthesis
//!
//! The engine renders a mixed stereo stream by summing a fixed pool of
//! monophonic voices, each a classic analog-style chain: two
//! band-limited oscillators plus a noise source into a resonant
//! state-variable filter, shaped by dual ADSR envelopes, two LFOs, and
//! a small modulation matrix.
//!
//! # Architecture
//!
//! Two agents cooperate:
//!
//! - The **control agent** (UI, game logic, a sequencer) submits note
//!   commands through an [`EngineHandle`] and tweaks shared scalars.
//!   Submission is non-blocking and returns overflow instead of
//!   waiting.
//! - The **audio agent** owns a [`SynthEngine`] and calls
//!   [`SynthEngine::render`] from its pull-mode callback. All voice
//!   state lives here; the callback never allocates, blocks, or logs.
//!
//! The handoff is a single-producer single-consumer ring buffer of
//! value-typed [`Command`]s drained at the start of every block, plus a
//! few relaxed atomics for master volume, headroom, and performance
//! controls.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use murmullo_engine::{EngineConfig, NoteParams, PresetLibrary, SynthEngine};
//!
//! let library = Arc::new(PresetLibrary::with_factory_presets()?);
//! let (mut engine, mut handle) =
//!     SynthEngine::new(EngineConfig::default(), Arc::clone(&library))?;
//!
//! // Control side: fire a note from the catalog.
//! let params = handle.note_params("warm_pad")?.pitch(57).velocity(0.9);
//! handle.fire(params)?;
//!
//! // Audio side: render one stereo block.
//! let mut block = vec![0.0f32; 512 * 2];
//! engine.render(2, &mut block);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod command;
mod dispatcher;
mod engine;
mod handle;
mod pool;
mod preset;
mod voice;

pub use command::{CancelToken, Command, NoteParams, Spatial, SubmitError, SustainKey};
pub use engine::{EngineConfig, EngineError, SynthEngine};
pub use handle::{DiagnosticsSnapshot, EngineHandle};
pub use pool::VoicePool;
pub use preset::{factory_presets, Preset, PresetError, PresetLibrary};
pub use voice::{Voice, CONTROL_RATE_INTERVAL};

// Re-export the core types preset fields are declared with.
pub use murmullo_core::{FilterMode, LfoWaveform, NoiseColor, Waveform};
