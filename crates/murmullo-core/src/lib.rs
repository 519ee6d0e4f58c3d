//! Murmullo Core - DSP primitives for the murmullo synthesis engine
//!
//! This crate provides the per-voice building blocks:
//!
//! - [`Oscillator`] band-limited audio oscillator (PolyBLEP)
//! - [`NoiseSource`] white and pink noise
//! - [`StateVariableFilter`] multi-mode ZDF filter
//! - [`AdsrEnvelope`] exponential four-stage envelope
//! - [`Lfo`] low-frequency oscillator
//! - [`SmoothedParam`] one-pole parameter smoothing
//! - [`ModMatrix`] fixed-topology modulation routing
//!
//! Everything here is allocation-free after construction and safe to run
//! inside a real-time audio callback. Transcendentals go through `libm`
//! so the crate stays portable to targets without a platform libm.
//!
//! # Example
//!
//! ```rust
//! use murmullo_core::{Oscillator, Waveform};
//!
//! let mut osc = Oscillator::new(48000.0);
//! osc.set_frequency(440.0);
//! osc.set_waveform(Waveform::Saw);
//!
//! let sample = osc.next_sample();
//! assert!(sample.is_finite());
//! ```

pub mod adsr;
pub mod lfo;
pub mod math;
pub mod mod_matrix;
pub mod noise;
pub mod oscillator;
pub mod param;
pub mod svf;

pub use adsr::{AdsrEnvelope, EnvelopeStage};
pub use lfo::{Lfo, LfoWaveform};
pub use math::{fast_tan, fast_tanh, flush_denormal, midi_to_freq, semitones_to_ratio};
pub use mod_matrix::{ModDestination, ModMatrix, ModRoute, ModSource, MAX_ROUTES};
pub use noise::{NoiseColor, NoiseSource};
pub use oscillator::{Oscillator, Waveform};
pub use param::SmoothedParam;
pub use svf::{FilterMode, StateVariableFilter};
