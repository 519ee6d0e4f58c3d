//! Low-frequency oscillator for modulation.
//!
//! Phase accumulation over [0, 1); no anti-aliasing, since LFO rates
//! sit far below audio rate. Sample-and-hold draws from a seeded
//! xorshift generator so renders stay reproducible.

use core::f32::consts::TAU;
use libm::cosf;

/// LFO waveform selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    SampleHold,
}

/// Bipolar low-frequency oscillator, output in [-1, 1].
///
/// # Example
///
/// ```rust
/// use murmullo_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 2.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
/// let value = lfo.next_value();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase in [0, 1).
    phase: f32,
    /// Phase increment per sample.
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    /// Held value for sample-and-hold.
    held: f32,
    /// xorshift state for sample-and-hold draws.
    rng: u32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create an LFO at the given rate in Hz.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
            held: 0.0,
            rng: 0x2F6E2B1,
        }
    }

    /// Reseed the sample-and-hold generator (zero is remapped).
    pub fn set_seed(&mut self, seed: u32) {
        self.rng = if seed == 0 { 0x2F6E2B1 } else { seed };
    }

    /// Set the rate in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz.max(0.0) / self.sample_rate;
    }

    /// Current rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Update the sample rate, preserving the rate in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.frequency();
        self.sample_rate = sample_rate;
        self.set_frequency(freq);
    }

    /// Zero the phase.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Offset the phase (0.25 = 90 degrees).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0) % 1.0;
    }

    /// Produce the next value and advance the phase.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => cosf(self.phase * TAU),

            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    -4.0 * self.phase + 3.0
                }
            }

            LfoWaveform::Saw => 2.0 * self.phase - 1.0,

            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }

            LfoWaveform::SampleHold => {
                // Fresh draw on the first sample of each cycle.
                if self.phase < self.phase_inc {
                    self.held = self.draw_uniform();
                }
                self.held
            }
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        output
    }

    #[inline]
    fn draw_uniform(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }
}
