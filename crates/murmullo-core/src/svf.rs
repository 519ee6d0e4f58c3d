//! Zero-delay-feedback state variable filter.
//!
//! Topology-preserving transform after Zavalishin, "The Art of VA
//! Filter Design". The trapezoidal integrator discretization keeps the
//! filter stable under fast cutoff modulation, which is exactly what a
//! per-voice envelope sweep does to it. Lowpass, highpass, bandpass,
//! and notch taps come out of the same state update; the mode enum
//! picks one inside `process` so the hot loop stays monomorphic.

use core::f32::consts::PI;
use libm::tanf;

use crate::math::{fast_tan, flush_denormal};

/// Which filter tap `process` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterMode {
    /// Passes below the cutoff.
    #[default]
    Lowpass,
    /// Passes above the cutoff.
    Highpass,
    /// Passes around the cutoff.
    Bandpass,
    /// Rejects around the cutoff.
    Notch,
}

/// Two-pole multi-mode ZDF filter.
///
/// Resonance is normalized to [0, 1]; internally it maps to the
/// damping coefficient `k = 2·(1 − 0.99·resonance)`, so resonance 1
/// sits just short of self-oscillation and stays bounded.
///
/// # Example
///
/// ```rust
/// use murmullo_core::{FilterMode, StateVariableFilter};
///
/// let mut svf = StateVariableFilter::new(48000.0);
/// svf.set_cutoff(800.0);
/// svf.set_resonance(0.4);
/// svf.set_mode(FilterMode::Lowpass);
///
/// let y = svf.process(0.5);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Integrator state
    ic1: f32,
    ic2: f32,

    // Cached coefficients
    g: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,

    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    mode: FilterMode,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a filter at the given sample rate (1 kHz cutoff, zero
    /// resonance, lowpass).
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1: 0.0,
            ic2: 0.0,
            g: 0.0,
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.0,
            mode: FilterMode::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff frequency in Hz, clamped to [20, 0.49·Fs] so the
    /// prewarp never reaches the tan singularity.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the resonance in [0, 1].
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 1.0);
        self.update_coefficients();
    }

    /// Set cutoff and resonance together with a single coefficient
    /// recompute. The per-sample smoothing path uses this.
    #[inline]
    pub fn set_cutoff_resonance(&mut self, cutoff: f32, resonance: f32) {
        self.cutoff = cutoff.clamp(20.0, self.sample_rate * 0.49);
        self.resonance = resonance.clamp(0.0, 1.0);
        self.update_coefficients();
    }

    /// Current resonance.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Select the output tap.
    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    /// Current output tap.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Update the sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.cutoff = self.cutoff.clamp(20.0, sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Zero the integrator state.
    pub fn reset(&mut self) {
        self.ic1 = 0.0;
        self.ic2 = 0.0;
    }

    /// Recompute `g`, `k`, and the feedback coefficients.
    ///
    /// The prewarp uses the two-term Taylor `fast_tan` below 10 kHz
    /// where it is accurate to better than 1%, falling back to
    /// `libm::tanf` above, where the polynomial starts diverging from
    /// the pole-bound true function.
    fn update_coefficients(&mut self) {
        let w = PI * self.cutoff / self.sample_rate;
        self.g = if self.cutoff < 10_000.0 {
            fast_tan(w)
        } else {
            tanf(w)
        };
        self.k = 2.0 * (1.0 - 0.99 * self.resonance);
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        self.a2 = self.g * self.a1;
        self.a3 = self.g * self.a2;
    }

    /// Process one sample through the selected tap.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2;
        let v1 = self.a1 * self.ic1 + self.a2 * v3;
        let v2 = self.ic2 + self.a2 * self.ic1 + self.a3 * v3;

        self.ic1 = flush_denormal(2.0 * v1 - self.ic1);
        self.ic2 = flush_denormal(2.0 * v2 - self.ic2);

        match self.mode {
            FilterMode::Lowpass => v2,
            FilterMode::Highpass => input - self.k * v1 - v2,
            FilterMode::Bandpass => v1,
            FilterMode::Notch => input - self.k * v1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let sr = 48000.0;
        let mut svf = StateVariableFilter::new(sr);
        svf.set_cutoff(500.0);

        // 8 kHz sine through a 500 Hz lowpass
        let mut phase = 0.0f32;
        let mut in_energy = 0.0f64;
        let mut out_energy = 0.0f64;
        for _ in 0..48000 {
            let x = libm::sinf(phase * core::f32::consts::TAU);
            phase = (phase + 8000.0 / sr) % 1.0;
            let y = svf.process(x);
            in_energy += f64::from(x * x);
            out_energy += f64::from(y * y);
        }
        assert!(
            out_energy < in_energy * 0.01,
            "8 kHz not attenuated: {out_energy} vs {in_energy}"
        );
    }

    #[test]
    fn lowpass_passes_low_frequencies() {
        let sr = 48000.0;
        let mut svf = StateVariableFilter::new(sr);
        svf.set_cutoff(5000.0);

        let mut phase = 0.0f32;
        let mut in_energy = 0.0f64;
        let mut out_energy = 0.0f64;
        for _ in 0..48000 {
            let x = libm::sinf(phase * core::f32::consts::TAU);
            phase = (phase + 100.0 / sr) % 1.0;
            let y = svf.process(x);
            in_energy += f64::from(x * x);
            out_energy += f64::from(y * y);
        }
        let ratio = out_energy / in_energy;
        assert!(
            (0.8..1.2).contains(&ratio),
            "100 Hz should pass nearly unity, got {ratio}"
        );
    }

    #[test]
    fn stable_at_full_resonance_and_clamp_limit() {
        let sr = 48000.0;
        let mut svf = StateVariableFilter::new(sr);
        svf.set_resonance(1.0);
        svf.set_cutoff(sr); // clamps to 0.49·Fs

        let mut noise = crate::NoiseSource::with_seed(3);
        for _ in 0..96000 {
            let y = svf.process(noise.next_sample());
            assert!(y.is_finite(), "filter produced NaN/Inf");
            assert!(y.abs() < 100.0, "filter diverging: {y}");
        }
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_mode(FilterMode::Highpass);
        svf.set_cutoff(200.0);

        let mut last = 1.0;
        for _ in 0..48000 {
            last = svf.process(1.0);
        }
        assert!(last.abs() < 1e-3, "DC leaking through highpass: {last}");
    }

    #[test]
    fn notch_rejects_cutoff() {
        let sr = 48000.0;
        let mut svf = StateVariableFilter::new(sr);
        svf.set_mode(FilterMode::Notch);
        svf.set_cutoff(1000.0);

        let mut phase = 0.0f32;
        let mut out_energy = 0.0f64;
        // Skip the transient, then measure
        for i in 0..96000 {
            let x = libm::sinf(phase * core::f32::consts::TAU);
            phase = (phase + 1000.0 / sr) % 1.0;
            let y = svf.process(x);
            if i >= 48000 {
                out_energy += f64::from(y * y);
            }
        }
        assert!(out_energy < 48000.0 * 0.01, "notch leaking: {out_energy}");
    }

    #[test]
    fn reset_clears_ring() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_resonance(0.9);
        svf.process(1.0);
        svf.process(-1.0);
        svf.reset();
        assert_eq!(svf.process(0.0), 0.0);
    }
}
