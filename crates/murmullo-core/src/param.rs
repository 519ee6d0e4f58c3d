//! One-pole parameter smoothing.
//!
//! Stepping filter cutoff or resonance directly at control rate puts
//! audible zipper noise on the output. [`SmoothedParam`] tracks a
//! target through a one-pole lowpass so every audio sample sees a
//! slightly different, click-free value.

use libm::expf;

/// A parameter value that exponentially approaches its target.
///
/// # Example
///
/// ```rust
/// use murmullo_core::SmoothedParam;
///
/// let mut cutoff = SmoothedParam::new(1000.0, 48000.0, 5.0);
/// cutoff.set_target(4000.0);
///
/// let step = cutoff.next_value();
/// assert!(step > 1000.0 && step < 4000.0);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create a smoothed parameter.
    ///
    /// `smoothing_ms` is the one-pole time constant; the value reaches
    /// ~63% of a step after that long and is effectively settled after
    /// five time constants. Zero disables smoothing.
    pub fn new(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut param = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            smoothing_ms,
        };
        param.recalculate_coeff();
        param
    }

    /// Set the value the parameter ramps toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Skip the ramp and land on `value` immediately.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Change the smoothing time constant in milliseconds.
    pub fn set_smoothing_ms(&mut self, ms: f32) {
        self.smoothing_ms = ms;
        self.recalculate_coeff();
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_ms * 1.0e-3 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}
