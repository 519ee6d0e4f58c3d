//! White and pink noise sources.
//!
//! White noise comes from a xorshift32 generator mapped to uniform
//! [-1, 1]. Pink noise (-3 dB/octave) filters the same generator
//! through Paul Kellett's six one-pole tap accumulators plus a direct
//! tap, with a 0.11 gain compensation that brings the sum back into
//! unit range.
//!
//! Sources are seeded explicitly so renders are reproducible.

/// Noise spectrum selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NoiseColor {
    /// Flat spectrum.
    #[default]
    White,
    /// -3 dB/octave, equal energy per octave.
    Pink,
}

/// Seedable noise source.
///
/// # Example
///
/// ```rust
/// use murmullo_core::{NoiseColor, NoiseSource};
///
/// let mut noise = NoiseSource::with_seed(0x1234_5678);
/// noise.set_color(NoiseColor::Pink);
/// let sample = noise.next_sample();
/// assert!(sample.abs() <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct NoiseSource {
    color: NoiseColor,
    state: u32,
    /// Kellett tap accumulators b0..b5 plus the delayed direct tap b6.
    taps: [f32; 7],
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::with_seed(0x12345678)
    }
}

impl NoiseSource {
    /// Create a noise source from a non-zero seed (zero is remapped,
    /// xorshift cannot leave the zero state).
    pub fn with_seed(seed: u32) -> Self {
        Self {
            color: NoiseColor::White,
            state: if seed == 0 { 0xDEADBEEF } else { seed },
            taps: [0.0; 7],
        }
    }

    /// Select white or pink output.
    pub fn set_color(&mut self, color: NoiseColor) {
        self.color = color;
    }

    /// Current color.
    pub fn color(&self) -> NoiseColor {
        self.color
    }

    /// Clear the pink filter state. The PRNG state is preserved.
    pub fn reset(&mut self) {
        self.taps = [0.0; 7];
    }

    /// Generate the next sample in [-1, 1].
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let white = self.next_white();
        match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => self.pink(white),
        }
    }

    #[inline]
    fn next_white(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }

    /// Kellett's pink filter: six one-pole accumulators at staggered
    /// decay rates, a delayed direct tap, and 0.11 output compensation.
    #[inline]
    fn pink(&mut self, white: f32) -> f32 {
        let b = &mut self.taps;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let pink = b.iter().sum::<f32>() + white * 0.5362;
        b[6] = white * 0.115926;
        (pink * 0.11).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_range_and_coverage() {
        let mut noise = NoiseSource::with_seed(1);
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..10000 {
            let s = noise.next_sample();
            assert!((-1.0..=1.0).contains(&s));
            min = min.min(s);
            max = max.max(s);
        }
        assert!(min < -0.9 && max > 0.9, "poor coverage: [{min}, {max}]");
    }

    #[test]
    fn pink_bounded() {
        let mut noise = NoiseSource::with_seed(7);
        noise.set_color(NoiseColor::Pink);
        for _ in 0..48000 {
            let s = noise.next_sample();
            assert!((-1.0..=1.0).contains(&s), "pink out of range: {s}");
        }
    }

    #[test]
    fn deterministic_given_seed() {
        let mut a = NoiseSource::with_seed(99);
        let mut b = NoiseSource::with_seed(99);
        for _ in 0..1000 {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn zero_seed_remapped() {
        let mut noise = NoiseSource::with_seed(0);
        // A zero xorshift state would emit zeros forever.
        let sum: f32 = (0..100).map(|_| noise.next_sample().abs()).sum();
        assert!(sum > 0.0);
    }

    #[test]
    fn pink_has_more_low_frequency_energy() {
        // Compare energy below ~500 Hz against white noise from the
        // same generator: the pink spectrum should tilt low.
        let band_energy = |color: NoiseColor| -> f64 {
            let mut noise = NoiseSource::with_seed(0x51ab);
            noise.set_color(color);
            // Crude low-band estimate: energy of a heavily averaged
            // (lowpassed) copy of the signal.
            let mut lp = 0.0f64;
            let mut acc = 0.0f64;
            let total: f64 = (0..48000)
                .map(|_| {
                    let s = f64::from(noise.next_sample());
                    lp += 0.05 * (s - lp);
                    acc += lp * lp;
                    s * s
                })
                .sum();
            acc / total
        };

        let white = band_energy(NoiseColor::White);
        let pink = band_energy(NoiseColor::Pink);
        assert!(
            pink > white * 2.0,
            "pink low-band fraction {pink} not above white {white}"
        );
    }
}
