//! Shared math helpers for coefficient computation and gain staging.
//!
//! The fast approximations here trade precision for speed on targets
//! without hardware transcendental support (mobile ARM cores). Each
//! documents its valid input range; callers are responsible for the
//! clamps that keep inputs inside it.

use libm::exp2f;

/// Fast tangent via the two leading Taylor terms:
///
/// `tan(x) ≈ x + x³/3`
///
/// Accurate to well under 1% for the filter's usual operating range
/// (cutoff below sample_rate/8). The caller must keep `x` below π·0.49
/// so the true function stays clear of its pole; the approximation
/// itself never blows up but diverges from tan as x grows.
#[inline]
pub fn fast_tan(x: f32) -> f32 {
    x + x * x * x * (1.0 / 3.0)
}

/// Rational tanh approximation used for output soft clipping.
///
/// `tanh(x) ≈ x·(27 + x²) / (27 + 9·x²)`, clamped to ±1 for |x| > 3
/// where the rational form turns back down. Continuous through the
/// clamp point and cheap enough to run per output sample.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    if x > 3.0 {
        1.0
    } else if x < -3.0 {
        -1.0
    } else {
        let x2 = x * x;
        x * (27.0 + x2) / (27.0 + 9.0 * x2)
    }
}

/// Flush denormal float values to zero.
///
/// Recursive IIR structures (filter integrators, envelope one-poles)
/// decay into the denormal range, where some FPUs fall off a
/// performance cliff. Anything below the threshold is inaudible.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1.0e-20 { 0.0 } else { x }
}

/// Convert a MIDI-style note number to frequency in Hz.
///
/// Standard tuning: note 69 (A4) = 440 Hz.
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * exp2f((note - 69.0) / 12.0)
}

/// Convert a semitone offset to a frequency ratio.
///
/// 12 semitones = one octave = ratio 2.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    exp2f(semitones / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_tan_matches_libm_at_filter_range() {
        // Sweep cutoff 20 Hz .. 6 kHz at 48 kHz
        for i in 1..300 {
            let f = 20.0 * i as f32;
            let x = core::f32::consts::PI * f / 48000.0;
            let exact = libm::tanf(x);
            let approx = fast_tan(x);
            let rel = (approx - exact).abs() / exact;
            assert!(rel < 0.01, "f={f}: fast_tan rel err {rel}");
        }
    }

    #[test]
    fn fast_tanh_bounded_and_odd() {
        for i in -100..=100 {
            let x = i as f32 * 0.1;
            let y = fast_tanh(x);
            assert!(y.abs() <= 1.0, "fast_tanh({x}) = {y} out of range");
            assert!((fast_tanh(-x) + y).abs() < 1e-6);
        }
        assert_eq!(fast_tanh(10.0), 1.0);
        assert_eq!(fast_tanh(-10.0), -1.0);
    }

    #[test]
    fn fast_tanh_tracks_libm_in_linear_region() {
        for i in 0..30 {
            let x = i as f32 * 0.1;
            let err = (fast_tanh(x) - libm::tanhf(x)).abs();
            assert!(err < 0.02, "x={x}: err {err}");
        }
    }

    #[test]
    fn denormal_flush() {
        assert_eq!(flush_denormal(1.0), 1.0);
        assert_eq!(flush_denormal(-0.25), -0.25);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(1e-21), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(0.0), 0.0);
    }

    #[test]
    fn a4_is_440() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
        assert!((midi_to_freq(81.0) - 880.0).abs() < 0.01);
        assert!((midi_to_freq(57.0) - 220.0).abs() < 0.01);
    }

    #[test]
    fn semitone_ratios() {
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-4);
        assert!((semitones_to_ratio(0.0) - 1.0).abs() < 1e-6);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-4);
    }
}
