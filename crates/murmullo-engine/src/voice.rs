//! A single synthesizer voice.
//!
//! Composes the core DSP blocks into the classic subtractive chain:
//! two oscillators plus a noise source, a resonant state-variable
//! filter, amp and filter envelopes, two LFOs, and a modulation
//! matrix. Expensive coefficient work (matrix pass, pitch ratios,
//! cutoff recompute) runs at control rate — every
//! [`CONTROL_RATE_INTERVAL`] samples — while smoothed parameters carry
//! the values between ticks without zipper noise.

use libm::{cosf, sinf};

use murmullo_core::{
    midi_to_freq, semitones_to_ratio, AdsrEnvelope, Lfo, ModDestination, ModMatrix, ModSource,
    NoiseSource, Oscillator, SmoothedParam, StateVariableFilter,
};

use crate::preset::Preset;

/// Samples between control-rate updates.
pub const CONTROL_RATE_INTERVAL: u32 = 32;

/// Smoothing time for filter cutoff/resonance between control ticks.
const FILTER_SMOOTHING_MS: f32 = 5.0;

/// One pooled voice.
///
/// Voices are created once at engine init and reused forever. A voice
/// is "born" by [`note_on`](Voice::note_on) and dies when its amp
/// envelope decays to idle, at which point the pool may hand it out
/// again.
#[derive(Debug, Clone)]
pub struct Voice {
    osc1: Oscillator,
    osc2: Oscillator,
    noise: NoiseSource,
    filter: StateVariableFilter,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    lfo1: Lfo,
    lfo2: Lfo,
    matrix: ModMatrix,
    cutoff_smooth: SmoothedParam,
    res_smooth: SmoothedParam,

    sample_rate: f32,

    // Copied from the preset at configure time
    osc1_level: f32,
    osc2_level: f32,
    noise_level: f32,
    osc2_semitones: f32,
    osc2_detune: f32,
    base_pulse_width: f32,
    base_cutoff: f32,
    base_resonance: f32,
    filter_env_amount: f32,
    lfo1_to_filter: f32,
    velocity_to_filter: f32,

    // Note state
    note: u8,
    base_freq: f32,
    velocity: f32,
    gain: f32,
    pan: f32,
    pan_left: f32,
    pan_right: f32,

    active: bool,
    note_on_time: u32,
    priority: u8,

    control_counter: u32,
    amp_trim: f32,
    pitch_bend: f32,
    current_level: f32,
}

impl Voice {
    /// Create an idle voice. The seed keeps noise and sample-and-hold
    /// deterministic per voice slot.
    pub fn new(sample_rate: f32, seed: u32) -> Self {
        let mut lfo1 = Lfo::new(sample_rate, 5.0);
        let mut lfo2 = Lfo::new(sample_rate, 0.5);
        lfo1.set_seed(seed.wrapping_mul(0x9E3779B9) | 1);
        lfo2.set_seed(seed.wrapping_mul(0x85EBCA6B) | 1);

        Self {
            osc1: Oscillator::new(sample_rate),
            osc2: Oscillator::new(sample_rate),
            noise: NoiseSource::with_seed(seed.wrapping_add(0x1234_5678)),
            filter: StateVariableFilter::new(sample_rate),
            amp_env: AdsrEnvelope::new(sample_rate),
            filter_env: AdsrEnvelope::new(sample_rate),
            lfo1,
            lfo2,
            matrix: ModMatrix::new(),
            cutoff_smooth: SmoothedParam::new(2000.0, sample_rate, FILTER_SMOOTHING_MS),
            res_smooth: SmoothedParam::new(0.0, sample_rate, FILTER_SMOOTHING_MS),
            sample_rate,
            osc1_level: 1.0,
            osc2_level: 0.0,
            noise_level: 0.0,
            osc2_semitones: 0.0,
            osc2_detune: 0.0,
            base_pulse_width: 0.5,
            base_cutoff: 2000.0,
            base_resonance: 0.0,
            filter_env_amount: 0.0,
            lfo1_to_filter: 0.0,
            velocity_to_filter: 0.0,
            note: 0,
            base_freq: 0.0,
            velocity: 0.0,
            gain: 1.0,
            pan: 0.5,
            pan_left: core::f32::consts::FRAC_1_SQRT_2,
            pan_right: core::f32::consts::FRAC_1_SQRT_2,
            active: false,
            note_on_time: 0,
            priority: 0,
            control_counter: 0,
            amp_trim: 1.0,
            pitch_bend: 0.0,
            current_level: 0.0,
        }
    }

    /// Copy preset values into the voice.
    ///
    /// When the voice is inactive its DSP history (filter integrators,
    /// oscillator phases, smoothers) is reset for a clean start. A live
    /// voice being hot-swapped only receives new values — discarding
    /// state mid-playback would click.
    pub fn configure(&mut self, preset: &Preset) {
        if !self.active {
            self.filter.reset();
            self.osc1.reset();
            self.osc2.reset();
            self.noise.reset();
            self.cutoff_smooth.set_immediate(preset.filter_cutoff);
            self.res_smooth.set_immediate(preset.filter_resonance);
        }

        self.osc1_level = preset.osc1_level;
        self.osc2_level = preset.osc2_level;
        self.noise_level = preset.noise_level;
        self.osc1.set_waveform(preset.osc1_waveform);
        self.osc2.set_waveform(preset.osc2_waveform);
        self.osc2_semitones = preset.osc2_semitones as f32;
        self.osc2_detune = preset.osc2_detune;
        self.base_pulse_width = preset.pulse_width;
        self.osc1.set_pulse_width(preset.pulse_width);
        self.osc2.set_pulse_width(preset.pulse_width);
        self.noise.set_color(preset.noise_color);

        self.filter.set_mode(preset.filter_mode);
        self.base_cutoff = preset.filter_cutoff;
        self.base_resonance = preset.filter_resonance.clamp(0.0, 1.0);
        self.filter_env_amount = preset.filter_env_amount;

        self.amp_env.set_attack(preset.amp_attack);
        self.amp_env.set_decay(preset.amp_decay);
        self.amp_env.set_sustain(preset.amp_sustain);
        self.amp_env.set_release(preset.amp_release);

        self.filter_env.set_attack(preset.filter_attack);
        self.filter_env.set_decay(preset.filter_decay);
        self.filter_env.set_sustain(preset.filter_sustain);
        self.filter_env.set_release(preset.filter_release);

        self.lfo1.set_frequency(preset.lfo1_rate);
        self.lfo1.set_waveform(preset.lfo1_waveform);
        self.lfo2.set_frequency(preset.lfo2_rate);
        self.lfo2.set_waveform(preset.lfo2_waveform);
        self.lfo1_to_filter = preset.lfo1_to_filter;
        self.velocity_to_filter = preset.velocity_to_filter;

        self.priority = preset.priority.min(10);
    }

    /// Start a note.
    pub fn note_on(&mut self, pitch: u8, velocity: f32, gain: f32, pan: f32, stamp: u32) {
        self.note = pitch;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.gain = gain.max(0.0);
        self.pan = pan.clamp(0.0, 1.0);
        // Constant-power pan, fixed for the life of the note.
        let angle = self.pan * core::f32::consts::FRAC_PI_2;
        self.pan_left = cosf(angle);
        self.pan_right = sinf(angle);

        self.base_freq = midi_to_freq(f32::from(pitch));
        self.osc1.set_frequency(self.base_freq);
        self.osc2.set_frequency(
            self.base_freq * semitones_to_ratio(self.osc2_semitones + self.osc2_detune),
        );
        // Phase reset gives every note the same attack transient.
        self.osc1.reset();
        self.osc2.reset();

        self.amp_env.note_on();
        self.filter_env.note_on();
        self.matrix.set_source(ModSource::Velocity, self.velocity);

        self.active = true;
        self.note_on_time = stamp;
        self.control_counter = 0;
        self.current_level = 0.0;
    }

    /// Release the note. Idempotent.
    pub fn note_off(&mut self) {
        self.amp_env.note_off();
        self.filter_env.note_off();
    }

    /// Per-block performance controls, loaded once from the shared
    /// atomics and pushed down by the mixer.
    pub fn set_block_controls(&mut self, pitch_bend: f32, mod_wheel: f32, aftertouch: f32) {
        self.pitch_bend = pitch_bend;
        self.matrix.set_source(ModSource::ModWheel, mod_wheel);
        self.matrix.set_source(ModSource::Aftertouch, aftertouch);
    }

    /// Generate one mono sample.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }

        // Audio-rate modulation generation.
        let lfo1 = self.lfo1.next_value();
        let lfo2 = self.lfo2.next_value();
        let filter_env = self.filter_env.next_level();
        let amp_env = self.amp_env.next_level();
        self.matrix.set_source(ModSource::Lfo1, lfo1);
        self.matrix.set_source(ModSource::Lfo2, lfo2);
        self.matrix.set_source(ModSource::FilterEnv, filter_env);
        self.matrix.set_source(ModSource::AmpEnv, amp_env);

        // Control-rate block: matrix pass and coefficient targets.
        if self.control_counter == 0 {
            self.control_tick(filter_env);
        }
        self.control_counter += 1;
        if self.control_counter >= CONTROL_RATE_INTERVAL {
            self.control_counter = 0;
        }

        // Audio-rate synthesis.
        let mix = self.osc1.next_sample() * self.osc1_level
            + self.osc2.next_sample() * self.osc2_level
            + self.noise.next_sample() * self.noise_level;

        self.filter
            .set_cutoff_resonance(self.cutoff_smooth.next_value(), self.res_smooth.next_value());
        let filtered = self.filter.process(mix);

        let out = filtered * amp_env * self.velocity * self.gain * self.amp_trim;

        // Housekeeping.
        self.current_level = out.abs();
        if !self.amp_env.is_active() {
            self.active = false;
        }

        out
    }

    /// Generate one stereo frame with constant-power panning.
    #[inline]
    pub fn process_stereo(&mut self) -> (f32, f32) {
        let mono = self.process();
        (mono * self.pan_left, mono * self.pan_right)
    }

    fn control_tick(&mut self, filter_env: f32) {
        self.matrix.process();

        let pitch_mod = self.matrix.destination(ModDestination::Pitch) + self.pitch_bend;
        self.osc1
            .set_frequency(self.base_freq * semitones_to_ratio(pitch_mod));

        let osc2_offset = self.osc2_semitones
            + self.osc2_detune
            + self.matrix.destination(ModDestination::Osc2Pitch);
        self.osc2
            .set_frequency(self.base_freq * semitones_to_ratio(pitch_mod + osc2_offset));

        let pw = (self.base_pulse_width + self.matrix.destination(ModDestination::PulseWidth))
            .clamp(0.05, 0.95);
        self.osc1.set_pulse_width(pw);
        self.osc2.set_pulse_width(pw);

        let cutoff = self.base_cutoff
            + filter_env * self.filter_env_amount
            + self.matrix.destination(ModDestination::FilterCutoff) * self.lfo1_to_filter
            + self.velocity * self.velocity_to_filter;
        self.cutoff_smooth
            .set_target(cutoff.clamp(20.0, self.sample_rate * 0.45));

        let resonance = (self.base_resonance
            + self.matrix.destination(ModDestination::FilterRes))
        .clamp(0.0, 1.0);
        self.res_smooth.set_target(resonance);

        self.amp_trim =
            (1.0 + self.matrix.destination(ModDestination::Amplitude)).clamp(0.0, 2.0);
    }

    // --- queries -----------------------------------------------------

    /// True while the amp envelope has not decayed to idle.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while the note is in its release tail.
    pub fn is_in_release(&self) -> bool {
        self.active && self.amp_env.is_in_release()
    }

    /// Most recent absolute output level, used by the stealer.
    pub fn current_level(&self) -> f32 {
        self.current_level
    }

    /// Stamp recorded at note-on.
    pub fn note_on_time(&self) -> u32 {
        self.note_on_time
    }

    /// Steal resistance copied from the triggering preset.
    pub fn current_priority(&self) -> u8 {
        self.priority
    }

    /// Current note number.
    pub fn note_number(&self) -> u8 {
        self.note
    }

    /// Amp envelope level, for tests and metering.
    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }
}
