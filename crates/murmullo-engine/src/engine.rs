//! Engine construction and the master mixer.
//!
//! [`SynthEngine`] is an explicit value owned by whoever owns the
//! audio callback — there is no global instance. Construction is the
//! only fallible step; once built, [`render`](SynthEngine::render)
//! never fails, never blocks, and never allocates.
//!
//! Per block the mixer drains the command queue into the voice pool,
//! refreshes its contiguous cache of active voices, sums each voice's
//! stereo output with energy-normalized gain (`master / √pool_size`),
//! and soft-clips the result before writing interleaved samples.

use std::sync::Arc;

use rtrb::{Consumer, RingBuffer};
use thiserror::Error;

use murmullo_core::fast_tanh;

use crate::command::Command;
use crate::dispatcher::{Dispatcher, SpatialConfig};
use crate::handle::{EngineHandle, SharedControls};
use crate::pool::VoicePool;
use crate::preset::PresetLibrary;
use crate::voice::Voice;

/// Samples between periodic rebuilds of the active-voice cache. The
/// cache is also rebuilt whenever a drain changed voice membership.
const ACTIVE_VOICE_REBUILD_INTERVAL: u32 = 1024;

/// Largest supported voice pool.
pub const MAX_POOL_SIZE: usize = 128;

/// Errors refusing engine construction. Nothing after construction is
/// fatal.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Sample rate must be a positive finite number.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// Pool size must be in 1..=128.
    #[error("pool size {0} outside supported range 1..={MAX_POOL_SIZE}")]
    InvalidPoolSize(usize),

    /// The command queue needs room for at least one command.
    #[error("command queue capacity must be nonzero")]
    InvalidQueueCapacity,
}

/// Engine construction parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Fixed sample rate in Hz.
    pub sample_rate: f32,
    /// Number of pooled voices (1..=128).
    pub pool_size: usize,
    /// SPSC command queue capacity. Size it at twice the largest burst
    /// of triggers expected between two audio blocks.
    pub queue_capacity: usize,
    /// Initial master volume.
    pub master_volume: f32,
    /// Initial soft-clip drive; below 1 leaves extra margin.
    pub headroom: f32,
    /// Distance attenuation factor for positional triggers.
    pub rolloff: f32,
    /// Horizontal pan scale for positional triggers.
    pub pan_strength: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            pool_size: 32,
            queue_capacity: 256,
            master_volume: 0.8,
            headroom: 0.8,
            rolloff: 0.1,
            pan_strength: 0.5,
        }
    }
}

/// The audio-thread half of the synthesizer.
pub struct SynthEngine {
    pool: VoicePool,
    dispatcher: Dispatcher,
    consumer: Consumer<Command>,
    shared: Arc<SharedControls>,

    /// Contiguous indices of voices believed active.
    active: Vec<usize>,
    samples_until_rebuild: u32,
    /// Running sample index since construction.
    sample_clock: u64,

    sample_rate: f32,
    /// 1/√pool_size, folded into the master gain.
    energy_norm: f32,
}

impl SynthEngine {
    /// Build an engine and its control handle.
    ///
    /// The preset library is shared with the handle for name
    /// resolution; treat it as an immutable catalog while the engine
    /// runs.
    pub fn new(
        config: EngineConfig,
        library: Arc<PresetLibrary>,
    ) -> Result<(Self, EngineHandle), EngineError> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(config.sample_rate));
        }
        if config.pool_size == 0 || config.pool_size > MAX_POOL_SIZE {
            return Err(EngineError::InvalidPoolSize(config.pool_size));
        }
        if config.queue_capacity == 0 {
            return Err(EngineError::InvalidQueueCapacity);
        }

        let (producer, consumer) = RingBuffer::new(config.queue_capacity);
        let shared = Arc::new(SharedControls::new(config.master_volume, config.headroom));
        let spatial = SpatialConfig {
            rolloff: config.rolloff,
            pan_strength: config.pan_strength,
        };

        tracing::info!(
            sample_rate = config.sample_rate,
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            presets = library.len(),
            "synth engine constructed"
        );

        let engine = Self {
            pool: VoicePool::new(config.sample_rate, config.pool_size),
            dispatcher: Dispatcher::new(config.sample_rate, config.pool_size, spatial),
            consumer,
            shared: Arc::clone(&shared),
            active: Vec::with_capacity(config.pool_size),
            samples_until_rebuild: 0,
            sample_clock: 0,
            sample_rate: config.sample_rate,
            energy_norm: 1.0 / libm::sqrtf(config.pool_size as f32),
        };
        let handle = EngineHandle::new(producer, shared, library);

        Ok((engine, handle))
    }

    /// Fill `output` with `output.len() / channels` frames of
    /// interleaved audio. `channels` is 1 (mono) or 2 (stereo);
    /// samples land in [-1, 1] after the soft clip.
    ///
    /// This is the pull-mode audio callback body: wait-free,
    /// allocation-free, infallible.
    pub fn render(&mut self, channels: usize, output: &mut [f32]) {
        debug_assert!(channels == 1 || channels == 2, "channels must be 1 or 2");
        let channels = channels.clamp(1, 2);
        let frames = output.len() / channels;

        self.dispatcher.drain(
            &mut self.consumer,
            &mut self.pool,
            &self.shared,
            self.sample_clock,
            frames,
        );

        // Sampled once per block.
        let master = self.shared.master_volume();
        let headroom = self.shared.headroom();
        let pitch_bend = self.shared.pitch_bend();
        let mod_wheel = self.shared.mod_wheel();
        let aftertouch = self.shared.aftertouch();

        if self.dispatcher.take_membership_dirty() || self.samples_until_rebuild == 0 {
            self.rebuild_active_cache();
        }

        let scale = master * self.energy_norm;
        let pool = &mut self.pool;
        let active = &self.active;

        for &index in active {
            pool.voice_mut(index)
                .set_block_controls(pitch_bend, mod_wheel, aftertouch);
        }

        if channels == 1 {
            for frame in output[..frames].iter_mut() {
                let mut sum = 0.0;
                for &index in active {
                    sum += pool.voice_mut(index).process();
                }
                *frame = fast_tanh(sum * scale * headroom);
            }
        } else {
            for frame in output[..frames * 2].chunks_exact_mut(2) {
                let mut left = 0.0;
                let mut right = 0.0;
                for &index in active {
                    let (l, r) = pool.voice_mut(index).process_stereo();
                    left += l;
                    right += r;
                }
                frame[0] = fast_tanh(left * scale * headroom);
                frame[1] = fast_tanh(right * scale * headroom);
            }
        }

        self.sample_clock += frames as u64;
        self.samples_until_rebuild = self
            .samples_until_rebuild
            .saturating_sub(frames as u32);
    }

    fn rebuild_active_cache(&mut self) {
        self.active.clear();
        for (index, voice) in self.pool.voices().iter().enumerate() {
            if voice.is_active() {
                self.active.push(index);
            }
        }
        self.samples_until_rebuild = ACTIVE_VOICE_REBUILD_INTERVAL;
    }

    // --- introspection ----------------------------------------------

    /// Engine sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Pool size chosen at construction.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Voices currently producing sound.
    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Read access to the voices, for metering and tests.
    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    /// Held notes currently tracked in the sustain table.
    pub fn sustained_note_count(&self) -> usize {
        self.dispatcher.sustained_count()
    }

    /// Auto note-offs still scheduled.
    pub fn scheduled_off_count(&self) -> usize {
        self.dispatcher.timed_count()
    }

    /// Samples rendered since construction.
    pub fn sample_clock(&self) -> u64 {
        self.sample_clock
    }
}
