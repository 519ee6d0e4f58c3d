//! Trigger dispatch on the audio thread.
//!
//! At the start of every block the mixer hands the dispatcher the SPSC
//! consumer; each drained command becomes a voice mutation. The
//! dispatcher also owns the two bookkeeping tables:
//!
//! - the **sustain table**, mapping producer-chosen keys to the voice
//!   holding that note, and
//! - the **timed table**, holding scheduled auto note-offs by absolute
//!   sample index.
//!
//! Both are fixed-capacity slot arrays sized to the pool at init, so
//! nothing here allocates. Entries remember the note-on stamp of the
//! voice they point at; a voice stolen in the meantime no longer
//! matches, which makes stale releases harmless no-ops.

use rtrb::Consumer;

use crate::command::{Command, NoteParams, Spatial, SustainKey};
use crate::handle::SharedControls;
use crate::pool::VoicePool;

#[derive(Clone, Copy, Debug)]
struct SustainEntry {
    key: SustainKey,
    voice: usize,
    stamp: u32,
}

#[derive(Clone, Copy, Debug)]
struct TimedEntry {
    /// Absolute sample index at which the note-off fires.
    due: u64,
    voice: usize,
    stamp: u32,
}

/// Spatialization constants, fixed at engine construction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpatialConfig {
    /// Distance attenuation factor: gain = 1 / (1 + d²·rolloff).
    pub rolloff: f32,
    /// Horizontal pan scale: pan = 0.5 + x·strength, clamped.
    pub pan_strength: f32,
}

pub(crate) struct Dispatcher {
    sustained: Vec<Option<SustainEntry>>,
    timed: Vec<Option<TimedEntry>>,
    spatial: SpatialConfig,
    sample_rate: f32,
    /// Set whenever the set of active voices may have grown; the
    /// mixer rebuilds its cache before rendering the block.
    membership_dirty: bool,
}

impl Dispatcher {
    pub fn new(sample_rate: f32, pool_size: usize, spatial: SpatialConfig) -> Self {
        Self {
            sustained: vec![None; pool_size],
            timed: vec![None; pool_size],
            spatial,
            sample_rate,
            membership_dirty: false,
        }
    }

    /// True once since the last call if voice membership changed.
    pub fn take_membership_dirty(&mut self) -> bool {
        core::mem::take(&mut self.membership_dirty)
    }

    /// Number of live sustain entries.
    pub fn sustained_count(&self) -> usize {
        self.sustained.iter().flatten().count()
    }

    /// Number of pending auto note-offs.
    pub fn timed_count(&self) -> usize {
        self.timed.iter().flatten().count()
    }

    /// Pre-block drain: drop stale table entries, fire due auto-offs,
    /// then decode every queued command in submission order.
    pub fn drain(
        &mut self,
        consumer: &mut Consumer<Command>,
        pool: &mut VoicePool,
        shared: &SharedControls,
        sample_clock: u64,
        frames: usize,
    ) {
        self.prune_stale(pool);
        self.process_due_offs(pool, sample_clock + frames as u64);

        while let Ok(command) = consumer.pop() {
            match command {
                Command::Fire { params, stamp } => {
                    self.fire(params, stamp, pool, shared, sample_clock);
                }
                Command::SustainStart { key, params, stamp } => {
                    self.sustain_start(key, params, stamp, pool, shared, sample_clock);
                }
                Command::SustainRelease { key } => {
                    self.sustain_release(key, pool);
                }
                Command::AllOff => {
                    self.all_off(pool);
                }
            }
        }
    }

    /// Keep the sustain table's invariant: every entry maps to a voice
    /// that is still active under the stamp it was inserted with.
    /// Voices that decayed to idle on their own leave stale keys
    /// behind; those are dropped here.
    fn prune_stale(&mut self, pool: &VoicePool) {
        for slot in &mut self.sustained {
            if let Some(entry) = *slot {
                let voice = &pool.voices()[entry.voice];
                if !voice.is_active() || voice.note_on_time() != entry.stamp {
                    *slot = None;
                }
            }
        }
    }

    /// Release every voice whose scheduled off time falls inside the
    /// coming block. Entries pointing at since-stolen voices (stamp
    /// mismatch) are dropped silently.
    fn process_due_offs(&mut self, pool: &mut VoicePool, block_end: u64) {
        for slot in &mut self.timed {
            if let Some(entry) = *slot {
                if entry.due < block_end {
                    let voice = pool.voice_mut(entry.voice);
                    if voice.is_active() && voice.note_on_time() == entry.stamp {
                        voice.note_off();
                    }
                    *slot = None;
                }
            }
        }
    }

    fn fire(
        &mut self,
        params: NoteParams,
        stamp: u32,
        pool: &mut VoicePool,
        shared: &SharedControls,
        sample_clock: u64,
    ) -> Option<usize> {
        if params
            .cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            shared.count_cancelled();
            return None;
        }
        if !Self::params_valid(&params) {
            shared.count_rejected();
            return None;
        }

        let preset = &params.preset;
        let pitch = params.pitch.unwrap_or(preset.default_note);
        if pitch > 127 {
            shared.count_rejected();
            return None;
        }

        let (gain, pan) = self.resolve_spatial(params.spatial);
        let priority = preset.priority.min(10);
        let index = pool.steal(priority, stamp);

        // The stolen voice's old bookkeeping no longer applies.
        self.forget_voice(index);

        let voice = pool.voice_mut(index);
        voice.configure(preset);
        voice.note_on(pitch, params.velocity, gain, pan, stamp);
        self.membership_dirty = true;

        if let Some(duration) = params.duration {
            if duration > 0.0 {
                let due = sample_clock + libm::roundf(duration * self.sample_rate) as u64;
                self.insert_timed(TimedEntry {
                    due,
                    voice: index,
                    stamp,
                });
            }
        }

        Some(index)
    }

    fn sustain_start(
        &mut self,
        key: SustainKey,
        params: NoteParams,
        stamp: u32,
        pool: &mut VoicePool,
        shared: &SharedControls,
        sample_clock: u64,
    ) {
        // A colliding key releases its previous holder first.
        self.sustain_release(key, pool);

        if let Some(index) = self.fire(params, stamp, pool, shared, sample_clock) {
            self.insert_sustained(SustainEntry {
                key,
                voice: index,
                stamp,
            });
        }
    }

    fn sustain_release(&mut self, key: SustainKey, pool: &mut VoicePool) {
        for slot in &mut self.sustained {
            if let Some(entry) = *slot {
                if entry.key == key {
                    let voice = pool.voice_mut(entry.voice);
                    if voice.is_active() && voice.note_on_time() == entry.stamp {
                        voice.note_off();
                    }
                    *slot = None;
                    return;
                }
            }
        }
        // Unknown key: a release with nothing to release is a no-op.
    }

    fn all_off(&mut self, pool: &mut VoicePool) {
        for voice in pool.voices_mut() {
            if voice.is_active() {
                voice.note_off();
            }
        }
        for slot in &mut self.sustained {
            *slot = None;
        }
        for slot in &mut self.timed {
            *slot = None;
        }
    }

    /// Drop any table entries pointing at `voice`; called when the
    /// voice is handed to a new note. Keeps both tables at one entry
    /// per distinct voice, so capacity = pool size always suffices.
    fn forget_voice(&mut self, voice: usize) {
        for slot in &mut self.sustained {
            if slot.is_some_and(|entry| entry.voice == voice) {
                *slot = None;
            }
        }
        for slot in &mut self.timed {
            if slot.is_some_and(|entry| entry.voice == voice) {
                *slot = None;
            }
        }
    }

    fn insert_sustained(&mut self, entry: SustainEntry) {
        if let Some(slot) = self.sustained.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(entry);
        }
    }

    fn insert_timed(&mut self, entry: TimedEntry) {
        if let Some(slot) = self.timed.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(entry);
        }
    }

    fn resolve_spatial(&self, spatial: Spatial) -> (f32, f32) {
        match spatial {
            Spatial::Direct { gain, pan } => (gain.max(0.0), pan.clamp(0.0, 1.0)),
            Spatial::Position { x, y, z } => {
                let d2 = x * x + y * y + z * z;
                let gain = 1.0 / (1.0 + d2 * self.spatial.rolloff);
                let pan = (0.5 + x * self.spatial.pan_strength).clamp(0.0, 1.0);
                (gain, pan)
            }
        }
    }

    /// NaN/Inf anywhere in a command poisons the whole chain; such
    /// commands are dropped with a diagnostic count instead.
    fn params_valid(params: &NoteParams) -> bool {
        if !params.velocity.is_finite() {
            return false;
        }
        if params.duration.is_some_and(|d| !d.is_finite()) {
            return false;
        }
        match params.spatial {
            Spatial::Direct { gain, pan } => gain.is_finite() && pan.is_finite(),
            Spatial::Position { x, y, z } => {
                x.is_finite() && y.is_finite() && z.is_finite()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spatial_config() -> SpatialConfig {
        SpatialConfig {
            rolloff: 0.1,
            pan_strength: 0.5,
        }
    }

    #[test]
    fn position_spatialization_attenuates_with_distance() {
        let dispatcher = Dispatcher::new(48000.0, 4, spatial_config());

        let (near_gain, _) = dispatcher.resolve_spatial(Spatial::Position {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        assert!((near_gain - 1.0).abs() < 1e-6);

        let (far_gain, _) = dispatcher.resolve_spatial(Spatial::Position {
            x: 0.0,
            y: 0.0,
            z: 10.0,
        });
        // d² = 100, rolloff 0.1: gain = 1/11
        assert!((far_gain - 1.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn position_pans_with_horizontal_offset() {
        let dispatcher = Dispatcher::new(48000.0, 4, spatial_config());

        let (_, center) = dispatcher.resolve_spatial(Spatial::Position {
            x: 0.0,
            y: 0.0,
            z: 1.0,
        });
        assert!((center - 0.5).abs() < 1e-6);

        let (_, right) = dispatcher.resolve_spatial(Spatial::Position {
            x: 0.6,
            y: 0.0,
            z: 1.0,
        });
        assert!((right - 0.8).abs() < 1e-6);

        let (_, hard_left) = dispatcher.resolve_spatial(Spatial::Position {
            x: -5.0,
            y: 0.0,
            z: 1.0,
        });
        assert_eq!(hard_left, 0.0, "pan clamps at the edges");
    }

    #[test]
    fn direct_spatial_is_clamped() {
        let dispatcher = Dispatcher::new(48000.0, 4, spatial_config());
        let (gain, pan) = dispatcher.resolve_spatial(Spatial::Direct {
            gain: -2.0,
            pan: 1.5,
        });
        assert_eq!(gain, 0.0);
        assert_eq!(pan, 1.0);
    }
}
