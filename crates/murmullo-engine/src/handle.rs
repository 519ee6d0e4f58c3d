//! The control-thread side of the engine.
//!
//! [`EngineHandle`] is the only way the rest of the application talks
//! to a running engine: non-blocking command submission over the SPSC
//! ring, relaxed-atomic scalar parameters sampled once per block by
//! the audio thread, and diagnostic counters flowing the other way.
//!
//! The handle is `Send` but deliberately not clonable — the ring is
//! single-producer, so exactly one owner may submit.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::Producer;

use crate::command::{Command, NoteParams, SubmitError, SustainKey};
use crate::preset::PresetLibrary;

/// Word-sized values shared between the two threads.
///
/// Floats are stored as their bit patterns in `AtomicU32`; every
/// access is `Relaxed`, which is all block-granular parameter sampling
/// needs.
#[derive(Debug)]
pub(crate) struct SharedControls {
    master_volume: AtomicU32,
    headroom: AtomicU32,
    pitch_bend: AtomicU32,
    mod_wheel: AtomicU32,
    aftertouch: AtomicU32,

    rejected_commands: AtomicU64,
    cancelled_commands: AtomicU64,
    overflowed_commands: AtomicU64,
}

impl SharedControls {
    pub fn new(master_volume: f32, headroom: f32) -> Self {
        Self {
            master_volume: AtomicU32::new(master_volume.to_bits()),
            headroom: AtomicU32::new(headroom.to_bits()),
            pitch_bend: AtomicU32::new(0.0f32.to_bits()),
            mod_wheel: AtomicU32::new(0.0f32.to_bits()),
            aftertouch: AtomicU32::new(0.0f32.to_bits()),
            rejected_commands: AtomicU64::new(0),
            cancelled_commands: AtomicU64::new(0),
            overflowed_commands: AtomicU64::new(0),
        }
    }

    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    pub fn headroom(&self) -> f32 {
        f32::from_bits(self.headroom.load(Ordering::Relaxed))
    }

    pub fn pitch_bend(&self) -> f32 {
        f32::from_bits(self.pitch_bend.load(Ordering::Relaxed))
    }

    pub fn mod_wheel(&self) -> f32 {
        f32::from_bits(self.mod_wheel.load(Ordering::Relaxed))
    }

    pub fn aftertouch(&self) -> f32 {
        f32::from_bits(self.aftertouch.load(Ordering::Relaxed))
    }

    pub fn count_rejected(&self) {
        self.rejected_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_cancelled(&self) {
        self.cancelled_commands.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counters describing commands that never reached a voice.
///
/// Queried from the control thread; the audio thread only increments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Dropped for invalid fields (NaN/Inf, out-of-range pitch).
    pub rejected_commands: u64,
    /// Discarded because their cancel token fired before the drain.
    pub cancelled_commands: u64,
    /// Refused at submission because the queue was full.
    pub overflowed_commands: u64,
}

/// Control-side handle to a [`SynthEngine`](crate::SynthEngine).
///
/// All submission methods are wait-free: they either enqueue the
/// command or return [`SubmitError::QueueFull`] immediately.
pub struct EngineHandle {
    producer: Producer<Command>,
    shared: Arc<SharedControls>,
    library: Arc<PresetLibrary>,
    next_stamp: u32,
}

impl EngineHandle {
    pub(crate) fn new(
        producer: Producer<Command>,
        shared: Arc<SharedControls>,
        library: Arc<PresetLibrary>,
    ) -> Self {
        Self {
            producer,
            shared,
            library,
            // Stamp 0 is reserved for "never played" voices.
            next_stamp: 1,
        }
    }

    /// Build [`NoteParams`] for a named preset from the library.
    pub fn note_params(&self, preset: &str) -> Result<NoteParams, SubmitError> {
        self.library
            .get(preset)
            .map(NoteParams::new)
            .ok_or_else(|| SubmitError::UnknownPreset(preset.to_string()))
    }

    /// Trigger a one-shot note.
    pub fn fire(&mut self, params: NoteParams) -> Result<(), SubmitError> {
        let stamp = self.take_stamp();
        self.push(Command::Fire { params, stamp })
    }

    /// Start a held note remembered under `key`.
    pub fn sustain_start(
        &mut self,
        key: SustainKey,
        params: NoteParams,
    ) -> Result<(), SubmitError> {
        let stamp = self.take_stamp();
        self.push(Command::SustainStart { key, params, stamp })
    }

    /// Release the note held under `key`. Unknown keys are ignored by
    /// the audio thread.
    pub fn sustain_release(&mut self, key: SustainKey) -> Result<(), SubmitError> {
        self.push(Command::SustainRelease { key })
    }

    /// Release everything; the panic button.
    pub fn all_off(&mut self) -> Result<(), SubmitError> {
        self.push(Command::AllOff)
    }

    /// Master output level, applied before the soft clip.
    pub fn set_master_volume(&self, volume: f32) {
        self.shared
            .master_volume
            .store(volume.max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Drive into the soft clipper; values below 1 leave extra margin.
    pub fn set_headroom(&self, headroom: f32) {
        self.shared
            .headroom
            .store(headroom.max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Global pitch bend in semitones.
    pub fn set_pitch_bend(&self, semitones: f32) {
        self.shared
            .pitch_bend
            .store(semitones.to_bits(), Ordering::Relaxed);
    }

    /// Mod wheel position in [0, 1], feeding the matrix source.
    pub fn set_mod_wheel(&self, value: f32) {
        self.shared
            .mod_wheel
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Aftertouch pressure in [0, 1], feeding the matrix source.
    pub fn set_aftertouch(&self, value: f32) {
        self.shared
            .aftertouch
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// The preset catalog this handle resolves names against.
    pub fn library(&self) -> &Arc<PresetLibrary> {
        &self.library
    }

    /// Snapshot of the drop counters.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            rejected_commands: self.shared.rejected_commands.load(Ordering::Relaxed),
            cancelled_commands: self.shared.cancelled_commands.load(Ordering::Relaxed),
            overflowed_commands: self.shared.overflowed_commands.load(Ordering::Relaxed),
        }
    }

    fn take_stamp(&mut self) -> u32 {
        let stamp = self.next_stamp;
        self.next_stamp = self.next_stamp.wrapping_add(1);
        if self.next_stamp == 0 {
            self.next_stamp = 1;
        }
        stamp
    }

    fn push(&mut self, command: Command) -> Result<(), SubmitError> {
        self.producer.push(command).map_err(|_| {
            self.shared
                .overflowed_commands
                .fetch_add(1, Ordering::Relaxed);
            SubmitError::QueueFull
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::Preset;

    fn handle_with_queue(capacity: usize) -> (EngineHandle, rtrb::Consumer<Command>) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        let mut library = PresetLibrary::new();
        library.add(Preset::named("p")).unwrap();
        let handle = EngineHandle::new(
            producer,
            Arc::new(SharedControls::new(0.8, 0.8)),
            Arc::new(library),
        );
        (handle, consumer)
    }

    #[test]
    fn submission_is_stamped_in_order() {
        let (mut handle, mut consumer) = handle_with_queue(8);
        let params = handle.note_params("p").unwrap();
        handle.fire(params.clone()).unwrap();
        handle.fire(params).unwrap();

        let first = consumer.pop().unwrap();
        let second = consumer.pop().unwrap();
        match (first, second) {
            (Command::Fire { stamp: a, .. }, Command::Fire { stamp: b, .. }) => {
                assert_eq!(a, 1);
                assert_eq!(b, 2);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn overflow_is_reported_not_blocked() {
        let (mut handle, _consumer) = handle_with_queue(1);
        let params = handle.note_params("p").unwrap();
        handle.fire(params.clone()).unwrap();
        assert_eq!(handle.fire(params), Err(SubmitError::QueueFull));
        assert_eq!(handle.diagnostics().overflowed_commands, 1);
    }

    #[test]
    fn unknown_preset_is_a_control_side_error() {
        let (handle, _consumer) = handle_with_queue(4);
        let err = handle.note_params("missing").unwrap_err();
        assert_eq!(err, SubmitError::UnknownPreset("missing".to_string()));
    }

    #[test]
    fn shared_scalars_round_trip_through_bits() {
        let (handle, _consumer) = handle_with_queue(4);
        handle.set_master_volume(0.25);
        handle.set_headroom(1.5);
        handle.set_pitch_bend(-2.0);
        assert_eq!(handle.shared.master_volume(), 0.25);
        assert_eq!(handle.shared.headroom(), 1.5);
        assert_eq!(handle.shared.pitch_bend(), -2.0);
    }
}
