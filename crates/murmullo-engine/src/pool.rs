//! The fixed voice pool and its stealing policy.
//!
//! The pool is sized once at engine construction and never resized.
//! `steal` always yields a voice: the policy walks four clauses in
//! strict order, so pool exhaustion is impossible by construction.
//!
//! Note-on timestamps are u32 sequence numbers that may wrap within a
//! long session; ages are therefore compared as modular differences —
//! `stamp_now.wrapping_sub(note_on_time)`, largest difference oldest.

use crate::voice::Voice;

/// Fixed-size pool of reusable voices.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    /// Build `size` idle voices. Each slot gets its own noise seed so
    /// unison noise layers do not correlate.
    pub fn new(sample_rate: f32, size: usize) -> Self {
        let voices = (0..size)
            .map(|i| Voice::new(sample_rate, (i as u32).wrapping_add(1)))
            .collect();
        Self { voices }
    }

    /// Number of voices in the pool.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// True for a zero-sized pool (never constructed by the engine).
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Voices currently producing sound.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Read access to all voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Mutable access to all voices.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Mutable access to one voice.
    pub fn voice_mut(&mut self, index: usize) -> &mut Voice {
        &mut self.voices[index]
    }

    /// Pick the voice a new note of `requesting_priority` will take.
    ///
    /// Clauses are evaluated strictly in order, first match wins:
    ///
    /// 1. Any inactive voice (lowest index).
    /// 2. Among releasing voices at `priority <= requesting`, the
    ///    lowest priority; ties broken by smallest output level.
    /// 3. Among all voices at `priority <= requesting`, the oldest.
    /// 4. Last resort: the oldest voice overall.
    ///
    /// Deterministic given the pool state and `stamp_now`.
    pub fn steal(&self, requesting_priority: u8, stamp_now: u32) -> usize {
        // 1. Free voice
        if let Some(index) = self.voices.iter().position(|v| !v.is_active()) {
            return index;
        }

        // 2. Quietest low-priority releasing voice
        let releasing = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_in_release() && v.current_priority() <= requesting_priority)
            .min_by(|(_, a), (_, b)| {
                a.current_priority()
                    .cmp(&b.current_priority())
                    .then(a.current_level().total_cmp(&b.current_level()))
            });
        if let Some((index, _)) = releasing {
            return index;
        }

        // 3. Oldest voice the request outranks
        let age = |v: &Voice| stamp_now.wrapping_sub(v.note_on_time());
        let outranked = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.current_priority() <= requesting_priority)
            .max_by_key(|(_, v)| age(v));
        if let Some((index, _)) = outranked {
            return index;
        }

        // 4. Oldest overall — always yields a voice.
        self.voices
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| age(v))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}
