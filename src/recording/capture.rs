// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note-on/note-off correlation.
//!
//! Turns a stream of raw note events into completed notes with
//! durations. Anomalies from real hardware (orphan note-offs, repeated
//! note-ons) are absorbed here rather than reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::midi::RawEvent;
use crate::music::pitch_name;

/// A finished note, timed relative to the start of its recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedNote {
    /// Note number (0-127)
    pub pitch: u8,
    /// Velocity (1-127)
    pub velocity: u8,
    /// Milliseconds since recording start
    pub start_offset: u64,
    pub duration_ms: u64,
}

impl CompletedNote {
    pub fn new(pitch: u8, velocity: u8, start_offset: u64, duration_ms: u64) -> Self {
        Self {
            pitch,
            velocity,
            start_offset,
            duration_ms,
        }
    }

    /// End offset in milliseconds
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.duration_ms
    }
}

/// Note on received, waiting for note off
#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    velocity: u8,
    start_timestamp: u64,
}

/// Correlates note-on and note-off events for one recording.
///
/// At most one active note exists per pitch. A repeated note-on for a
/// sounding pitch overwrites it (re-trigger): the earlier attack is
/// discarded and the note is timed from the latest attack.
#[derive(Debug, Default)]
pub struct NoteCapture {
    recording_start: u64,
    /// pitch -> active note
    active_notes: HashMap<u8, ActiveNote>,
    notes: Vec<CompletedNote>,
}

impl NoteCapture {
    /// Create a capture whose offsets are measured from `recording_start`
    pub fn new(recording_start: u64) -> Self {
        Self {
            recording_start,
            active_notes: HashMap::new(),
            notes: Vec::new(),
        }
    }

    /// Feed one event
    pub fn on_event(&mut self, event: RawEvent) {
        if event.is_release() {
            self.release(event.pitch, event.timestamp);
        } else {
            if self.active_notes.contains_key(&event.pitch) {
                debug!("Re-trigger on {}", pitch_name(event.pitch));
            }
            self.active_notes.insert(
                event.pitch,
                ActiveNote {
                    velocity: event.velocity,
                    start_timestamp: event.timestamp,
                },
            );
        }
    }

    fn release(&mut self, pitch: u8, timestamp: u64) {
        // Orphan note-offs cannot be correlated and are dropped
        let Some(active) = self.active_notes.remove(&pitch) else {
            debug!("Orphan note off on {}", pitch_name(pitch));
            return;
        };

        let note = self.complete(pitch, active, timestamp);
        debug!(
            "Recorded note: {} (duration: {} ms)",
            pitch_name(pitch),
            note.duration_ms
        );
        self.notes.push(note);
    }

    fn complete(&self, pitch: u8, active: ActiveNote, end: u64) -> CompletedNote {
        CompletedNote::new(
            pitch,
            active.velocity,
            active.start_timestamp.saturating_sub(self.recording_start),
            end.saturating_sub(active.start_timestamp),
        )
    }

    /// Close every still-sounding note at `now` and return the full
    /// sequence sorted by start offset. The capture is left empty.
    pub fn finish(&mut self, now: u64) -> Vec<CompletedNote> {
        let mut held: Vec<(u8, ActiveNote)> = self.active_notes.drain().collect();
        held.sort_by_key(|(pitch, active)| (active.start_timestamp, *pitch));

        for (pitch, active) in held {
            let note = self.complete(pitch, active, now);
            debug!(
                "Truncated held note: {} (duration: {} ms)",
                pitch_name(pitch),
                note.duration_ms
            );
            self.notes.push(note);
        }

        let mut notes = std::mem::take(&mut self.notes);
        notes.sort_by_key(|n| (n.start_offset, n.pitch));
        notes
    }

    /// Completed notes so far, in completion order
    pub fn notes(&self) -> &[CompletedNote] {
        &self.notes
    }

    /// Number of pitches currently sounding
    pub fn active_count(&self) -> usize {
        self.active_notes.len()
    }

    pub fn recording_start(&self) -> u64 {
        self.recording_start
    }
}
