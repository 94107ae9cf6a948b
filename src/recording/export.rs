// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Writes a recorded note sequence as a Type 0 MIDI file so a take can
//! be replayed without going through the notation renderer.

use std::fs;
use std::path::Path;

use tracing::info;

use super::capture::CompletedNote;
use crate::error::Result;
use crate::midi::messages;

/// Event ordering at equal ticks: meta first, then releases, then attacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventOrder {
    Meta,
    NoteOff,
    NoteOn,
}

/// MIDI event for export
#[derive(Debug, Clone)]
struct MidiExportEvent {
    /// Absolute tick
    tick: u64,
    order: EventOrder,
    data: Vec<u8>,
}

impl MidiExportEvent {
    fn note_on(tick: u64, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            order: EventOrder::NoteOn,
            data: vec![
                messages::NOTE_ON,
                note & messages::DATA_MASK,
                velocity & messages::DATA_MASK,
            ],
        }
    }

    fn note_off(tick: u64, note: u8) -> Self {
        Self {
            tick,
            order: EventOrder::NoteOff,
            data: vec![messages::NOTE_OFF, note & messages::DATA_MASK, 0],
        }
    }

    fn tempo(bpm: f64) -> Self {
        let microseconds = (60_000_000.0 / bpm) as u32;
        Self {
            tick: 0,
            order: EventOrder::Meta,
            data: vec![
                0xFF, 0x51, 0x03,
                ((microseconds >> 16) & 0xFF) as u8,
                ((microseconds >> 8) & 0xFF) as u8,
                (microseconds & 0xFF) as u8,
            ],
        }
    }

    fn time_signature(numerator: u8, denominator: u8) -> Self {
        // Denominator is expressed as power of 2
        let denom_power = (denominator as f64).log2() as u8;
        Self {
            tick: 0,
            order: EventOrder::Meta,
            data: vec![
                0xFF, 0x58, 0x04,
                numerator,
                denom_power,
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per MIDI quarter note
            ],
        }
    }

    fn track_name(name: &str) -> Self {
        let bytes = &name.as_bytes()[..name.len().min(127)];
        let mut data = vec![0xFF, 0x03, bytes.len() as u8];
        data.extend_from_slice(bytes);
        Self {
            tick: 0,
            order: EventOrder::Meta,
            data,
        }
    }
}

/// Append a variable-length quantity
fn push_variable_length(buffer: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buffer.extend_from_slice(&bytes);
}

/// Type 0 MIDI file exporter for recorded notes
#[derive(Debug, Clone)]
pub struct MidiExporter {
    /// PPQN (ticks per quarter note)
    ppqn: u16,
    /// Tempo in BPM
    tempo: f64,
    time_sig: (u8, u8),
    track_name: Option<String>,
}

impl MidiExporter {
    pub fn new() -> Self {
        Self {
            ppqn: 480,
            tempo: 120.0,
            time_sig: (4, 4),
            track_name: None,
        }
    }

    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = bpm.clamp(20.0, 300.0);
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_time_signature(&mut self, numerator: u8, denominator: u8) {
        self.time_sig = (numerator.max(1), denominator.max(1));
    }

    pub fn time_signature(&self) -> (u8, u8) {
        self.time_sig
    }

    /// Name written as the track name meta event
    pub fn set_track_name(&mut self, name: impl Into<String>) {
        self.track_name = Some(name.into());
    }

    /// Convert milliseconds to ticks at the current tempo
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        let ticks_per_ms = self.ppqn as f64 * self.tempo / 60_000.0;
        (ms as f64 * ticks_per_ms).round() as u64
    }

    /// Write `notes` to a file
    pub fn export<P: AsRef<Path>>(&self, notes: &[CompletedNote], path: P) -> Result<()> {
        let bytes = self.export_to_bytes(notes);
        fs::write(path.as_ref(), &bytes)?;
        info!(
            "Exported {} notes to {}",
            notes.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Encode `notes` as a complete Type 0 file
    pub fn export_to_bytes(&self, notes: &[CompletedNote]) -> Vec<u8> {
        let mut events = vec![
            MidiExportEvent::tempo(self.tempo),
            MidiExportEvent::time_signature(self.time_sig.0, self.time_sig.1),
        ];
        if let Some(name) = &self.track_name {
            events.push(MidiExportEvent::track_name(name));
        }

        for note in notes {
            let start = self.ms_to_ticks(note.start_offset);
            let end = self.ms_to_ticks(note.end_offset());
            events.push(MidiExportEvent::note_on(start, note.pitch, note.velocity));
            events.push(MidiExportEvent::note_off(end, note.pitch));
        }

        // Stable sort keeps insertion order among equal keys
        events.sort_by_key(|e| (e.tick, e.order));

        let mut buffer = Vec::new();
        self.write_header(&mut buffer);
        self.write_track(&mut buffer, &events);
        buffer
    }

    /// Header chunk: format 0, one track
    fn write_header(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(b"MThd");
        buffer.extend_from_slice(&[0, 0, 0, 6]);
        buffer.extend_from_slice(&0u16.to_be_bytes());
        buffer.extend_from_slice(&1u16.to_be_bytes());
        buffer.extend_from_slice(&self.ppqn.to_be_bytes());
    }

    fn write_track(&self, buffer: &mut Vec<u8>, events: &[MidiExportEvent]) {
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in events {
            let delta = event.tick.saturating_sub(last_tick);
            push_variable_length(&mut track_data, delta.min(0x0FFF_FFFF) as u32);
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        // End of track
        push_variable_length(&mut track_data, 0);
        track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

        buffer.extend_from_slice(b"MTrk");
        buffer.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&track_data);
    }
}

impl Default for MidiExporter {
    fn default() -> Self {
        Self::new()
    }
}
