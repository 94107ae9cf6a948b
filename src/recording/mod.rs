// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and export system.
//!
//! This module provides:
//! - Note-on/note-off correlation into completed notes
//! - Recording sessions behind a single shared lock
//! - Standard MIDI file export

pub mod capture;
pub mod export;
pub mod session;

pub use capture::{CompletedNote, NoteCapture};
pub use export::MidiExporter;
pub use session::{FinishedSession, Recorder, RecordingSession, SessionState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_creation() {
        let capture = NoteCapture::new(0);
        assert_eq!(capture.active_count(), 0);
    }

    #[test]
    fn test_exporter_creation() {
        let exporter = MidiExporter::new();
        assert_eq!(exporter.ppqn(), 480);
    }

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }
}
