// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording sessions and the recorder that owns them.
//!
//! All mutable session state (state flag, active notes, completed notes)
//! sits behind one mutex shared by the device callback thread and the
//! control calls. Neither side ever observes a half-applied transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::capture::{CompletedNote, NoteCapture};
use crate::error::{Error, Result};
use crate::midi::{DeviceManager, EventSink, MidiHost, RawEvent};
use crate::music::{pitch_name, MAJOR_SCALE, MAX_PITCH, MIDDLE_C};
use crate::timing::Clock;

/// Highest velocity a note message can carry
const MAX_VELOCITY: u8 = 127;
/// Velocity used by simulated scale notes
pub const SIMULATED_VELOCITY: u8 = 64;
/// How long each simulated scale note is held
pub const SIMULATED_NOTE_MS: u64 = 500;
/// Silence between simulated scale notes
pub const SIMULATED_GAP_MS: u64 = 100;

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session yet
    #[default]
    Idle,
    /// Capturing events
    Recording,
    /// Finished; terminal
    Stopped,
}

/// One bounded recording
#[derive(Debug)]
pub struct RecordingSession {
    id: String,
    state: SessionState,
    start_time: u64,
    capture: NoteCapture,
}

impl RecordingSession {
    fn begin(start_time: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Recording,
            start_time,
            capture: NoteCapture::new(start_time),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    fn on_event(&mut self, event: RawEvent) {
        // Devices keep transmitting regardless of application state
        if self.state == SessionState::Recording {
            self.capture.on_event(event);
        }
    }

    fn finish(&mut self, now: u64) -> FinishedSession {
        let notes = self.capture.finish(now);
        self.state = SessionState::Stopped;
        FinishedSession {
            id: self.id.clone(),
            notes,
            duration_ms: now.saturating_sub(self.start_time),
        }
    }
}

/// What a stopped session hands to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedSession {
    pub id: String,
    /// Sorted by start offset
    pub notes: Vec<CompletedNote>,
    /// Stop time minus start time
    pub duration_ms: u64,
}

impl FinishedSession {
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    session: Option<RecordingSession>,
    /// Finished sessions by id, until the caller takes them
    archive: HashMap<String, FinishedSession>,
}

impl RecorderState {
    fn on_event(&mut self, event: RawEvent) {
        if let Some(session) = self.session.as_mut() {
            session.on_event(event);
        }
    }

    fn recording_mut(&mut self) -> Option<&mut RecordingSession> {
        self.session
            .as_mut()
            .filter(|s| s.state == SessionState::Recording)
    }
}

fn lock(state: &Mutex<RecorderState>) -> MutexGuard<'_, RecorderState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the device connections and the current recording session
pub struct Recorder {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<RecorderState>>,
    sink: EventSink,
    devices: DeviceManager,
}

impl Recorder {
    /// Create a recorder whose device callbacks feed its sessions
    pub fn new(host: Arc<dyn MidiHost>, clock: Arc<dyn Clock>) -> Self {
        let state = Arc::new(Mutex::new(RecorderState::default()));

        let target = state.clone();
        let sink = EventSink::new(clock.clone(), move |event| lock(&target).on_event(event));
        let devices = DeviceManager::new(host, sink.clone());

        Self {
            clock,
            state,
            sink,
            devices,
        }
    }

    /// Device registry and connections
    pub fn devices(&self) -> &DeviceManager {
        &self.devices
    }

    /// Start a new session and return its id.
    ///
    /// A session still recording is stopped and archived first.
    pub fn start(&self) -> Result<String> {
        if !self.devices.is_connected() {
            warn!("Cannot start recording: no MIDI device connected");
            return Err(Error::NoActiveDevice);
        }

        let mut state = lock(&self.state);
        let now = self.clock.now_ms();

        if let Some(previous) = state.recording_mut() {
            let finished = previous.finish(now);
            warn!(
                "Recording {} still running; stopped with {} notes",
                finished.id,
                finished.note_count()
            );
            state.archive.insert(finished.id.clone(), finished);
        }

        let session = RecordingSession::begin(now);
        let id = session.id.clone();
        state.session = Some(session);

        info!("Recording started with ID: {}", id);
        Ok(id)
    }

    /// Stop the current session, closing held notes at the current time
    pub fn stop(&self) -> Result<FinishedSession> {
        let mut state = lock(&self.state);
        let now = self.clock.now_ms();

        let Some(session) = state.recording_mut() else {
            warn!("Cannot stop recording: not currently recording");
            return Err(Error::NotRecording);
        };
        let finished = session.finish(now);

        info!(
            "Recording {} stopped: {} notes in {:.1} seconds",
            finished.id,
            finished.note_count(),
            finished.duration_ms as f64 / 1000.0
        );

        state
            .archive
            .insert(finished.id.clone(), finished.clone());
        Ok(finished)
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.is_recording() {
            Ok(())
        } else {
            warn!("Please start recording first");
            Err(Error::NotRecording)
        }
    }

    /// Inject one synthetic note event, stamped now, through the device path
    pub fn simulate_note(&self, pitch: u8, velocity: u8, is_on: bool) -> Result<()> {
        if pitch > MAX_PITCH || velocity > MAX_VELOCITY {
            warn!("Rejected simulated note: pitch {}, velocity {}", pitch, velocity);
            return Err(Error::InvalidNote { pitch, velocity });
        }
        self.ensure_recording()?;

        let event = if is_on {
            RawEvent::note_on(pitch, velocity, 0)
        } else {
            RawEvent::note_off(pitch, 0)
        };
        debug!(
            "Simulated {} {}",
            if is_on { "Note On" } else { "Note Off" },
            pitch_name(event.pitch)
        );
        self.sink.deliver(&event.to_bytes());
        Ok(())
    }

    /// Inject a C major scale from middle C, laid out from the current time
    pub fn simulate_scale(&self) -> Result<()> {
        self.ensure_recording()?;
        info!("Simulating C major scale...");

        let base = self.clock.now_ms();
        let step = SIMULATED_NOTE_MS + SIMULATED_GAP_MS;

        for (i, interval) in MAJOR_SCALE.iter().enumerate() {
            let pitch = MIDDLE_C + interval;
            let on_at = base + i as u64 * step;
            self.sink
                .deliver_event(RawEvent::note_on(pitch, SIMULATED_VELOCITY, on_at));
            self.sink
                .deliver_event(RawEvent::note_off(pitch, on_at + SIMULATED_NOTE_MS));
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        lock(&self.state)
            .session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// Id of the current (or most recently stopped) session
    pub fn current_id(&self) -> Option<String> {
        lock(&self.state).session.as_ref().map(|s| s.id.clone())
    }

    /// Notes completed so far in the running session
    pub fn live_note_count(&self) -> usize {
        lock(&self.state)
            .session
            .as_ref()
            .map(|s| s.capture.notes().len())
            .unwrap_or(0)
    }

    /// Copy of an archived session
    pub fn recording(&self, id: &str) -> Option<FinishedSession> {
        lock(&self.state).archive.get(id).cloned()
    }

    /// Remove an archived session, handing ownership to the caller
    pub fn take_recording(&self, id: &str) -> Result<FinishedSession> {
        lock(&self.state)
            .archive
            .remove(id)
            .ok_or_else(|| Error::UnknownSession(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{VirtualHost, VIRTUAL_KEYBOARD_NAME};
    use crate::timing::ManualClock;

    fn connected_recorder() -> (Recorder, Arc<ManualClock>, VirtualHost) {
        let host = VirtualHost::new();
        let clock = Arc::new(ManualClock::new(0));
        let recorder = Recorder::new(Arc::new(host.clone()), clock.clone());
        recorder.devices().connect(VIRTUAL_KEYBOARD_NAME).unwrap();
        (recorder, clock, host)
    }

    #[test]
    fn test_recorder_creation() {
        let recorder = Recorder::new(Arc::new(VirtualHost::new()), Arc::new(ManualClock::new(0)));
        assert_eq!(recorder.state(), SessionState::Idle);
        assert_eq!(recorder.current_id(), None);
    }

    #[test]
    fn test_start_requires_device() {
        let recorder = Recorder::new(Arc::new(VirtualHost::new()), Arc::new(ManualClock::new(0)));
        assert!(matches!(recorder.start(), Err(Error::NoActiveDevice)));
        assert_eq!(recorder.state(), SessionState::Idle);
    }

    #[test]
    fn test_stop_requires_recording() {
        let (recorder, _, _) = connected_recorder();
        assert!(matches!(recorder.stop(), Err(Error::NotRecording)));

        recorder.start().unwrap();
        recorder.stop().unwrap();
        assert!(matches!(recorder.stop(), Err(Error::NotRecording)));
        assert_eq!(recorder.state(), SessionState::Stopped);
    }

    #[test]
    fn test_record_from_keyboard() {
        let (recorder, clock, host) = connected_recorder();
        let keyboard = host.keyboard(VIRTUAL_KEYBOARD_NAME);

        let id = recorder.start().unwrap();
        keyboard.press(60, 100);
        clock.advance(400);
        keyboard.release(60);

        let finished = recorder.stop().unwrap();
        assert_eq!(finished.id, id);
        assert_eq!(finished.notes, vec![CompletedNote::new(60, 100, 0, 400)]);
        assert_eq!(finished.duration_ms, 400);
    }

    #[test]
    fn test_events_outside_recording_discarded() {
        let (recorder, clock, host) = connected_recorder();
        let keyboard = host.keyboard(VIRTUAL_KEYBOARD_NAME);

        // Idle
        keyboard.press(60, 100);
        keyboard.release(60);

        recorder.start().unwrap();
        clock.advance(100);
        let finished = recorder.stop().unwrap();
        assert!(finished.notes.is_empty());

        // Stopped
        keyboard.press(62, 100);
        keyboard.release(62);
        assert_eq!(recorder.live_note_count(), 0);
    }

    #[test]
    fn test_held_note_truncated_at_stop() {
        let (recorder, clock, host) = connected_recorder();
        recorder.start().unwrap();
        host.keyboard(VIRTUAL_KEYBOARD_NAME).press(67, 90);
        clock.advance(1_000);

        let finished = recorder.stop().unwrap();
        assert_eq!(finished.notes, vec![CompletedNote::new(67, 90, 0, 1_000)]);
    }

    #[test]
    fn test_new_session_gets_fresh_id_and_buffer() {
        let (recorder, clock, _) = connected_recorder();

        let first = recorder.start().unwrap();
        recorder.simulate_note(60, 100, true).unwrap();
        clock.advance(200);
        recorder.simulate_note(60, 0, false).unwrap();
        recorder.stop().unwrap();

        let second = recorder.start().unwrap();
        assert_ne!(first, second);
        let finished = recorder.stop().unwrap();
        assert!(finished.notes.is_empty());
    }

    #[test]
    fn test_start_while_recording_archives_previous() {
        let (recorder, clock, _) = connected_recorder();
        let first = recorder.start().unwrap();
        recorder.simulate_note(60, 100, true).unwrap();
        clock.advance(300);

        let second = recorder.start().unwrap();
        let archived = recorder.recording(&first).unwrap();
        assert_eq!(archived.notes, vec![CompletedNote::new(60, 100, 0, 300)]);
        assert_eq!(recorder.current_id(), Some(second));
    }

    #[test]
    fn test_simulate_requires_recording() {
        let (recorder, _, _) = connected_recorder();
        assert!(matches!(
            recorder.simulate_note(60, 100, true),
            Err(Error::NotRecording)
        ));
        assert!(matches!(recorder.simulate_scale(), Err(Error::NotRecording)));
    }

    #[test]
    fn test_simulate_rejects_out_of_range_note() {
        let (recorder, clock, _) = connected_recorder();
        recorder.start().unwrap();

        assert!(matches!(
            recorder.simulate_note(200, 100, true),
            Err(Error::InvalidNote { pitch: 200, velocity: 100 })
        ));
        assert!(matches!(
            recorder.simulate_note(60, 128, true),
            Err(Error::InvalidNote { pitch: 60, velocity: 128 })
        ));
        recorder.simulate_note(127, 127, true).unwrap();
        clock.advance(100);
        recorder.simulate_note(127, 0, false).unwrap();

        let finished = recorder.stop().unwrap();
        assert_eq!(finished.notes, vec![CompletedNote::new(127, 127, 0, 100)]);
    }

    #[test]
    fn test_simulate_scale() {
        let (recorder, clock, _) = connected_recorder();
        clock.set(10_000);
        recorder.start().unwrap();
        recorder.simulate_scale().unwrap();
        clock.advance(5_000);

        let finished = recorder.stop().unwrap();
        let pitches: Vec<u8> = finished.notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64, 65, 67, 69, 71, 72]);
        assert!(finished.notes.iter().all(|n| n.duration_ms == 500));
        assert!(finished.notes.iter().all(|n| n.velocity == SIMULATED_VELOCITY));
        assert_eq!(finished.notes[1].start_offset, 600);
        assert_eq!(finished.notes[7].start_offset, 4_200);
    }

    #[test]
    fn test_take_recording() {
        let (recorder, _, _) = connected_recorder();
        let id = recorder.start().unwrap();
        recorder.stop().unwrap();

        assert!(recorder.recording(&id).is_some());
        let taken = recorder.take_recording(&id).unwrap();
        assert_eq!(taken.id, id);
        assert!(recorder.recording(&id).is_none());
        assert!(matches!(
            recorder.take_recording(&id),
            Err(Error::UnknownSession(_))
        ));
    }

    #[test]
    fn test_disconnect_does_not_stop_session() {
        let (recorder, _, _) = connected_recorder();
        recorder.start().unwrap();
        recorder.devices().disconnect_all();
        assert!(recorder.is_recording());
        assert!(recorder.stop().is_ok());
    }

    #[test]
    fn test_concurrent_callbacks_and_control() {
        let (recorder, _, host) = connected_recorder();
        let recorder = Arc::new(recorder);
        recorder.start().unwrap();

        let players: Vec<_> = (0..4u8)
            .map(|i| {
                let keyboard = host.keyboard(VIRTUAL_KEYBOARD_NAME);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        keyboard.press(60 + i, 100);
                        keyboard.release(60 + i);
                    }
                })
            })
            .collect();

        let controller = {
            let recorder = recorder.clone();
            std::thread::spawn(move || {
                for _ in 0..20 {
                    let _ = recorder.stop();
                    let _ = recorder.start();
                }
            })
        };

        for player in players {
            player.join().unwrap();
        }
        controller.join().unwrap();

        // Every session ends in a consistent state
        if recorder.is_recording() {
            let finished = recorder.stop().unwrap();
            assert!(finished.notes.iter().all(|n| (60..64).contains(&n.pitch)));
        }
        assert_eq!(recorder.state(), SessionState::Stopped);
    }
}
