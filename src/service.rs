// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session operations for callers embedding keyscribe.
//!
//! [`KeyscribeService`] wires the device layer, the recorder, the
//! notation synthesizer and the renderer together. A caller records a
//! take, then hands the finished session to [`KeyscribeService::transcribe`]
//! to obtain the document and the rendered files.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::KeyscribeConfig;
use crate::error::Result;
use crate::midi::{ConnectionHandle, InputDevice, MidiHost};
use crate::notation::{NotationDocument, NotationSynthesizer};
use crate::recording::{CompletedNote, FinishedSession, MidiExporter, Recorder, SessionState};
use crate::render::{RenderArtifact, RenderOrchestrator};
use crate::timing::{Clock, MonotonicClock};

/// Everything produced for one completed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionArtifacts {
    pub id: String,
    pub notes: Vec<CompletedNote>,
    /// LilyPond source text
    pub document: String,
    /// Score first, then the performance file if one was produced
    pub artifacts: Vec<RenderArtifact>,
}

pub struct KeyscribeService {
    recorder: Recorder,
    synthesizer: NotationSynthesizer,
    renderer: RenderOrchestrator,
    exporter: MidiExporter,
}

impl KeyscribeService {
    pub fn new(config: &KeyscribeConfig, host: Arc<dyn MidiHost>) -> Self {
        Self::with_clock(config, host, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: &KeyscribeConfig,
        host: Arc<dyn MidiHost>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut exporter = MidiExporter::new();
        exporter.set_tempo(config.notation.tempo as f64);
        if let Some((num, den)) = config.notation.time_signature_parts() {
            exporter.set_time_signature(num, den);
        }

        Self {
            recorder: Recorder::new(host, clock),
            synthesizer: NotationSynthesizer::new(config.notation.clone()),
            renderer: RenderOrchestrator::new(&config.renderer),
            exporter,
        }
    }

    /// Replace the renderer (for a different program or output directory)
    pub fn with_renderer(mut self, renderer: RenderOrchestrator) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn renderer(&self) -> &RenderOrchestrator {
        &self.renderer
    }

    pub fn list_devices(&self) -> Result<Vec<InputDevice>> {
        self.recorder.devices().list_devices()
    }

    pub fn connect(&self, hint: &str) -> Result<ConnectionHandle> {
        self.recorder.devices().connect(hint)
    }

    pub fn disconnect(&self, handle: &ConnectionHandle) {
        self.recorder.devices().disconnect(handle)
    }

    pub fn disconnect_all(&self) {
        self.recorder.devices().disconnect_all()
    }

    pub fn start(&self) -> Result<String> {
        self.recorder.start()
    }

    pub fn simulate_note(&self, pitch: u8, velocity: u8, is_on: bool) -> Result<()> {
        self.recorder.simulate_note(pitch, velocity, is_on)
    }

    pub fn simulate_scale(&self) -> Result<()> {
        self.recorder.simulate_scale()
    }

    pub fn stop(&self) -> Result<FinishedSession> {
        self.recorder.stop()
    }

    pub fn state(&self) -> SessionState {
        self.recorder.state()
    }

    pub fn recording(&self, id: &str) -> Option<FinishedSession> {
        self.recorder.recording(id)
    }

    pub fn take_recording(&self, id: &str) -> Result<FinishedSession> {
        self.recorder.take_recording(id)
    }

    /// Notation document for a finished session; no I/O
    pub fn synthesize(&self, session: &FinishedSession) -> NotationDocument {
        self.synthesizer.synthesize(&session.notes)
    }

    /// Synthesize and render a finished session.
    ///
    /// The session itself is only read, so a failed render can simply
    /// be retried.
    pub async fn transcribe(&self, session: &FinishedSession) -> Result<SessionArtifacts> {
        let document = self.synthesize(session);
        let artifacts = self.renderer.render(document.as_str(), &session.id).await?;

        info!(
            "Transcribed session {}: {} notes, {} artifacts",
            session.id,
            session.note_count(),
            artifacts.len()
        );

        Ok(SessionArtifacts {
            id: session.id.clone(),
            notes: session.notes.clone(),
            document: document.into_string(),
            artifacts,
        })
    }

    /// Write the session as `<id>.mid` in the output directory
    pub fn export_midi(&self, session: &FinishedSession) -> Result<PathBuf> {
        std::fs::create_dir_all(self.renderer.output_dir())?;
        let path = self
            .renderer
            .output_dir()
            .join(format!("{}.mid", session.id));

        let mut exporter = self.exporter.clone();
        exporter.set_track_name(format!("keyscribe {}", session.id));
        exporter.export(&session.notes, &path)?;
        Ok(path)
    }
}
