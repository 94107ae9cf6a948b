// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! keyscribe: record a MIDI keyboard and typeset what was played.
//!
//! Events from a connected input device are correlated into timed notes,
//! quantized into a LilyPond document, and rendered by the external
//! `lilypond` program into a score and a MIDI file.

pub mod config;
pub mod error;
pub mod midi;
pub mod music;
pub mod notation;
pub mod recording;
pub mod render;
pub mod service;
pub mod timing;

pub use config::KeyscribeConfig;
pub use error::{Error, Result};
pub use notation::{synthesize, NotationDocument, NotationSynthesizer};
pub use recording::{CompletedNote, FinishedSession, Recorder, SessionState};
pub use render::{ArtifactKind, RenderArtifact, RenderOrchestrator};
pub use service::{KeyscribeService, SessionArtifacts};
