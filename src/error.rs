// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error taxonomy for the capture and notation core.
//!
//! Device and render failures are surfaced verbatim so the caller can act
//! on them (pick another device, inspect renderer output). Correlation
//! anomalies such as orphan note-offs never show up here.

use std::time::Duration;

/// Errors returned by keyscribe operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No MIDI device matches '{0}'")]
    DeviceNotFound(String),

    #[error("MIDI host unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No MIDI device is connected")]
    NoActiveDevice,

    #[error("Not currently recording")]
    NotRecording,

    #[error("Renderer did not finish within {0:?}")]
    RenderTimeout(Duration),

    #[error("Renderer failed with exit code {}", describe_exit(.exit_code))]
    RenderFailed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Rendered artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("Unknown recording session: {0}")]
    UnknownSession(String),

    #[error("Invalid session id: '{0}'")]
    InvalidSessionId(String),

    #[error("Invalid note: pitch {pitch}, velocity {velocity}")]
    InvalidNote { pitch: u8, velocity: u8 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (killed by signal)".to_string(),
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
