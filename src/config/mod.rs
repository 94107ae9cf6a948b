// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for keyscribe.
//!
//! Settings for device selection, the external renderer, the notation
//! document layout and logging. Files may be YAML or TOML; the format
//! is chosen by extension. Every field has a default so a partial (or
//! empty) file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyscribeConfig {
    pub device: DeviceConfig,
    pub renderer: RendererConfig,
    pub notation: NotationConfig,
    pub logging: LoggingConfig,
}

impl KeyscribeConfig {
    /// Load and validate a configuration file (`.toml`, otherwise YAML)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = if is_toml(path) {
            Self::from_toml(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        Ok(config)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Save to a file, in the format implied by its extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_yaml()?
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if self.renderer.timeout_secs == 0 {
            return Err(Error::Config("renderer.timeout_secs must be positive".into()));
        }
        if self.renderer.executable.trim().is_empty() {
            return Err(Error::Config("renderer.executable is empty".into()));
        }
        if self.renderer.score_extension.trim().is_empty()
            || self.renderer.performance_extension.trim().is_empty()
        {
            return Err(Error::Config("renderer extensions must not be empty".into()));
        }
        if !(20..=300).contains(&self.notation.tempo) {
            return Err(Error::Config(format!(
                "notation.tempo {} out of range 20-300",
                self.notation.tempo
            )));
        }
        if self.notation.time_signature_parts().is_none() {
            return Err(Error::Config(format!(
                "notation.time_signature '{}' is not of the form N/M",
                self.notation.time_signature
            )));
        }
        if self.logging.max_level().is_none() {
            return Err(Error::Config(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

/// Input device selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name hint passed to connect; empty means "any physical input"
    pub name: Option<String>,
    /// Client name registered with the host MIDI subsystem
    pub client_name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: None,
            client_name: "keyscribe".to_string(),
        }
    }
}

/// External notation renderer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// Program to invoke
    pub executable: String,
    /// Hard wall-clock limit per render
    pub timeout_secs: u64,
    /// Directory for source documents and artifacts
    pub output_dir: PathBuf,
    pub score_extension: String,
    pub performance_extension: String,
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: "lilypond".to_string(),
            timeout_secs: 30,
            output_dir: PathBuf::from("output"),
            score_extension: "pdf".to_string(),
            performance_extension: "midi".to_string(),
        }
    }
}

/// Notation document layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotationConfig {
    /// LilyPond language version
    pub version: String,
    /// Quarter notes per minute
    pub tempo: u32,
    pub time_signature: String,
    pub clef: String,
}

impl NotationConfig {
    /// Numerator and denominator; the denominator must be a power of two
    pub fn time_signature_parts(&self) -> Option<(u8, u8)> {
        let (num, den) = self.time_signature.split_once('/')?;
        let num: u8 = num.trim().parse().ok()?;
        let den: u8 = den.trim().parse().ok()?;
        if num == 0 || !den.is_power_of_two() {
            return None;
        }
        Some((num, den))
    }
}

impl Default for NotationConfig {
    fn default() -> Self {
        Self {
            version: "2.24.0".to_string(),
            tempo: 120,
            time_signature: "4/4".to_string(),
            clef: "treble".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl LoggingConfig {
    pub fn max_level(&self) -> Option<tracing::Level> {
        self.level.trim().parse().ok()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
