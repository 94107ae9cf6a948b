// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Notation synthesis.
//!
//! Turns a completed note sequence into a LilyPond document. Each note
//! is spelled and bucketed independently, so the output depends only on
//! the notes and the layout settings.

pub mod duration;
pub mod spelling;

pub use duration::{bucket_duration, DurationClass};
pub use spelling::{parse_pitch, spell_pitch, REFERENCE_OCTAVE};

use std::fmt;

use tracing::debug;

use crate::config::NotationConfig;
use crate::recording::CompletedNote;

/// Comment emitted in place of notes for an empty recording
pub const EMPTY_MARKER: &str = "% no notes recorded";

/// Note emitted so an empty recording still renders
pub const PLACEHOLDER_NOTE: &str = "c4";

/// Notes per line in the document body
const NOTES_PER_LINE: usize = 8;

/// Token for one note: spelled pitch followed by its duration
pub fn note_token(note: &CompletedNote) -> String {
    format!(
        "{}{}",
        spell_pitch(note.pitch),
        bucket_duration(note.duration_ms).lily_token()
    )
}

/// A generated LilyPond source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationDocument {
    text: String,
    tokens: Vec<String>,
}

impl NotationDocument {
    /// Full document text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Note tokens in document order (the placeholder for an empty take)
    pub fn note_tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Is this the placeholder document for an empty recording
    pub fn is_placeholder(&self) -> bool {
        self.text.contains(EMPTY_MARKER)
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for NotationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for NotationDocument {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Builds notation documents with fixed layout settings
#[derive(Debug, Clone, Default)]
pub struct NotationSynthesizer {
    layout: NotationConfig,
}

impl NotationSynthesizer {
    pub fn new(layout: NotationConfig) -> Self {
        Self { layout }
    }

    /// Synthesize a document from `notes` in start-offset order
    pub fn synthesize(&self, notes: &[CompletedNote]) -> NotationDocument {
        let mut ordered = notes.to_vec();
        ordered.sort_by_key(|n| (n.start_offset, n.pitch));

        let tokens: Vec<String> = if ordered.is_empty() {
            vec![PLACEHOLDER_NOTE.to_string()]
        } else {
            ordered.iter().map(note_token).collect()
        };

        let mut body = String::new();
        if ordered.is_empty() {
            body.push_str("      ");
            body.push_str(EMPTY_MARKER);
            body.push('\n');
        }
        for line in tokens.chunks(NOTES_PER_LINE) {
            body.push_str("      ");
            body.push_str(&line.join(" "));
            body.push('\n');
        }

        let text = format!(
            r#"\version "{version}"

\score {{
  \new Staff {{
    \clef {clef}
    \time {time}
    \tempo 4 = {tempo}
    \fixed c' {{
{body}    }}
  }}
  \layout {{ }}
  \midi {{ }}
}}
"#,
            version = self.layout.version,
            clef = self.layout.clef,
            time = self.layout.time_signature,
            tempo = self.layout.tempo,
            body = body,
        );

        debug!("Synthesized {} notes into {} bytes", ordered.len(), text.len());
        NotationDocument { text, tokens }
    }
}

/// Synthesize with the default layout
pub fn synthesize(notes: &[CompletedNote]) -> NotationDocument {
    NotationSynthesizer::default().synthesize(notes)
}
