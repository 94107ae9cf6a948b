// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pitch spelling in LilyPond note names.
//!
//! Octave 4 is the reference and carries no marker. Each octave above
//! adds one `'`, each octave below adds one `,`. Documents wrap their
//! notes in `\fixed c'` so the unmarked octave renders as the one
//! containing middle C.

use crate::music::{octave_of, pitch_from, MidiPitch, PitchClass};

/// Octave spelled without markers
pub const REFERENCE_OCTAVE: i8 = 4;

const UP: char = '\'';
const DOWN: char = ',';

/// Spell a MIDI pitch: 60 -> `c`, 73 -> `cis'`, 47 -> `b,`
pub fn spell_pitch(pitch: MidiPitch) -> String {
    let class = PitchClass::of(pitch);
    let shift = octave_of(pitch) - REFERENCE_OCTAVE;

    let mut spelled = String::from(class.lily_name());
    let marker = if shift >= 0 { UP } else { DOWN };
    spelled.extend(std::iter::repeat(marker).take(shift.unsigned_abs() as usize));
    spelled
}

/// Inverse of [`spell_pitch`]; `None` for anything it would not produce
pub fn parse_pitch(token: &str) -> Option<MidiPitch> {
    let name = token.trim_end_matches([UP, DOWN]);
    let markers = &token[name.len()..];

    let ups = markers.chars().filter(|&c| c == UP).count();
    let downs = markers.len() - ups;
    if ups > 0 && downs > 0 {
        return None;
    }

    let class = PitchClass::from_lily_name(name)?;
    let octave = REFERENCE_OCTAVE as i64 + ups as i64 - downs as i64;
    pitch_from(class, i8::try_from(octave).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::MAX_PITCH;

    #[test]
    fn test_middle_c_unmarked() {
        assert_eq!(spell_pitch(60), "c");
        assert_eq!(spell_pitch(71), "b");
    }

    #[test]
    fn test_octave_markers() {
        assert_eq!(spell_pitch(72), "c'");
        assert_eq!(spell_pitch(85), "cis''");
        assert_eq!(spell_pitch(59), "b,");
        assert_eq!(spell_pitch(46), "ais,");
        assert_eq!(spell_pitch(0), "c,,,,,");
        assert_eq!(spell_pitch(127), "g'''''");
    }

    #[test]
    fn test_sharps() {
        let names: Vec<String> = (60..72).map(spell_pitch).collect();
        assert_eq!(
            names,
            vec!["c", "cis", "d", "dis", "e", "f", "fis", "g", "gis", "a", "ais", "b"]
        );
    }

    #[test]
    fn test_spelling_round_trip() {
        for pitch in 0..=MAX_PITCH {
            assert_eq!(parse_pitch(&spell_pitch(pitch)), Some(pitch), "pitch {}", pitch);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_pitch(""), None);
        assert_eq!(parse_pitch("h"), None);
        assert_eq!(parse_pitch("c',"), None);
        assert_eq!(parse_pitch("gis'''''"), None); // above 127
        assert_eq!(parse_pitch("c,,,,,,"), None); // below 0
    }
}
