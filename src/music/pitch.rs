// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chromatic pitch classes and MIDI pitch arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// MIDI note number type (0-127)
pub type MidiPitch = u8;

/// Highest valid MIDI pitch
pub const MAX_PITCH: MidiPitch = 127;

/// Middle C
pub const MIDDLE_C: MidiPitch = 60;

/// Intervals of a major scale from its root, closing on the octave
pub const MAJOR_SCALE: [u8; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

/// Pitch classes, spelled with sharps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Index into the chromatic table (0-11)
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Pitch class of a MIDI pitch
    pub fn of(pitch: MidiPitch) -> Self {
        PitchClass::ALL[(pitch % 12) as usize]
    }

    /// LilyPond (Dutch) note name: `c`, `cis`, `d`, ...
    pub fn lily_name(self) -> &'static str {
        match self {
            PitchClass::C => "c",
            PitchClass::Cs => "cis",
            PitchClass::D => "d",
            PitchClass::Ds => "dis",
            PitchClass::E => "e",
            PitchClass::F => "f",
            PitchClass::Fs => "fis",
            PitchClass::G => "g",
            PitchClass::Gs => "gis",
            PitchClass::A => "a",
            PitchClass::As => "ais",
            PitchClass::B => "b",
        }
    }

    /// Parse a LilyPond note name
    pub fn from_lily_name(name: &str) -> Option<Self> {
        PitchClass::ALL.into_iter().find(|pc| pc.lily_name() == name)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        };
        f.write_str(name)
    }
}

/// Scientific octave number (-1..=9); middle C is octave 4
pub fn octave_of(pitch: MidiPitch) -> i8 {
    (pitch / 12) as i8 - 1
}

/// MIDI pitch from a pitch class and scientific octave
pub fn pitch_from(class: PitchClass, octave: i8) -> Option<MidiPitch> {
    let value = (octave as i16 + 1) * 12 + class.index() as i16;
    if (0..=MAX_PITCH as i16).contains(&value) {
        Some(value as MidiPitch)
    } else {
        None
    }
}

/// Human-readable name like "C4" or "F#2"
pub fn pitch_name(pitch: MidiPitch) -> String {
    format!("{}{}", PitchClass::of(pitch), octave_of(pitch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_of() {
        assert_eq!(PitchClass::of(60), PitchClass::C);
        assert_eq!(PitchClass::of(61), PitchClass::Cs);
        assert_eq!(PitchClass::of(71), PitchClass::B);
        assert_eq!(PitchClass::of(0), PitchClass::C);
        assert_eq!(PitchClass::of(127), PitchClass::G);
    }

    #[test]
    fn test_octave_of() {
        assert_eq!(octave_of(0), -1);
        assert_eq!(octave_of(59), 3);
        assert_eq!(octave_of(60), 4);
        assert_eq!(octave_of(127), 9);
    }

    #[test]
    fn test_pitch_from_round_trip() {
        for pitch in 0..=MAX_PITCH {
            assert_eq!(pitch_from(PitchClass::of(pitch), octave_of(pitch)), Some(pitch));
        }
        assert_eq!(pitch_from(PitchClass::Gs, 9), None);
        assert_eq!(pitch_from(PitchClass::C, -2), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(66), "F#4");
        assert_eq!(PitchClass::from_lily_name("ais"), Some(PitchClass::As));
        assert_eq!(PitchClass::from_lily_name("h"), None);
    }
}
