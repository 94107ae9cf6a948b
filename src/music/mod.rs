// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music theory utilities.
//!
//! Pitch classes and the MIDI pitch arithmetic shared by the capture
//! layer and the notation synthesizer.

pub mod pitch;

pub use pitch::{
    octave_of, pitch_from, pitch_name, MidiPitch, PitchClass, MAJOR_SCALE, MAX_PITCH, MIDDLE_C,
};
