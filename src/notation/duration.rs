// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Duration bucketing.
//!
//! Elapsed milliseconds fall into one of five symbolic classes using
//! half-open intervals. A duration always lands in its containing
//! bucket; there is no rounding to the nearest class.

use serde::{Deserialize, Serialize};

/// Symbolic note duration, finest to coarsest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationClass {
    /// [0, 200) ms
    Sixteenth,
    /// [200, 400) ms
    Eighth,
    /// [400, 800) ms
    Quarter,
    /// [800, 1600) ms
    Half,
    /// 1600 ms and longer
    Whole,
}

impl DurationClass {
    pub const ALL: [DurationClass; 5] = [
        DurationClass::Sixteenth,
        DurationClass::Eighth,
        DurationClass::Quarter,
        DurationClass::Half,
        DurationClass::Whole,
    ];

    /// Inclusive lower bound in milliseconds
    pub fn lower_bound(self) -> u64 {
        match self {
            DurationClass::Sixteenth => 0,
            DurationClass::Eighth => 200,
            DurationClass::Quarter => 400,
            DurationClass::Half => 800,
            DurationClass::Whole => 1600,
        }
    }

    /// Exclusive upper bound; `None` for the open-ended whole note
    pub fn upper_bound(self) -> Option<u64> {
        match self {
            DurationClass::Sixteenth => Some(200),
            DurationClass::Eighth => Some(400),
            DurationClass::Quarter => Some(800),
            DurationClass::Half => Some(1600),
            DurationClass::Whole => None,
        }
    }

    pub fn contains(self, duration_ms: u64) -> bool {
        duration_ms >= self.lower_bound()
            && self.upper_bound().map_or(true, |upper| duration_ms < upper)
    }

    /// LilyPond duration suffix
    pub fn lily_token(self) -> &'static str {
        match self {
            DurationClass::Sixteenth => "16",
            DurationClass::Eighth => "8",
            DurationClass::Quarter => "4",
            DurationClass::Half => "2",
            DurationClass::Whole => "1",
        }
    }
}

/// Map an elapsed time to its duration class
pub fn bucket_duration(duration_ms: u64) -> DurationClass {
    match duration_ms {
        0..=199 => DurationClass::Sixteenth,
        200..=399 => DurationClass::Eighth,
        400..=799 => DurationClass::Quarter,
        800..=1599 => DurationClass::Half,
        _ => DurationClass::Whole,
    }
}
