// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the millisecond clocks that stamp captured
//! events and bound a recording session.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};
