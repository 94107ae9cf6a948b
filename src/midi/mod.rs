// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input abstraction layer.
//!
//! This module provides a trait-based abstraction over the host MIDI
//! subsystem, allowing the midir backend and the in-memory virtual
//! keyboard to be used interchangeably by the device registry and the
//! connection manager.

pub mod connection;
pub mod input;
pub mod virtual_keyboard;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::timing::Clock;

pub use connection::{select_device, ConnectionHandle, DeviceManager, MatchStrategy};
pub use input::{print_sources, EventKind, MidirHost, RawEvent};
pub use virtual_keyboard::{VirtualHost, VirtualKeyboard, VIRTUAL_KEYBOARD_NAME};

/// Whether a device's capabilities could be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    Available,
    Unavailable,
}

/// A MIDI device as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDevice {
    /// Port name exposed by the host
    pub name: String,
    /// Free-form description (backend, port direction)
    pub description: String,
    /// Can produce events (a MIDI source)
    pub can_transmit: bool,
    /// Can accept events (a MIDI destination)
    pub can_receive: bool,
    pub availability: Availability,
}

impl InputDevice {
    /// A device that produces events
    pub fn source(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            can_transmit: true,
            can_receive: false,
            availability: Availability::Available,
        }
    }

    /// A device that only accepts events
    pub fn destination(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            can_transmit: false,
            can_receive: true,
            availability: Availability::Available,
        }
    }

    /// A device whose capabilities could not be queried
    pub fn unavailable(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            can_transmit: false,
            can_receive: false,
            availability: Availability::Unavailable,
        }
    }

    /// Can this device be bound as an input
    pub fn is_usable_input(&self) -> bool {
        self.can_transmit && self.availability == Availability::Available
    }

    /// Software sequencer, synthesizer or pass-through port rather than an instrument
    pub fn is_pseudo(&self) -> bool {
        let name = self.name.to_lowercase();
        ["sequencer", "synth", "through", "gervill"]
            .iter()
            .any(|marker| name.contains(marker))
    }

    fn capability_label(&self) -> String {
        if self.availability == Availability::Unavailable {
            return "Unavailable".to_string();
        }
        match (self.can_transmit, self.can_receive) {
            (true, true) => "Input/Output".to_string(),
            (true, false) => "Input".to_string(),
            (false, true) => "Output".to_string(),
            (false, false) => "None".to_string(),
        }
    }
}

impl fmt::Display for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.name, self.description, self.capability_label())
    }
}

/// Receives decoded note events from a device callback thread.
///
/// The sink stamps each event with its clock at the moment of delivery,
/// so hardware and simulated input share one time base.
#[derive(Clone)]
pub struct EventSink {
    clock: Arc<dyn Clock>,
    target: Arc<dyn Fn(RawEvent) + Send + Sync>,
}

impl EventSink {
    pub fn new<F>(clock: Arc<dyn Clock>, target: F) -> Self
    where
        F: Fn(RawEvent) + Send + Sync + 'static,
    {
        Self {
            clock,
            target: Arc::new(target),
        }
    }

    /// Decode raw MIDI bytes and forward note events; everything else is dropped
    pub fn deliver(&self, data: &[u8]) {
        if let Some(event) = RawEvent::decode(data, self.clock.now_ms()) {
            (self.target)(event);
        }
    }

    /// Forward an already-stamped event
    pub fn deliver_event(&self, event: RawEvent) {
        (self.target)(event);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// Trait for host MIDI subsystems.
///
/// Implementations query the host fresh on every call; nothing is cached
/// because device topology can change between calls.
pub trait MidiHost: Send + Sync {
    /// Enumerate devices with their capability flags.
    ///
    /// A device whose capabilities cannot be queried is still listed,
    /// tagged [`Availability::Unavailable`].
    fn devices(&self) -> Result<Vec<InputDevice>>;

    /// Open `device` as an input and route its events into `sink`
    fn open(&self, device: &InputDevice, sink: EventSink) -> Result<Box<dyn InputBinding>>;
}

/// An open input port; dropping or closing it detaches the sink
pub trait InputBinding: Send {
    fn device_name(&self) -> &str;

    fn close(self: Box<Self>);
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const STATUS_MASK: u8 = 0xF0;
    pub const DATA_MASK: u8 = 0x7F;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;
    use std::sync::Mutex;

    #[test]
    fn test_device_display() {
        let device = InputDevice::source("KeyStep", "midir input");
        assert_eq!(device.to_string(), "KeyStep - midir input (Input)");

        let broken = InputDevice::unavailable("Unknown 3", "midir input");
        assert_eq!(broken.to_string(), "Unknown 3 - midir input (Unavailable)");
    }

    #[test]
    fn test_pseudo_devices() {
        assert!(InputDevice::source("Real Time Sequencer", "").is_pseudo());
        assert!(InputDevice::source("Gervill", "software synth").is_pseudo());
        assert!(InputDevice::source("Midi Through Port-0", "").is_pseudo());
        assert!(!InputDevice::source("Arturia KeyStep 37", "").is_pseudo());
    }

    #[test]
    fn test_usable_input() {
        assert!(InputDevice::source("A", "").is_usable_input());
        assert!(!InputDevice::destination("B", "").is_usable_input());
        assert!(!InputDevice::unavailable("C", "").is_usable_input());
    }

    #[test]
    fn test_event_sink_stamps_and_filters() {
        let clock = Arc::new(ManualClock::new(1234));
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = received.clone();
        let sink = EventSink::new(clock, move |event| store.lock().unwrap().push(event));

        sink.deliver(&[messages::NOTE_ON, 60, 100]);
        sink.deliver(&[0xB0, 1, 64]); // CC is not a note event
        sink.deliver(&[0xF8]); // clock tick

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], RawEvent::note_on(60, 100, 1234));
    }
}
