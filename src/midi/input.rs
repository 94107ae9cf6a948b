// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input handling for receiving notes from controllers.
//!
//! This module decodes raw note messages and provides the midir-backed
//! host used for real hardware.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput};
use tracing::{debug, info, warn};

use super::{messages, EventSink, InputBinding, InputDevice, MidiHost};
use crate::error::{Error, Result};

/// Note event kinds captured by the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// One hardware occurrence, stamped in monotonic milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    /// Note number (0-127)
    pub pitch: u8,
    /// Velocity (0-127); only meaningful for NoteOn
    pub velocity: u8,
    pub timestamp: u64,
}

impl RawEvent {
    pub fn note_on(pitch: u8, velocity: u8, timestamp: u64) -> Self {
        Self {
            kind: EventKind::NoteOn,
            pitch: pitch & messages::DATA_MASK,
            velocity: velocity & messages::DATA_MASK,
            timestamp,
        }
    }

    pub fn note_off(pitch: u8, timestamp: u64) -> Self {
        Self {
            kind: EventKind::NoteOff,
            pitch: pitch & messages::DATA_MASK,
            velocity: 0,
            timestamp,
        }
    }

    /// Decode a raw MIDI short message.
    ///
    /// Returns `None` for anything that is not a note on/off message.
    /// A NoteOn with velocity 0 is kept as-is; [`RawEvent::is_release`]
    /// treats it as a release.
    pub fn decode(data: &[u8], timestamp: u64) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let pitch = data[1] & messages::DATA_MASK;
        match data[0] & messages::STATUS_MASK {
            messages::NOTE_ON => Some(Self::note_on(pitch, data[2], timestamp)),
            messages::NOTE_OFF => Some(Self::note_off(pitch, timestamp)),
            _ => None,
        }
    }

    /// Encode as a channel 1 short message
    pub fn to_bytes(&self) -> [u8; 3] {
        match self.kind {
            EventKind::NoteOn => [messages::NOTE_ON, self.pitch, self.velocity],
            EventKind::NoteOff => [messages::NOTE_OFF, self.pitch, 0],
        }
    }

    /// Does this event end a sounding note
    pub fn is_release(&self) -> bool {
        self.kind == EventKind::NoteOff || self.velocity == 0
    }
}

/// Host MIDI subsystem via midir (ALSA, Core MIDI, WinMM)
#[derive(Debug, Clone)]
pub struct MidirHost {
    client_name: String,
}

impl MidirHost {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn scan_client(&self) -> String {
        format!("{}-scan", self.client_name)
    }
}

impl Default for MidirHost {
    fn default() -> Self {
        Self::new("keyscribe")
    }
}

fn merge_device(devices: &mut Vec<InputDevice>, name: String, transmit: bool) {
    if let Some(existing) = devices.iter_mut().find(|d| d.name == name) {
        existing.can_transmit |= transmit;
        existing.can_receive |= !transmit;
        return;
    }

    if transmit {
        devices.push(InputDevice::source(name, "midir input port"));
    } else {
        devices.push(InputDevice::destination(name, "midir output port"));
    }
}

impl MidiHost for MidirHost {
    fn devices(&self) -> Result<Vec<InputDevice>> {
        let midi_in = MidiInput::new(&self.scan_client())
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        let midi_out = MidiOutput::new(&self.scan_client())
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        let mut devices = Vec::new();

        for (i, port) in midi_in.ports().iter().enumerate() {
            match midi_in.port_name(port) {
                Ok(name) => merge_device(&mut devices, name, true),
                Err(e) => {
                    warn!("MIDI input {} unavailable: {}", i, e);
                    devices.push(InputDevice::unavailable(
                        format!("Unknown input {}", i),
                        "midir input port",
                    ));
                }
            }
        }

        for (i, port) in midi_out.ports().iter().enumerate() {
            match midi_out.port_name(port) {
                Ok(name) => merge_device(&mut devices, name, false),
                Err(e) => {
                    warn!("MIDI output {} unavailable: {}", i, e);
                    devices.push(InputDevice::unavailable(
                        format!("Unknown output {}", i),
                        "midir output port",
                    ));
                }
            }
        }

        Ok(devices)
    }

    fn open(&self, device: &InputDevice, sink: EventSink) -> Result<Box<dyn InputBinding>> {
        let mut midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        midi_in.ignore(Ignore::All);

        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .map(|n| n == device.name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| Error::DeviceNotFound(device.name.clone()))?;

        let port_name = format!("{}-input", self.client_name);
        let connection = midi_in
            .connect(
                &port,
                &port_name,
                move |_stamp, data, _| sink.deliver(data),
                (),
            )
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        info!("Opened MIDI input: {}", device.name);

        Ok(Box::new(MidirBinding {
            connection: Some(connection),
            device_name: device.name.clone(),
        }))
    }
}

/// Live midir input connection
struct MidirBinding {
    connection: Option<MidiInputConnection<()>>,
    device_name: String,
}

impl InputBinding for MidirBinding {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn close(mut self: Box<Self>) {
        if let Some(conn) = self.connection.take() {
            conn.close();
            debug!("Closed MIDI input: {}", self.device_name);
        }
    }
}

/// Print all devices reported by `host` to stdout
pub fn print_sources(host: &dyn MidiHost) -> Result<()> {
    let devices = host.devices()?;
    if devices.is_empty() {
        println!("No MIDI devices found.");
    } else {
        println!("Available MIDI devices:");
        for (i, device) in devices.iter().enumerate() {
            println!("  {}: {}", i, device);
        }
    }
    Ok(())
}
