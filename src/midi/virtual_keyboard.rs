// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory MIDI host with a playable software keyboard.
//!
//! `VirtualHost` advertises a configurable device list and hands every
//! opened binding's sink to [`VirtualKeyboard`], which plays notes into
//! it as raw MIDI bytes. Events travel the same decode path as bytes
//! from the midir callback, so the recorder cannot tell them apart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{EventSink, InputBinding, InputDevice, MidiHost, RawEvent};
use crate::error::{Error, Result};

/// Name of the default virtual device
pub const VIRTUAL_KEYBOARD_NAME: &str = "Keyscribe Virtual Keyboard";

#[derive(Debug, Clone)]
struct VirtualPort {
    device: InputDevice,
    failing: bool,
    refusing: bool,
}

#[derive(Debug, Default)]
struct VirtualState {
    ports: Vec<VirtualPort>,
    /// binding id -> (device name, sink)
    sinks: HashMap<u64, (String, EventSink)>,
    next_binding: u64,
}

fn lock(state: &Mutex<VirtualState>) -> MutexGuard<'_, VirtualState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Software MIDI host
#[derive(Debug, Clone)]
pub struct VirtualHost {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualHost {
    /// Host with a single transmit-capable keyboard
    pub fn new() -> Self {
        Self::with_devices(vec![InputDevice::source(
            VIRTUAL_KEYBOARD_NAME,
            "Software keyboard",
        )])
    }

    /// Host advertising exactly `devices`
    pub fn with_devices(devices: Vec<InputDevice>) -> Self {
        let ports = devices
            .into_iter()
            .map(|device| VirtualPort {
                device,
                failing: false,
                refusing: false,
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(VirtualState {
                ports,
                ..Default::default()
            })),
        }
    }

    /// Plug in another device
    pub fn add_device(&self, device: InputDevice) {
        lock(&self.state).ports.push(VirtualPort {
            device,
            failing: false,
            refusing: false,
        });
    }

    /// Make capability queries and opens for `name` fail
    pub fn set_failing(&self, name: &str, failing: bool) {
        for port in lock(&self.state).ports.iter_mut() {
            if port.device.name == name {
                port.failing = failing;
            }
        }
    }

    /// Keep listing `name` as available but fail every open
    pub fn set_refusing(&self, name: &str, refusing: bool) {
        for port in lock(&self.state).ports.iter_mut() {
            if port.device.name == name {
                port.refusing = refusing;
            }
        }
    }

    /// Number of open bindings on `name`
    pub fn open_bindings(&self, name: &str) -> usize {
        lock(&self.state)
            .sinks
            .values()
            .filter(|(device, _)| device == name)
            .count()
    }

    /// Keyboard that plays into the device called `name`
    pub fn keyboard(&self, name: &str) -> VirtualKeyboard {
        VirtualKeyboard {
            state: self.state.clone(),
            device_name: name.to_string(),
        }
    }
}

impl Default for VirtualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiHost for VirtualHost {
    fn devices(&self) -> Result<Vec<InputDevice>> {
        let state = lock(&self.state);
        Ok(state
            .ports
            .iter()
            .map(|port| {
                if port.failing {
                    InputDevice::unavailable(&port.device.name, &port.device.description)
                } else {
                    port.device.clone()
                }
            })
            .collect())
    }

    fn open(&self, device: &InputDevice, sink: EventSink) -> Result<Box<dyn InputBinding>> {
        let mut state = lock(&self.state);

        let port = state
            .ports
            .iter()
            .find(|p| p.device.name == device.name)
            .ok_or_else(|| Error::DeviceNotFound(device.name.clone()))?;
        if port.failing || port.refusing {
            return Err(Error::DeviceUnavailable(format!(
                "{} refused to open",
                device.name
            )));
        }

        let id = state.next_binding;
        state.next_binding += 1;
        state.sinks.insert(id, (device.name.clone(), sink));
        debug!("Opened virtual input {} (binding {})", device.name, id);

        Ok(Box::new(VirtualBinding {
            state: self.state.clone(),
            id,
            device_name: device.name.clone(),
        }))
    }
}

struct VirtualBinding {
    state: Arc<Mutex<VirtualState>>,
    id: u64,
    device_name: String,
}

impl InputBinding for VirtualBinding {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn close(self: Box<Self>) {
        lock(&self.state).sinks.remove(&self.id);
        debug!("Closed virtual input {} (binding {})", self.device_name, self.id);
    }
}

/// Plays notes into every open binding of one virtual device
#[derive(Debug, Clone)]
pub struct VirtualKeyboard {
    state: Arc<Mutex<VirtualState>>,
    device_name: String,
}

impl VirtualKeyboard {
    /// Send raw MIDI bytes; returns how many bindings received them
    pub fn send(&self, data: &[u8]) -> usize {
        // Sinks are cloned out so delivery never runs under the host lock.
        let sinks: Vec<EventSink> = lock(&self.state)
            .sinks
            .values()
            .filter(|(device, _)| *device == self.device_name)
            .map(|(_, sink)| sink.clone())
            .collect();

        for sink in &sinks {
            sink.deliver(data);
        }
        sinks.len()
    }

    pub fn press(&self, pitch: u8, velocity: u8) -> usize {
        self.send(&RawEvent::note_on(pitch, velocity, 0).to_bytes())
    }

    pub fn release(&self, pitch: u8) -> usize {
        self.send(&RawEvent::note_off(pitch, 0).to_bytes())
    }
}
