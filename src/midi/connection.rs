// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Device selection and connection management.
//!
//! A name hint is resolved against the host's device list by an ordered
//! chain of match strategies; the first strategy whose candidate opens
//! successfully wins. Connections are keyed by hint, so reconnecting
//! under the same hint replaces the earlier binding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use super::{EventSink, InputBinding, InputDevice, MidiHost};
use crate::error::{Error, Result};

/// Picks a candidate device for a hint, or `None` for no match
pub type MatchStrategy = fn(&[InputDevice], &str) -> Option<InputDevice>;

/// Exact, case-sensitive name match
fn exact_name(devices: &[InputDevice], hint: &str) -> Option<InputDevice> {
    devices
        .iter()
        .find(|d| d.is_usable_input() && d.name == hint)
        .cloned()
}

/// Substring match in either direction against name or description
fn substring(devices: &[InputDevice], hint: &str) -> Option<InputDevice> {
    if hint.is_empty() {
        return None;
    }

    devices
        .iter()
        .filter(|d| d.is_usable_input())
        .find(|d| {
            d.name.contains(hint)
                || hint.contains(d.name.as_str())
                || (!d.description.is_empty()
                    && (d.description.contains(hint) || hint.contains(d.description.as_str())))
        })
        .cloned()
}

/// First transmit-capable device that is not a software pseudo-device
fn first_physical(devices: &[InputDevice], _hint: &str) -> Option<InputDevice> {
    devices
        .iter()
        .find(|d| d.is_usable_input() && !d.is_pseudo())
        .cloned()
}

const STRATEGIES: [(&str, MatchStrategy); 3] = [
    ("exact name", exact_name),
    ("substring", substring),
    ("first available", first_physical),
];

/// Resolve `hint` without opening anything.
///
/// Returns the winning strategy's label alongside the device.
pub fn select_device(devices: &[InputDevice], hint: &str) -> Option<(&'static str, InputDevice)> {
    STRATEGIES
        .iter()
        .find_map(|(label, strategy)| strategy(devices, hint).map(|d| (*label, d)))
}

/// Identifies one open connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandle {
    pub id: u64,
    /// Hint the connection was requested under
    pub hint: String,
    pub device: InputDevice,
}

struct OpenConnection {
    handle: ConnectionHandle,
    binding: Box<dyn InputBinding>,
}

/// Owns open device bindings and routes them all into one sink
pub struct DeviceManager {
    host: Arc<dyn MidiHost>,
    sink: EventSink,
    connections: Mutex<HashMap<String, OpenConnection>>,
    next_id: AtomicU64,
}

impl DeviceManager {
    pub fn new(host: Arc<dyn MidiHost>, sink: EventSink) -> Self {
        Self {
            host,
            sink,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // One lock serializes every connect and disconnect, which also
    // serializes them per device name.
    fn connections(&self) -> MutexGuard<'_, HashMap<String, OpenConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enumerate host devices, fresh on every call
    pub fn list_devices(&self) -> Result<Vec<InputDevice>> {
        let devices = self.host.devices()?;
        info!("Found {} MIDI devices", devices.len());
        Ok(devices)
    }

    /// Bind to the device best matching `hint`.
    ///
    /// Strategies run in order: exact name, substring, first physical
    /// input. A candidate that fails to open hands over to the next
    /// strategy. Any previous connection under the same hint is closed
    /// only once the new one is open.
    pub fn connect(&self, hint: &str) -> Result<ConnectionHandle> {
        let mut connections = self.connections();
        let devices = self.host.devices()?;

        let mut last_error = None;
        let mut tried: Vec<String> = Vec::new();

        for (label, strategy) in STRATEGIES.iter() {
            let Some(device) = strategy(&devices, hint) else {
                continue;
            };
            if tried.contains(&device.name) {
                continue;
            }
            tried.push(device.name.clone());

            match self.host.open(&device, self.sink.clone()) {
                Ok(binding) => {
                    let handle = ConnectionHandle {
                        id: self.next_id.fetch_add(1, Ordering::Relaxed),
                        hint: hint.to_string(),
                        device,
                    };
                    info!(
                        "Connected to MIDI device '{}' for '{}' ({} match)",
                        handle.device.name, hint, label
                    );

                    let replaced = connections.insert(
                        hint.to_string(),
                        OpenConnection {
                            handle: handle.clone(),
                            binding,
                        },
                    );
                    if let Some(previous) = replaced {
                        info!(
                            "Closed previous connection to '{}' for '{}'",
                            previous.binding.device_name(),
                            hint
                        );
                        previous.binding.close();
                    }

                    return Ok(handle);
                }
                Err(e) => {
                    warn!(
                        "Failed to open '{}' ({} match): {}",
                        device.name, label, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::DeviceNotFound(hint.to_string())))
    }

    /// Close one connection; unknown or already closed handles are a no-op
    pub fn disconnect(&self, handle: &ConnectionHandle) {
        let mut connections = self.connections();
        let matches = connections
            .get(&handle.hint)
            .map(|open| open.handle.id == handle.id)
            .unwrap_or(false);

        if matches {
            if let Some(open) = connections.remove(&handle.hint) {
                open.binding.close();
                info!("Disconnected from MIDI device '{}'", handle.device.name);
            }
        }
    }

    /// Close every connection
    pub fn disconnect_all(&self) {
        let mut connections = self.connections();
        for (hint, open) in connections.drain() {
            open.binding.close();
            info!("Disconnected from MIDI device '{}' ({})", open.handle.device.name, hint);
        }
    }

    /// Snapshot of live connections
    pub fn connected(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self
            .connections()
            .values()
            .map(|open| open.handle.clone())
            .collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    pub fn is_connected(&self) -> bool {
        !self.connections().is_empty()
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::VirtualHost;
    use crate::timing::ManualClock;

    fn devices() -> Vec<InputDevice> {
        vec![
            InputDevice::source("Real Time Sequencer", "Software sequencer"),
            InputDevice::destination("Gervill", "Software MIDI Synthesizer"),
            InputDevice::source("Arturia KeyStep 37", "USB MIDI Interface"),
            InputDevice::source("Launchkey Mini MK3", "Novation USB"),
        ]
    }

    fn manager(host: &VirtualHost) -> DeviceManager {
        let sink = EventSink::new(Arc::new(ManualClock::new(0)), |_| {});
        DeviceManager::new(Arc::new(host.clone()), sink)
    }

    #[test]
    fn test_select_exact_name() {
        let (label, device) = select_device(&devices(), "Launchkey Mini MK3").unwrap();
        assert_eq!(label, "exact name");
        assert_eq!(device.name, "Launchkey Mini MK3");
    }

    #[test]
    fn test_select_substring_either_direction() {
        let (label, device) = select_device(&devices(), "KeyStep").unwrap();
        assert_eq!(label, "substring");
        assert_eq!(device.name, "Arturia KeyStep 37");

        let (_, device) = select_device(&devices(), "Launchkey Mini MK3 MIDI 1").unwrap();
        assert_eq!(device.name, "Launchkey Mini MK3");

        let (_, device) = select_device(&devices(), "Novation").unwrap();
        assert_eq!(device.name, "Launchkey Mini MK3");
    }

    #[test]
    fn test_select_falls_back_to_first_physical() {
        let (label, device) = select_device(&devices(), "Nonexistent").unwrap();
        assert_eq!(label, "first available");
        assert_eq!(device.name, "Arturia KeyStep 37");
    }

    #[test]
    fn test_select_nothing_usable() {
        let only_pseudo = vec![
            InputDevice::source("Real Time Sequencer", ""),
            InputDevice::destination("Output Only", ""),
        ];
        assert!(select_device(&only_pseudo, "Output Only").is_none());
        assert!(select_device(&[], "").is_none());
    }

    #[test]
    fn test_select_exact_is_case_sensitive() {
        let (label, _) = select_device(&devices(), "arturia keystep 37").unwrap();
        assert_eq!(label, "first available");
    }

    #[test]
    fn test_list_devices_enumerates_fresh() {
        let host = VirtualHost::with_devices(devices());
        let manager = manager(&host);
        assert_eq!(manager.list_devices().unwrap().len(), 4);

        host.add_device(InputDevice::source("Keystation 49", "M-Audio"));
        let listed = manager.list_devices().unwrap();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed[4].name, "Keystation 49");
    }

    #[test]
    fn test_connect_and_disconnect() {
        let host = VirtualHost::with_devices(devices());
        let manager = manager(&host);

        let handle = manager.connect("KeyStep").unwrap();
        assert_eq!(handle.device.name, "Arturia KeyStep 37");
        assert!(manager.is_connected());
        assert_eq!(host.open_bindings("Arturia KeyStep 37"), 1);

        manager.disconnect(&handle);
        assert!(!manager.is_connected());
        assert_eq!(host.open_bindings("Arturia KeyStep 37"), 0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let host = VirtualHost::with_devices(devices());
        let manager = manager(&host);
        let handle = manager.connect("KeyStep").unwrap();

        manager.disconnect(&handle);
        let after_once = manager.connected();
        manager.disconnect(&handle);
        assert_eq!(manager.connected(), after_once);

        manager.disconnect_all();
        manager.disconnect_all();
        assert!(manager.connected().is_empty());
    }

    #[test]
    fn test_reconnect_same_hint_replaces_binding() {
        let host = VirtualHost::with_devices(devices());
        let manager = manager(&host);

        let first = manager.connect("KeyStep").unwrap();
        let second = manager.connect("KeyStep").unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(host.open_bindings("Arturia KeyStep 37"), 1);
        assert_eq!(manager.connected(), vec![second.clone()]);

        // Stale handle must not close the replacement
        manager.disconnect(&first);
        assert_eq!(manager.connected(), vec![second]);
    }

    #[test]
    fn test_connect_not_found() {
        let host = VirtualHost::with_devices(vec![InputDevice::destination("Speaker", "")]);
        let manager = manager(&host);
        assert!(matches!(manager.connect("Piano"), Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn test_failed_open_falls_through_to_next_strategy() {
        let host = VirtualHost::with_devices(devices());
        let manager = manager(&host);

        // Listed as available, but refuses to open
        host.set_refusing("Launchkey Mini MK3", true);
        let handle = manager.connect("Launchkey Mini MK3").unwrap();
        assert_eq!(handle.device.name, "Arturia KeyStep 37");
        assert_eq!(host.open_bindings("Launchkey Mini MK3"), 0);
    }

    #[test]
    fn test_open_failure_surfaces_when_chain_exhausted() {
        let host = VirtualHost::with_devices(vec![InputDevice::source("Piano", "")]);
        host.set_refusing("Piano", true);
        let manager = manager(&host);

        assert!(matches!(
            manager.connect("Piano"),
            Err(Error::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_failed_connect_keeps_previous_binding() {
        let host = VirtualHost::with_devices(vec![InputDevice::source("Piano", "")]);
        let manager = manager(&host);
        let handle = manager.connect("Piano").unwrap();

        host.set_failing("Piano", true);
        assert!(manager.connect("Piano").is_err());
        assert_eq!(manager.connected(), vec![handle]);
        assert_eq!(host.open_bindings("Piano"), 1);
    }

    #[test]
    fn test_concurrent_connect_and_disconnect_all() {
        let host = VirtualHost::with_devices(devices());
        let manager = Arc::new(manager(&host));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        let _ = manager.connect("KeyStep");
                    } else {
                        manager.disconnect_all();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // Whatever interleaving happened, bindings and handles agree
        assert_eq!(
            host.open_bindings("Arturia KeyStep 37"),
            manager.connected().len()
        );
        assert!(manager.connected().len() <= 1);
    }
}
