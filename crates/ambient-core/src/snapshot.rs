// ── Published poll results ──
//
// A `Snapshot` is built off to the side during a refresh and published
// whole. Nothing mutates one after publication, so consumers can hold an
// `Arc<Snapshot>` across awaits without seeing a half-updated view.

use ambient_api::{Device, SensorReading};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// One device as seen in the last successful poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub device: Device,
    /// `None` when the device has no recent aggregate or its reading fetch
    /// failed during the cycle.
    pub reading: Option<SensorReading>,
}

/// Immutable result of one successful poll cycle.
///
/// Devices keep the order the backend listed them in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    version: u64,
    fetched_at: Option<DateTime<Utc>>,
    devices: IndexMap<String, DeviceState>,
}

impl Snapshot {
    pub(crate) fn new(version: u64, devices: IndexMap<String, DeviceState>) -> Self {
        Self {
            version,
            fetched_at: Some(Utc::now()),
            devices,
        }
    }

    /// Monotonic publication counter. `0` means nothing has been published yet.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the cycle that produced this snapshot finished.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// `true` before the first successful poll.
    pub fn is_initial(&self) -> bool {
        self.version == 0
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceState> {
        self.devices.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Latest reading for a device, if both are present.
    pub fn reading(&self, device_id: &str) -> Option<&SensorReading> {
        self.devices.get(device_id)?.reading.as_ref()
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceState> {
        self.devices.values()
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn device(id: &str, name: &str) -> Device {
        Device {
            device_id: id.into(),
            name: name.into(),
            firmware_version: Some("1.4.2".into()),
            battery_percentage: Some(80),
            wifi_rssi: Some(-60),
            last_seen: None,
            location_name: Some("Home".into()),
            space_name: None,
        }
    }

    pub(crate) fn snapshot(states: Vec<DeviceState>) -> Snapshot {
        let devices = states
            .into_iter()
            .map(|s| (s.device.device_id.clone(), s))
            .collect();
        Snapshot::new(1, devices)
    }
}
