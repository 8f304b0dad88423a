// ── Per-metric sensor entities ──
//
// One `SensorEntity` per (device, description) pair. Entities read only
// from the latest published snapshot; they never trigger a fetch.

use std::fmt;

use ambient_api::{Device, SensorReading};
use serde::Serialize;
use serde_json::{Map, Value, json};
use strum::{AsRefStr, Display};

use crate::snapshot::DeviceState;
use crate::stream::SnapshotStream;

pub const DOMAIN: &str = "ambient_one";
pub const MANUFACTURER: &str = "Ambient Works";
pub const MODEL: &str = "Ambient One";

// ── Value and classification types ───────────────────────────────

/// A sensor's current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&SensorValue> for Value {
    fn from(value: &SensorValue) -> Self {
        match value {
            SensorValue::Float(v) => json!(v),
            SensorValue::Int(v) => json!(v),
            SensorValue::Text(v) => json!(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Pm1,
    Pm25,
    Pm10,
    Co2,
    Temperature,
    Humidity,
    Battery,
    SignalStrength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
}

// ── Description table ────────────────────────────────────────────

/// Static metadata and extraction function for one metric.
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub icon: Option<&'static str>,
    pub enabled_by_default: bool,
    /// Pollutant sensors carry AQI context in their attributes.
    pub pollutant: bool,
    pub value: fn(&DeviceState) -> Option<SensorValue>,
}

impl fmt::Debug for SensorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDescription")
            .field("key", &self.key)
            .field("unit", &self.unit)
            .field("device_class", &self.device_class)
            .finish_non_exhaustive()
    }
}

impl SensorDescription {
    /// Extract this metric from a device's state.
    pub fn extract(&self, state: &DeviceState) -> Option<SensorValue> {
        (self.value)(state)
    }
}

const MICROGRAMS_PER_CUBIC_METER: &str = "µg/m³";

fn reading(state: &DeviceState) -> Option<&SensorReading> {
    state.reading.as_ref()
}

pub static SENSOR_DESCRIPTIONS: &[SensorDescription] = &[
    SensorDescription {
        key: "pm2_5",
        name: "PM2.5",
        unit: Some(MICROGRAMS_PER_CUBIC_METER),
        device_class: Some(DeviceClass::Pm25),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.pm2_5.map(SensorValue::Float),
    },
    SensorDescription {
        key: "pm1_0",
        name: "PM1.0",
        unit: Some(MICROGRAMS_PER_CUBIC_METER),
        device_class: Some(DeviceClass::Pm1),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.pm1_0.map(SensorValue::Float),
    },
    SensorDescription {
        key: "pm4_0",
        name: "PM4.0",
        unit: Some(MICROGRAMS_PER_CUBIC_METER),
        device_class: None,
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.pm4_0.map(SensorValue::Float),
    },
    SensorDescription {
        key: "pm10_0",
        name: "PM10",
        unit: Some(MICROGRAMS_PER_CUBIC_METER),
        device_class: Some(DeviceClass::Pm10),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.pm10_0.map(SensorValue::Float),
    },
    SensorDescription {
        key: "co2",
        name: "CO2",
        unit: Some("ppm"),
        device_class: Some(DeviceClass::Co2),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.co2.map(SensorValue::Int),
    },
    SensorDescription {
        key: "voc_index",
        name: "VOC Index",
        unit: None,
        device_class: None,
        state_class: Some(StateClass::Measurement),
        icon: Some("mdi:chemical-weapon"),
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.voc_index.map(SensorValue::Int),
    },
    SensorDescription {
        key: "nox_index",
        name: "NOx Index",
        unit: None,
        device_class: None,
        state_class: Some(StateClass::Measurement),
        icon: Some("mdi:smog"),
        enabled_by_default: true,
        pollutant: true,
        value: |s| reading(s)?.nox_index.map(SensorValue::Int),
    },
    SensorDescription {
        key: "temperature",
        name: "Temperature",
        unit: Some("°C"),
        device_class: Some(DeviceClass::Temperature),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: false,
        value: |s| reading(s)?.temperature.map(SensorValue::Float),
    },
    SensorDescription {
        key: "humidity",
        name: "Humidity",
        unit: Some("%"),
        device_class: Some(DeviceClass::Humidity),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: false,
        value: |s| reading(s)?.humidity.map(SensorValue::Float),
    },
    SensorDescription {
        key: "iaq_score",
        name: "Indoor Air Quality Score",
        unit: None,
        device_class: None,
        state_class: Some(StateClass::Measurement),
        icon: Some("mdi:air-filter"),
        enabled_by_default: true,
        pollutant: false,
        value: |s| reading(s)?.iaq_score.map(SensorValue::Float),
    },
    SensorDescription {
        key: "aqi_category",
        name: "Air Quality Category",
        unit: None,
        device_class: None,
        state_class: None,
        icon: Some("mdi:information-outline"),
        enabled_by_default: true,
        pollutant: false,
        value: |s| reading(s)?.aqi_category.clone().map(SensorValue::Text),
    },
    SensorDescription {
        key: "battery",
        name: "Battery",
        unit: Some("%"),
        device_class: Some(DeviceClass::Battery),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: true,
        pollutant: false,
        value: |s| s.device.battery_percentage.map(|b| SensorValue::Int(i64::from(b))),
    },
    SensorDescription {
        key: "wifi_signal",
        name: "WiFi Signal",
        unit: Some("dBm"),
        device_class: Some(DeviceClass::SignalStrength),
        state_class: Some(StateClass::Measurement),
        icon: None,
        enabled_by_default: false,
        pollutant: false,
        value: |s| s.device.wifi_rssi.map(|r| SensorValue::Int(i64::from(r))),
    },
];

/// Look up a description by key.
pub fn description(key: &str) -> Option<&'static SensorDescription> {
    SENSOR_DESCRIPTIONS.iter().find(|d| d.key == key)
}

// ── Device registry info ─────────────────────────────────────────

/// Grouping metadata shared by every entity of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: (&'static str, String),
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    pub fn for_device(device: &Device) -> Self {
        Self {
            identifiers: (DOMAIN, device.device_id.clone()),
            name: device.name.clone(),
            manufacturer: MANUFACTURER,
            model: MODEL,
            sw_version: device.firmware_version.clone(),
        }
    }
}

/// Attributes every entity of a device carries.
pub(crate) fn base_attributes(device: &Device) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("device_id".into(), json!(device.device_id));
    attrs.insert("firmware_version".into(), json!(device.firmware_version));
    if let Some(location) = &device.location_name {
        attrs.insert("location".into(), json!(location));
    }
    attrs
}

// ── SensorEntity ─────────────────────────────────────────────────

/// One metric of one device.
#[derive(Clone)]
pub struct SensorEntity {
    snapshots: SnapshotStream,
    device_id: String,
    name: String,
    device_info: DeviceInfo,
    description: &'static SensorDescription,
}

impl SensorEntity {
    pub fn new(snapshots: SnapshotStream, device: &Device, description: &'static SensorDescription) -> Self {
        Self {
            snapshots,
            device_id: device.device_id.clone(),
            name: format!("{} {}", device.name, description.name),
            device_info: DeviceInfo::for_device(device),
            description,
        }
    }

    /// One entity per (device, description) for every device in the latest
    /// snapshot.
    pub fn for_snapshot(snapshots: &SnapshotStream) -> Vec<Self> {
        let snapshot = snapshots.latest();
        snapshot
            .devices()
            .flat_map(|state| {
                SENSOR_DESCRIPTIONS
                    .iter()
                    .map(|d| Self::new(snapshots.clone(), &state.device, d))
            })
            .collect()
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.device_id, self.description.key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// `false` once the device has dropped out of the latest snapshot.
    pub fn available(&self) -> bool {
        self.snapshots.latest().contains(&self.device_id)
    }

    pub fn native_value(&self) -> Option<SensorValue> {
        let snapshot = self.snapshots.latest();
        self.description.extract(snapshot.get(&self.device_id)?)
    }

    pub fn extra_attributes(&self) -> Map<String, Value> {
        let snapshot = self.snapshots.latest();
        let Some(state) = snapshot.get(&self.device_id) else {
            return Map::new();
        };

        let mut attrs = base_attributes(&state.device);
        attrs.insert(
            "last_seen".into(),
            json!(state.device.last_seen.map(|t| t.to_rfc3339())),
        );

        if self.description.pollutant {
            if let Some(reading) = &state.reading {
                if let Some(category) = &reading.aqi_category {
                    attrs.insert("aqi_category".into(), json!(category));
                }
                if let Some(pollutant) = &reading.primary_pollutant {
                    attrs.insert("primary_pollutant".into(), json!(pollutant));
                }
            }
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tokio::sync::watch;

    use super::*;
    use crate::snapshot::Snapshot;
    use crate::snapshot::fixtures::{device, snapshot};

    fn stream_of(snap: Snapshot) -> (watch::Sender<Arc<Snapshot>>, SnapshotStream) {
        let (tx, rx) = watch::channel(Arc::new(snap));
        (tx, SnapshotStream::new(rx))
    }

    fn bedroom_with_reading() -> DeviceState {
        DeviceState {
            device: device("amb-1", "Bedroom"),
            reading: Some(SensorReading {
                pm2_5: Some(4.5),
                co2: Some(612),
                aqi_category: Some("Good".into()),
                primary_pollutant: Some("pm2_5".into()),
                ..SensorReading::default()
            }),
        }
    }

    #[test]
    fn table_has_unique_keys() {
        let mut keys: Vec<_> = SENSOR_DESCRIPTIONS.iter().map(|d| d.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), SENSOR_DESCRIPTIONS.len());
        assert_eq!(SENSOR_DESCRIPTIONS.len(), 13);
    }

    #[test]
    fn wifi_signal_is_disabled_by_default() {
        let wifi = description("wifi_signal").map(|d| d.enabled_by_default);
        assert_eq!(wifi, Some(false));
        assert_eq!(DeviceClass::SignalStrength.as_ref(), "signal_strength");
    }

    #[test]
    fn entities_cover_every_device_and_metric() {
        let (_tx, stream) = stream_of(snapshot(vec![
            bedroom_with_reading(),
            DeviceState { device: device("amb-2", "Office"), reading: None },
        ]));
        let entities = SensorEntity::for_snapshot(&stream);
        assert_eq!(entities.len(), 2 * SENSOR_DESCRIPTIONS.len());
        assert_eq!(entities[0].unique_id(), "amb-1_pm2_5");
        assert_eq!(entities[0].name(), "Bedroom PM2.5");
        assert_eq!(entities[0].device_info().manufacturer, MANUFACTURER);
    }

    #[test]
    fn native_value_reads_reading_and_device_fields() {
        let (_tx, stream) = stream_of(snapshot(vec![bedroom_with_reading()]));
        let state = bedroom_with_reading();

        let pm = SensorEntity::new(stream.clone(), &state.device, &SENSOR_DESCRIPTIONS[0]);
        assert_eq!(pm.native_value(), Some(SensorValue::Float(4.5)));

        let battery = description("battery").map(|d| SensorEntity::new(stream, &state.device, d));
        assert_eq!(
            battery.and_then(|e| e.native_value()),
            Some(SensorValue::Int(80))
        );
    }

    #[test]
    fn missing_reading_yields_none_for_reading_metrics() {
        let office = DeviceState { device: device("amb-2", "Office"), reading: None };
        let (_tx, stream) = stream_of(snapshot(vec![office.clone()]));
        let humidity = description("humidity").map(|d| SensorEntity::new(stream, &office.device, d));
        assert_eq!(humidity.and_then(|e| e.native_value()), None);
    }

    #[test]
    fn pollutant_attributes_carry_aqi_context() {
        let state = bedroom_with_reading();
        let (_tx, stream) = stream_of(snapshot(vec![state.clone()]));

        let co2 = description("co2").map(|d| SensorEntity::new(stream.clone(), &state.device, d));
        let attrs = co2.map(|e| e.extra_attributes()).unwrap_or_default();
        assert_eq!(attrs.get("aqi_category"), Some(&json!("Good")));
        assert_eq!(attrs.get("location"), Some(&json!("Home")));

        let temp = description("temperature").map(|d| SensorEntity::new(stream, &state.device, d));
        let attrs = temp.map(|e| e.extra_attributes()).unwrap_or_default();
        assert!(!attrs.contains_key("aqi_category"));
    }

    #[test]
    fn entity_becomes_unavailable_when_device_disappears() {
        let state = bedroom_with_reading();
        let (tx, stream) = stream_of(snapshot(vec![state.clone()]));
        let entity = SensorEntity::new(stream, &state.device, &SENSOR_DESCRIPTIONS[0]);
        assert!(entity.available());

        tx.send_replace(Arc::new(snapshot(Vec::new())));
        assert!(!entity.available());
        assert_eq!(entity.native_value(), None);
        assert!(entity.extra_attributes().is_empty());
    }
}
