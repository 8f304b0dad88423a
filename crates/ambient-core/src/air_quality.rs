// ── Aggregate air-quality entity ──
//
// One per device: a scaled index plus the headline pollutants, read from
// the latest snapshot.

use ambient_api::{Device, SensorReading};
use serde_json::{Map, Value, json};

use crate::sensor::{DeviceInfo, base_attributes};
use crate::stream::SnapshotStream;

pub const ATTRIBUTION: &str = "Data provided by Ambient Works";

/// Factor mapping the 0–10 IAQ score onto a 0–500 index.
const IAQ_TO_INDEX: f64 = 50.0;

#[derive(Clone)]
pub struct AirQualityEntity {
    snapshots: SnapshotStream,
    device_id: String,
    device_info: DeviceInfo,
}

impl AirQualityEntity {
    pub fn new(snapshots: SnapshotStream, device: &Device) -> Self {
        Self {
            snapshots,
            device_id: device.device_id.clone(),
            device_info: DeviceInfo::for_device(device),
        }
    }

    /// One entity per device in the latest snapshot.
    pub fn for_snapshot(snapshots: &SnapshotStream) -> Vec<Self> {
        snapshots
            .latest()
            .devices()
            .map(|state| Self::new(snapshots.clone(), &state.device))
            .collect()
    }

    pub fn unique_id(&self) -> String {
        format!("{}_air_quality", self.device_id)
    }

    pub fn name(&self) -> &'static str {
        "Air Quality"
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    pub fn available(&self) -> bool {
        self.snapshots.latest().contains(&self.device_id)
    }

    fn with_reading<T>(&self, f: impl FnOnce(&SensorReading) -> Option<T>) -> Option<T> {
        let snapshot = self.snapshots.latest();
        f(snapshot.reading(&self.device_id)?)
    }

    /// IAQ score scaled to 0–500, rounded to one decimal.
    pub fn air_quality_index(&self) -> Option<f64> {
        self.with_reading(|r| r.iaq_score)
            .map(|score| (score * IAQ_TO_INDEX * 10.0).round() / 10.0)
    }

    pub fn particulate_matter_2_5(&self) -> Option<f64> {
        self.with_reading(|r| r.pm2_5)
    }

    pub fn particulate_matter_10(&self) -> Option<f64> {
        self.with_reading(|r| r.pm10_0)
    }

    pub fn carbon_dioxide(&self) -> Option<i64> {
        self.with_reading(|r| r.co2)
    }

    /// Device identity plus every pollutant the latest reading carries.
    pub fn extra_attributes(&self) -> Map<String, Value> {
        let snapshot = self.snapshots.latest();
        let Some(state) = snapshot.get(&self.device_id) else {
            return Map::new();
        };

        let mut attrs = base_attributes(&state.device);
        let Some(r) = &state.reading else {
            return attrs;
        };

        let present = [
            ("pm1_0", r.pm1_0.map(|v| json!(v))),
            ("pm4_0", r.pm4_0.map(|v| json!(v))),
            ("voc_index", r.voc_index.map(|v| json!(v))),
            ("nox_index", r.nox_index.map(|v| json!(v))),
            ("temperature", r.temperature.map(|v| json!(v))),
            ("humidity", r.humidity.map(|v| json!(v))),
            ("iaq_score", r.iaq_score.map(|v| json!(v))),
            ("aqi_category", r.aqi_category.as_ref().map(|v| json!(v))),
            ("primary_pollutant", r.primary_pollutant.as_ref().map(|v| json!(v))),
        ];
        for (key, value) in present {
            if let Some(value) = value {
                attrs.insert(key.into(), value);
            }
        }
        attrs
    }
}
