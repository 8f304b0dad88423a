// PostgREST row types
//
// Rows come back as loosely-typed JSON. Every optional column is
// `#[serde(default)]`, and timestamps/integers go through lenient parsers so
// an unexpected shape becomes `None` instead of failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Device ───────────────────────────────────────────────────────────

/// An Ambient One device owned by the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub firmware_version: Option<String>,
    /// 0–100.
    pub battery_percentage: Option<u8>,
    /// dBm.
    pub wifi_rssi: Option<i32>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Resolved through the `locations` foreign relation.
    pub location_name: Option<String>,
    /// Resolved through the `spaces` foreign relation.
    pub space_name: Option<String>,
}

/// Raw row from `GET /rest/v1/devices` with embedded relations.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceRow {
    device_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    firmware_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    battery_percentage: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    wifi_rssi: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    locations: Option<NamedRelation>,
    #[serde(default)]
    spaces: Option<NamedRelation>,
}

#[derive(Debug, Deserialize)]
struct NamedRelation {
    #[serde(default)]
    name: Option<String>,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            name: row.name.unwrap_or_else(|| row.device_id.clone()),
            device_id: row.device_id,
            firmware_version: row.firmware_version,
            battery_percentage: row
                .battery_percentage
                .and_then(|b| u8::try_from(b).ok())
                .filter(|b| *b <= 100),
            wifi_rssi: row.wifi_rssi.and_then(|r| i32::try_from(r).ok()),
            last_seen: row.last_seen,
            location_name: row.locations.and_then(|l| l.name),
            space_name: row.spaces.and_then(|s| s.name),
        }
    }
}

// ── Sensor readings ──────────────────────────────────────────────────

/// One-minute aggregate from `sensor_averages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pm1_0: Option<f64>,
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm4_0: Option<f64>,
    #[serde(default)]
    pub pm10_0: Option<f64>,
    /// ppm.
    #[serde(default, deserialize_with = "lenient_int")]
    pub co2: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub voc_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub nox_index: Option<i64>,
    /// °C.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Relative humidity, %.
    #[serde(default)]
    pub humidity: Option<f64>,
    /// 0–10 indoor air quality score.
    #[serde(default)]
    pub iaq_score: Option<f64>,
    #[serde(default)]
    pub aqi_category: Option<String>,
    #[serde(default)]
    pub primary_pollutant: Option<String>,
}

/// Row from `sensor_realtime`: only the live IAQ score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeReading {
    pub device_id: String,
    #[serde(default)]
    pub iaq_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

// ── Events ───────────────────────────────────────────────────────────

/// A discrete event from `device_events`.
///
/// The table is informational and its columns vary; the common ones are
/// modelled, the rest land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Lenient field parsers ────────────────────────────────────────────

/// Accept RFC 3339, or a naive timestamp interpreted as UTC. Anything else
/// is treated as absent.
fn lenient_timestamp<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(value.as_str().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Accept JSON integers and integral floats (`412.0`). Anything else is
/// treated as absent.
#[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
fn lenient_int<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn device_row_resolves_relations() {
        let row: DeviceRow = serde_json::from_value(json!({
            "device_id": "amb-001",
            "name": "Bedroom",
            "firmware_version": "1.4.2",
            "battery_percentage": 87,
            "wifi_rssi": -61,
            "last_seen": "2025-03-01T12:00:00.123456+00:00",
            "locations": { "name": "Home" },
            "spaces": { "name": "Upstairs" }
        }))
        .unwrap();

        let device = Device::from(row);
        assert_eq!(device.device_id, "amb-001");
        assert_eq!(device.battery_percentage, Some(87));
        assert_eq!(device.wifi_rssi, Some(-61));
        assert_eq!(device.location_name.as_deref(), Some("Home"));
        assert_eq!(device.space_name.as_deref(), Some("Upstairs"));
        assert!(device.last_seen.is_some());
    }

    #[test]
    fn device_row_missing_optionals_become_none() {
        let row: DeviceRow = serde_json::from_value(json!({
            "device_id": "amb-002",
            "name": "Office",
            "battery_percentage": null,
            "locations": null,
            "last_seen": "not a date"
        }))
        .unwrap();

        let device = Device::from(row);
        assert_eq!(device.firmware_version, None);
        assert_eq!(device.battery_percentage, None);
        assert_eq!(device.location_name, None);
        assert_eq!(device.last_seen, None);
    }

    #[test]
    fn out_of_range_battery_is_dropped() {
        let row: DeviceRow = serde_json::from_value(json!({
            "device_id": "amb-003",
            "battery_percentage": 140
        }))
        .unwrap();
        let device = Device::from(row);
        assert_eq!(device.battery_percentage, None);
        assert_eq!(device.name, "amb-003");
    }

    #[test]
    fn reading_accepts_integral_floats() {
        let reading: SensorReading = serde_json::from_value(json!({
            "timestamp": "2025-03-01T12:00:00",
            "pm2_5": 4.2,
            "co2": 612.0,
            "voc_index": 101,
            "nox_index": "n/a",
            "aqi_category": "Good"
        }))
        .unwrap();

        assert_eq!(reading.co2, Some(612));
        assert_eq!(reading.voc_index, Some(101));
        assert_eq!(reading.nox_index, None);
        assert_eq!(reading.pm2_5, Some(4.2));
        assert_eq!(reading.humidity, None);
        assert_eq!(
            reading.timestamp.unwrap().to_rfc3339(),
            "2025-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn event_keeps_unknown_columns() {
        let event: DeviceEvent = serde_json::from_value(json!({
            "id": 42,
            "device_id": "amb-001",
            "event_type": "pm_spike",
            "timestamp": "2025-03-01T12:00:00Z",
            "value": 55.1
        }))
        .unwrap();

        assert_eq!(event.id, Some(42));
        assert_eq!(event.event_type.as_deref(), Some("pm_spike"));
        assert!(!event.extra.contains_key("id"));
        assert_eq!(event.extra.get("value"), Some(&json!(55.1)));
    }
}
