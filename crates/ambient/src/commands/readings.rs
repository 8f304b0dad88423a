//! One poll cycle, rendered as one row per sensor.

use ambient_core::{Coordinator, SensorEntity};
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;

use crate::cli::{GlobalOpts, ReadingsArgs};
use crate::error::CliError;
use crate::output;

/// Serialized form of one sensor.
#[derive(Serialize)]
struct SensorOutput {
    unique_id: String,
    device_id: String,
    key: &'static str,
    name: String,
    value: Value,
    unit: Option<&'static str>,
    attributes: Map<String, Value>,
}

impl From<&SensorEntity> for SensorOutput {
    fn from(e: &SensorEntity) -> Self {
        Self {
            unique_id: e.unique_id(),
            device_id: e.device_id().to_owned(),
            key: e.description().key,
            name: e.name().to_owned(),
            value: e.native_value().as_ref().map_or(Value::Null, Value::from),
            unit: e.description().unit,
            attributes: e.extra_attributes(),
        }
    }
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Sensor")]
    sensor: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&SensorOutput> for SensorRow {
    fn from(s: &SensorOutput) -> Self {
        let value = match (&s.value, s.unit) {
            (Value::Null, _) => "-".to_owned(),
            (Value::String(text), _) => text.clone(),
            (v, Some(unit)) => format!("{v} {unit}"),
            (v, None) => v.to_string(),
        };
        Self {
            device: s.device_id.clone(),
            sensor: s.name.clone(),
            value,
        }
    }
}

pub async fn handle(coordinator: &Coordinator, args: &ReadingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    coordinator.setup().await?;

    let sensors: Vec<SensorOutput> = SensorEntity::for_snapshot(&coordinator.subscribe())
        .iter()
        .filter(|e| args.all || e.description().enabled_by_default)
        .filter(|e| args.device.as_deref().is_none_or(|id| e.device_id() == id))
        .map(SensorOutput::from)
        .collect();

    let out = output::render_list(&global.output, &sensors, |s| SensorRow::from(s), |s| {
        format!("{}\t{}", s.unique_id, s.value)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
