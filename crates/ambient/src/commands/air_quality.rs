//! One poll cycle, rendered as the per-device air-quality summary.

use ambient_core::{AirQualityEntity, Coordinator, CoreError};
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;

use crate::cli::{AirQualityArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct AirQualityOutput {
    unique_id: String,
    device_id: String,
    device_name: String,
    air_quality_index: Option<f64>,
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    co2: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    live_iaq: Option<f64>,
    attribution: &'static str,
    attributes: Map<String, Value>,
}

impl From<&AirQualityEntity> for AirQualityOutput {
    fn from(e: &AirQualityEntity) -> Self {
        Self {
            unique_id: e.unique_id(),
            device_id: e.device_id().to_owned(),
            device_name: e.device_info().name.clone(),
            air_quality_index: e.air_quality_index(),
            pm2_5: e.particulate_matter_2_5(),
            pm10: e.particulate_matter_10(),
            co2: e.carbon_dioxide(),
            live_iaq: None,
            attribution: e.attribution(),
            attributes: e.extra_attributes(),
        }
    }
}

#[derive(Tabled)]
struct AirQualityRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "AQI")]
    aqi: String,
    #[tabled(rename = "PM2.5")]
    pm2_5: String,
    #[tabled(rename = "PM10")]
    pm10: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Live IAQ")]
    live_iaq: String,
}

impl From<&AirQualityOutput> for AirQualityRow {
    fn from(a: &AirQualityOutput) -> Self {
        Self {
            device: a.device_name.clone(),
            aqi: output::opt(a.air_quality_index),
            pm2_5: output::opt(a.pm2_5),
            pm10: output::opt(a.pm10),
            co2: output::opt(a.co2),
            category: a
                .attributes
                .get("aqi_category")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_owned(),
            live_iaq: output::opt(a.live_iaq),
        }
    }
}

pub async fn handle(coordinator: &Coordinator, args: &AirQualityArgs, global: &GlobalOpts) -> Result<(), CliError> {
    coordinator.setup().await?;

    let mut rows: Vec<AirQualityOutput> = AirQualityEntity::for_snapshot(&coordinator.subscribe())
        .iter()
        .map(AirQualityOutput::from)
        .collect();

    if args.realtime {
        for row in &mut rows {
            let live = coordinator
                .client()
                .get_realtime_iaq(&row.device_id)
                .await
                .map_err(CoreError::from)?;
            row.live_iaq = live.and_then(|r| r.iaq_score);
        }
    }

    let out = output::render_list(&global.output, &rows, |a| AirQualityRow::from(a), |a| {
        format!("{}\t{}", a.device_id, output::opt(a.air_quality_index))
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
