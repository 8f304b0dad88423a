//! Device listing.

use ambient_core::{Coordinator, CoreError, Device};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "WiFi")]
    wifi: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.device_id.clone(),
            name: d.name.clone(),
            location: d
                .space_name
                .as_ref()
                .or(d.location_name.as_ref())
                .cloned()
                .unwrap_or_else(|| "-".into()),
            battery: d.battery_percentage.map_or_else(|| "-".into(), |b| format!("{b}%")),
            wifi: d.wifi_rssi.map_or_else(|| "-".into(), |r| format!("{r} dBm")),
            firmware: output::opt(d.firmware_version.as_deref()),
            last_seen: output::timestamp(d.last_seen),
        }
    }
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = coordinator
        .client()
        .list_devices()
        .await
        .map_err(CoreError::from)?;

    let out = output::render_list(&global.output, &devices, |d| DeviceRow::from(d), |d| {
        d.device_id.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
