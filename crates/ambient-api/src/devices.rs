// Device listing
//
// `GET /rest/v1/devices`, scoped to the authenticated user and ordered so
// the most recently active devices come first.

use tracing::debug;

use crate::client::AmbientClient;
use crate::error::Error;
use crate::models::{Device, DeviceRow};

/// Columns requested from `devices`, including the two embedded relations.
const DEVICE_COLUMNS: &str = "device_id,name,last_seen,firmware_version,space_id,location_id,\
battery_percentage,wifi_rssi,organization_id,user_id,\
spaces!devices_space_id_fkey(name),locations!devices_location_id_fkey(name)";

impl AmbientClient {
    /// List all devices owned by the authenticated user.
    ///
    /// `GET /rest/v1/devices?user_id=eq.{id}&order=last_seen.desc.nullslast`
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        let session = self.tokens().ensure_valid().await?;
        let url = self.rest_url("devices")?;

        let rows: Vec<DeviceRow> = self
            .get_rows(
                url,
                &[
                    ("select", DEVICE_COLUMNS.to_owned()),
                    ("user_id", format!("eq.{}", session.user_id())),
                    ("order", "last_seen.desc.nullslast".to_owned()),
                ],
            )
            .await?;

        debug!(count = rows.len(), "listed devices");
        Ok(rows.into_iter().map(Device::from).collect())
    }
}
