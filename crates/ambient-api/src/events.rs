// Device events
//
// Discrete events (threshold crossings, status changes) recorded by the
// backend. Informational only; the poll cycle never reads them.

use tracing::debug;

use crate::client::AmbientClient;
use crate::error::Error;
use crate::models::DeviceEvent;

impl AmbientClient {
    /// Up to `limit` most recent events for a device, newest first.
    ///
    /// `GET /rest/v1/device_events?device_id=eq.{id}&order=timestamp.desc&limit={limit}`
    pub async fn get_recent_events(
        &self,
        device_id: &str,
        limit: u32,
    ) -> Result<Vec<DeviceEvent>, Error> {
        let url = self.rest_url("device_events")?;
        debug!(device_id, limit, "listing events");

        self.get_rows(
            url,
            &[
                ("select", "*".to_owned()),
                ("device_id", format!("eq.{device_id}")),
                ("order", "timestamp.desc".to_owned()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}
