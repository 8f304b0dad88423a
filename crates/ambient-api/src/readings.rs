// Sensor reading endpoints
//
// `sensor_averages` holds the one-minute aggregates used by the poller;
// `sensor_realtime` only carries the live IAQ score.

use tracing::debug;

use crate::client::AmbientClient;
use crate::error::Error;
use crate::models::{RealtimeReading, SensorReading};

impl AmbientClient {
    /// Latest one-minute aggregate for a device, or `None` if the device
    /// has not reported yet.
    ///
    /// `GET /rest/v1/sensor_averages?device_id=eq.{id}&aggregation_type=eq.minute&order=timestamp.desc&limit=1`
    pub async fn get_latest_reading(&self, device_id: &str) -> Result<Option<SensorReading>, Error> {
        let url = self.rest_url("sensor_averages")?;
        debug!(device_id, "fetching latest reading");

        let rows: Vec<SensorReading> = self
            .get_rows(
                url,
                &[
                    ("select", "*".to_owned()),
                    ("device_id", format!("eq.{device_id}")),
                    ("aggregation_type", "eq.minute".to_owned()),
                    ("order", "timestamp.desc".to_owned()),
                    ("limit", "1".to_owned()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    /// Live IAQ score for a device, or `None` if there is no realtime row.
    ///
    /// `GET /rest/v1/sensor_realtime?device_id=eq.{id}`
    pub async fn get_realtime_iaq(&self, device_id: &str) -> Result<Option<RealtimeReading>, Error> {
        let url = self.rest_url("sensor_realtime")?;
        debug!(device_id, "fetching realtime IAQ");

        let rows: Vec<RealtimeReading> = self
            .get_rows(
                url,
                &[
                    ("select", "device_id,iaq_score,timestamp".to_owned()),
                    ("device_id", format!("eq.{device_id}")),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }
}
