//! Poll coordination between `ambient-api` and snapshot consumers.
//!
//! - **[`Coordinator`]**: owns one [`AmbientClient`](ambient_api::AmbientClient),
//!   runs a single-flight refresh on a fixed interval, and publishes an
//!   immutable [`Snapshot`] per successful cycle. Failed cycles leave the
//!   previous snapshot in place and emit an [`UpdateEvent::Failed`].
//!
//! - **[`Snapshot`]**: ordered map of device id to [`DeviceState`]
//!   (device metadata plus the latest one-minute reading, if any).
//!
//! - **[`SnapshotStream`]**: subscription handle exposing `current()` /
//!   `latest()` / `changed()` over published snapshots.
//!
//! - **Consumers** ([`sensor`], [`air_quality`]): entity views that read
//!   only from the latest snapshot and never touch the network.

pub mod air_quality;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod sensor;
pub mod snapshot;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use air_quality::AirQualityEntity;
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorState, FailureReason, RefreshOutcome, UpdateEvent};
pub use error::CoreError;
pub use sensor::{DeviceInfo, SENSOR_DESCRIPTIONS, SensorDescription, SensorEntity, SensorValue};
pub use snapshot::{DeviceState, Snapshot};
pub use stream::SnapshotStream;

pub use ambient_api::{Credentials, Device, DeviceEvent, SensorReading};
