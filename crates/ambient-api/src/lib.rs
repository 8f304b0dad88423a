// ambient-api: Async Rust client for the Ambient One cloud API (Supabase auth + PostgREST)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod devices;
mod events;
mod readings;

pub use auth::{Credentials, REFRESH_MARGIN_SECS, Session, TokenManager};
pub use client::AmbientClient;
pub use error::Error;
pub use models::{Device, DeviceEvent, RealtimeReading, SensorReading};
pub use transport::TransportConfig;
