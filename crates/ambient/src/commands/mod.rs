//! Command dispatch.

pub mod air_quality;
pub mod config_cmd;
pub mod devices;
pub mod events;
pub mod readings;
pub mod watch;

use ambient_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a backend-facing command to its handler.
pub async fn dispatch(cmd: Command, coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(coordinator, global).await,
        Command::Readings(args) => readings::handle(coordinator, &args, global).await,
        Command::AirQuality(args) => air_quality::handle(coordinator, &args, global).await,
        Command::Events(args) => events::handle(coordinator, &args, global).await,
        Command::Watch(_) => watch::handle(coordinator, global).await,
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
