//! CLI-side configuration: layers global flags over the shared
//! `ambient-config` profile resolution.

use ambient_config::{Config, Profile};
use ambient_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use ambient_config::{config_path, load_config, save_config, store_password};

/// The resolved profile a command runs against.
pub struct ActiveProfile {
    pub name: String,
    pub profile: Profile,
    pub config: Config,
}

/// Load the config file and select the profile named by `--profile`
/// (or the file's default).
pub fn active_profile(global: &GlobalOpts) -> Result<ActiveProfile, CliError> {
    let config = load_config()?;
    let (name, profile) = ambient_config::select_profile(&config, global.profile.as_deref())?;
    Ok(ActiveProfile {
        name,
        profile,
        config,
    })
}

/// Build a `CoordinatorConfig` from the active profile plus CLI overrides.
pub fn coordinator_config(global: &GlobalOpts) -> Result<(String, CoordinatorConfig), CliError> {
    let ActiveProfile {
        name,
        mut profile,
        config,
    } = active_profile(global)?;

    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout_secs = Some(timeout);
    }

    let cfg = ambient_config::profile_to_coordinator_config(&profile, &name, &config.defaults)?;
    tracing::debug!(profile = %name, base_url = %cfg.base_url, "resolved configuration");
    Ok((name, cfg))
}
