//! Configuration for the Ambient One poller.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `ambient_core::CoordinatorConfig`. The CLI layers
//! its global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ambient_core::{CoordinatorConfig, Credentials};

/// Keyring service name.
const KEYRING_SERVICE: &str = "ambient";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "AMBIENT_CONFIG";

/// Environment variable consulted for the password before the keyring.
pub const PASSWORD_ENV: &str = "AMBIENT_PASSWORD";

/// Environment variable supplying an e-mail when no profile is configured.
pub const EMAIL_ENV: &str = "AMBIENT_EMAIL";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    30
}

/// A named account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account e-mail.
    pub email: String,

    /// Password (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Backend base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Project API key override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override poll interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Name of the profile to use when none is requested.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$AMBIENT_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "ambient", "ambient").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ambient");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `AMBIENT_`-prefixed env vars.
///
/// Nested keys use a double underscore, e.g.
/// `AMBIENT_PROFILES__HOME__EMAIL`. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AMBIENT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick the requested (or default) profile.
///
/// With no matching profile, falls back to an ad-hoc profile when
/// `AMBIENT_EMAIL` is set.
pub fn select_profile(config: &Config, requested: Option<&str>) -> Result<(String, Profile), ConfigError> {
    select_profile_with(config, requested, |k| std::env::var(k).ok())
}

pub fn select_profile_with(
    config: &Config,
    requested: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(String, Profile), ConfigError> {
    let name = requested.unwrap_or_else(|| config.default_profile_name());

    if let Some(profile) = config.profiles.get(name) {
        return Ok((name.to_owned(), profile.clone()));
    }

    match env(EMAIL_ENV) {
        Some(email) if !email.is_empty() => Ok((
            name.to_owned(),
            Profile {
                email,
                ..Profile::default()
            },
        )),
        _ => Err(ConfigError::UnknownProfile {
            profile: name.to_owned(),
        }),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the account password.
///
/// Order: the variable named by `password_env`, `AMBIENT_PASSWORD`, the
/// system keyring, then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(profile, profile_name, |k| std::env::var(k).ok(), keyring_password)
}

pub fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Well-known env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, applying global defaults
/// where the profile is silent.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let password = resolve_password(profile, profile_name)?;
    build_coordinator_config(profile, defaults, password)
}

/// Same as [`profile_to_coordinator_config`] with the password already
/// resolved.
pub fn build_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
    password: SecretString,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.email.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "email".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut config = CoordinatorConfig::new(Credentials::new(profile.email.clone(), password));

    if let Some(ref raw) = profile.api_url {
        config.base_url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }
    if let Some(ref key) = profile.api_key {
        config.anon_key = SecretString::from(key.clone());
    }

    let timeout = profile.timeout_secs.unwrap_or(defaults.timeout_secs);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }
    config.request_timeout = Duration::from_secs(timeout);
    config.refresh_timeout = Duration::from_secs(timeout);
    config.poll_interval =
        Duration::from_secs(profile.poll_interval_secs.unwrap_or(defaults.poll_interval_secs));

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn no_keyring(_: &str) -> Option<String> {
        None
    }

    fn profile(email: &str) -> Profile {
        Profile {
            email: email.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
poll_interval_secs = 120

[profiles.home]
email = "me@example.com"
password_env = "HOME_PW"
timeout_secs = 10
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.default_profile_name(), "home");
        assert_eq!(config.defaults.poll_interval_secs, 120);
        assert_eq!(config.defaults.timeout_secs, 30);
        let home = &config.profiles["home"];
        assert_eq!(home.email, "me@example.com");
        assert_eq!(home.password_env.as_deref(), Some("HOME_PW"));
        assert_eq!(home.timeout_secs, Some(10));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), "default");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert("default".into(), profile("a@b.c"));
        save_config_to(&config, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("password"));
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].email, "a@b.c");
    }

    #[test]
    fn password_env_takes_precedence() {
        let mut p = profile("a@b.c");
        p.password_env = Some("MY_PW".into());
        p.password = Some("plain".into());

        let env = env_of(&[("MY_PW", "from-custom"), (PASSWORD_ENV, "from-well-known")]);
        let pw = resolve_password_with(&p, "default", env, |_| Some("from-keyring".into())).unwrap();
        assert_eq!(pw.expose_secret(), "from-custom");
    }

    #[test]
    fn keyring_beats_plaintext() {
        let mut p = profile("a@b.c");
        p.password = Some("plain".into());

        let pw = resolve_password_with(&p, "home", env_of(&[]), |name| {
            (name == "home").then(|| "from-keyring".to_owned())
        })
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");

        let pw = resolve_password_with(&p, "home", env_of(&[]), no_keyring).unwrap();
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn no_password_anywhere_is_an_error() {
        let err = resolve_password_with(&profile("a@b.c"), "home", env_of(&[]), no_keyring).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "home"));
    }

    #[test]
    fn unknown_profile_falls_back_to_email_env() {
        let config = Config::default();
        let (name, p) =
            select_profile_with(&config, None, env_of(&[(EMAIL_ENV, "env@example.com")])).unwrap();
        assert_eq!(name, "default");
        assert_eq!(p.email, "env@example.com");

        let err = select_profile_with(&config, Some("work"), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { profile } if profile == "work"));
    }

    #[test]
    fn coordinator_config_applies_overrides_and_defaults() {
        let mut p = profile("a@b.c");
        p.api_url = Some("http://localhost:54321".into());
        p.timeout_secs = Some(5);

        let defaults = Defaults::default();
        let cfg = build_coordinator_config(&p, &defaults, SecretString::from("pw")).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://localhost:54321/");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.refresh_timeout, Duration::from_secs(5));
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.credentials.email, "a@b.c");
    }

    #[test]
    fn invalid_url_and_zero_timeout_are_rejected() {
        let mut p = profile("a@b.c");
        p.api_url = Some("not a url".into());
        let err = build_coordinator_config(&p, &Defaults::default(), SecretString::from("pw")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));

        let mut p = profile("a@b.c");
        p.timeout_secs = Some(0);
        let err = build_coordinator_config(&p, &Defaults::default(), SecretString::from("pw")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "timeout_secs"));
    }
}
