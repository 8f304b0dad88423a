//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ambient_config::ConfigError;
use ambient_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Ambient backend: {message}")]
    #[diagnostic(
        code(ambient::connection_failed),
        help(
            "Check your network connection and the configured api_url.\n\
             Retry with -vv for request-level logging."
        )
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed for profile '{profile}'")]
    #[diagnostic(
        code(ambient::auth_failed),
        help(
            "Verify the e-mail and password for this account.\n\
             Run: ambient config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(ambient::no_credentials),
        help(
            "Store one with: ambient config set-password --profile {profile}\n\
             Or set the AMBIENT_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ambient::profile_not_found),
        help(
            "Config file: {path}\n\
             Create a profile with: ambient config init\n\
             Or set AMBIENT_EMAIL and AMBIENT_PASSWORD."
        )
    )]
    ProfileNotFound { name: String, path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ambient::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(ambient::config))]
    Config(Box<ConfigError>),

    // ── Runtime ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(ambient::timeout),
        help("Increase timeout with --timeout or retry later.")
    )]
    Timeout { seconds: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ProfileNotFound { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to an auth failure.
    pub fn with_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile.to_owned(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::UpdateFailed { message } | CoreError::SetupNotReady { message } => {
                CliError::ConnectionFailed { message }
            }
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                path: ambient_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "invalid_grant".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let down = CliError::from(CoreError::SetupNotReady {
            message: "HTTP 503".into(),
        });
        assert_eq!(down.exit_code(), exit_code::CONNECTION);

        let slow = CliError::from(CoreError::Timeout { timeout_secs: 30 });
        assert_eq!(slow.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn profile_is_attached_to_auth_failures() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "nope".into(),
        })
        .with_profile("home");
        assert!(err.to_string().contains("'home'"));
    }
}
