// ── Core error types ──
//
// Poll-cycle outcomes as the host sees them. Consumers never see HTTP
// status codes or JSON parse failures directly; the `From<ambient_api::Error>`
// impl folds them into "needs reconfiguration" versus "try again later".

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credentials or session rejected. Requires the operator to re-enter
    /// credentials; never retried silently.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A poll cycle failed; the previous snapshot stays visible and the
    /// next tick retries.
    #[error("Update failed, will retry next cycle: {message}")]
    UpdateFailed { message: String },

    /// A poll cycle exceeded its time budget.
    #[error("Update timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Initial setup could not reach the backend.
    #[error("Backend not ready: {message}")]
    SetupNotReady { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` when only new credentials can fix this.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// `true` when the next cycle may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::UpdateFailed { .. } | Self::Timeout { .. } | Self::SetupNotReady { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ambient_api::Error> for CoreError {
    fn from(err: ambient_api::Error) -> Self {
        match err {
            ambient_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            err if err.is_transient() => CoreError::UpdateFailed {
                message: update_message(&err),
            },
            err => CoreError::Config {
                message: err.to_string(),
            },
        }
    }
}

fn update_message(err: &ambient_api::Error) -> String {
    match err {
        ambient_api::Error::Api { status, message } => format!("HTTP {status}: {message}"),
        ambient_api::Error::Deserialization { message, .. } => {
            format!("unexpected response: {message}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_maps_to_reauth() {
        let err = CoreError::from(ambient_api::Error::Authentication {
            message: "invalid_grant".into(),
        });
        assert!(err.requires_reauth());
        assert!(!err.is_transient());
    }

    #[test]
    fn api_maps_to_transient_update_failure() {
        let err = CoreError::from(ambient_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(err.is_transient());
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn client_error_statuses_are_transient_too() {
        let err = CoreError::from(ambient_api::Error::Api {
            status: 404,
            message: "no such table".into(),
        });
        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn client_build_failure_is_config() {
        let err = CoreError::from(ambient_api::Error::Http {
            message: "bad header".into(),
        });
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(!err.is_transient());
    }
}
