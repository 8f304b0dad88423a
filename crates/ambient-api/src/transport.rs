// Shared transport configuration for building reqwest::Client instances.
//
// Every request to the backend carries the project's anonymous `apikey`
// header, so it is installed once as a default header here instead of
// being repeated by each endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Production Supabase project backing the Ambient One app.
pub const DEFAULT_BASE_URL: &str = "https://cszlzkwrpugdncexjkbd.supabase.co";

/// Public anonymous key of the production project. Not a user secret: it is
/// shipped in the mobile app and only identifies the project.
pub const DEFAULT_ANON_KEY: &str = concat!(
    "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.",
    "eyJpc3MiOiJzdXBhYmFzZSIsInJlZiI6ImNzemx6a3dycHVnZG5jZXhqa2JkIiwicm9sZSI6ImFub24iLCJpYXQiOjE3NDQ4MzM1ODYsImV4cCI6MjA2MDQwOTU4Nn0.",
    "8hurRr4Pk_oc4utH4Nce8B8GHTgU6m3VaBtTobRDGXs",
);

const USER_AGENT: &str = concat!("ambient-poller/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Project `apikey` header value.
    pub anon_key: SecretString,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            anon_key: SecretString::from(DEFAULT_ANON_KEY),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` that sends the `apikey` header on every request.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(self.anon_key.expose_secret()).map_err(|e| Error::Http {
            message: format!("API key is not a valid header value: {e}"),
        })?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http {
                message: e.to_string(),
            })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the project API key.
    pub fn with_anon_key(mut self, key: SecretString) -> Self {
        self.anon_key = key;
        self
    }
}
