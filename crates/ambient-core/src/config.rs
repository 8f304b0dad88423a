// ── Runtime poller configuration ──
//
// Describes *how* to reach the backend and how often to poll. Carries
// credential data but never touches disk; `ambient-config` (or a test)
// builds one and hands it in.

use std::time::Duration;

use ambient_api::Credentials;
use ambient_api::transport::{DEFAULT_ANON_KEY, DEFAULT_BASE_URL, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// Interval between scheduled refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on one whole refresh cycle.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for polling one account.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Project base URL.
    pub base_url: Url,
    /// Project `apikey` header value.
    pub anon_key: SecretString,
    /// Account login.
    pub credentials: Credentials,
    /// How often to refresh. Zero disables the background task.
    pub poll_interval: Duration,
    /// Bound on a whole refresh cycle.
    pub refresh_timeout: Duration,
    /// Bound on a single HTTP request.
    pub request_timeout: Duration,
}

impl CoordinatorConfig {
    /// Production backend with default timings.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            anon_key: SecretString::from(DEFAULT_ANON_KEY),
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            request_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Transport settings for the underlying HTTP client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default()
            .with_timeout(self.request_timeout)
            .with_anon_key(self.anon_key.clone())
    }
}
