use thiserror::Error;

/// Top-level error type for the `ambient-api` crate.
///
/// Every network operation distinguishes three outcomes: success, a
/// rejection by the backend, and a transport failure. Rejections of the
/// token endpoint (or a 401 on a data endpoint) are [`Authentication`],
/// other non-2xx answers are [`Api`], and connection/timeout/body-read
/// failures are [`Transport`]. `ambient-core` maps these into poll-cycle
/// outcomes.
///
/// [`Authentication`]: Error::Authentication
/// [`Api`]: Error::Api
/// [`Transport`]: Error::Transport
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials or tokens were rejected by the backend.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Application ─────────────────────────────────────────────────
    /// The backend rejected a well-formed authenticated request.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The HTTP client itself could not be built.
    #[error("HTTP client setup failed: {message}")]
    Http { message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the backend rejected our identity and only a
    /// fresh login (possibly with new credentials) can resolve it.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the next poll may succeed without new credentials
    /// or configuration: rejected requests, transport failures and
    /// undecodable bodies.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::Transport(_) | Self::Deserialization { .. }
        )
    }
}

/// Trim a response body to something safe to put in an error message.
pub(crate) fn body_excerpt(body: &str) -> String {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    body[..end].to_owned()
}
