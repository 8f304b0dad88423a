// Ambient One HTTP client
//
// Wraps `reqwest::Client` with PostgREST URL construction, bearer-token
// injection and status classification. The endpoint modules (devices,
// readings, events) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{Credentials, Session, TokenManager};
use crate::error::{Error, body_excerpt};
use crate::transport::TransportConfig;

/// Authenticated client for one Ambient One account.
///
/// Every data call first asks the [`TokenManager`] for a valid session, so
/// callers never deal with token expiry. The client holds no other state
/// between calls.
pub struct AmbientClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenManager,
}

impl AmbientClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the project root (e.g. `https://<ref>.supabase.co`).
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, credentials)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for the `apikey` default header.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let base_url = normalize_base(base_url);
        let tokens = TokenManager::new(http.clone(), &base_url, credentials)?;
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// The project base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The token manager owning this client's session.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Log in with the configured credentials, replacing any session.
    pub async fn authenticate(&self) -> Result<Session, Error> {
        self.tokens.authenticate().await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/rest/v1/{table}`
    pub(crate) fn rest_url(&self, table: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rest/v1/{table}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET returning a PostgREST row array.
    pub(crate) async fn get_rows<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let session = self.tokens.ensure_valid().await?;

        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(session.access_token().expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_rows(resp).await
    }
}

/// Make sure `join` appends to the base path instead of replacing its last
/// segment.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Classify the response and decode the row array.
async fn parse_rows<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("access token rejected: {}", body_excerpt(&body)),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: body_excerpt(&body),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", body_excerpt(&body)),
        body,
    })
}
