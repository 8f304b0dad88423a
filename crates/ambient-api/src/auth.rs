// Token lifecycle against the Supabase auth endpoint.
//
// The session lives only in memory. It is created by a password grant,
// replaced wholesale by a refresh grant, and dropped whenever the backend
// rejects it. All mutation happens behind one async mutex, so concurrent
// callers of `ensure_valid` never race each other into two logins.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, body_excerpt};

/// Lead time (seconds) before expiry at which a token is proactively refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Account credentials, supplied once at setup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// One authenticated identity: access/refresh token pair plus expiry.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: DateTime<Utc>,
    user_id: String,
}

impl Session {
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `true` once `now` is inside the refresh margin before expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Token endpoint grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    Password,
    RefreshToken,
}

impl Grant {
    fn as_query(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Response body of `POST /auth/v1/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

/// Owns the authentication lifecycle for one account.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
    session: Mutex<Option<Session>>,
}

impl TokenManager {
    /// `base_url` is the project root; the token endpoint lives at
    /// `{base_url}/auth/v1/token`.
    pub fn new(http: reqwest::Client, base_url: &Url, credentials: Credentials) -> Result<Self, Error> {
        let token_url = base_url.join("auth/v1/token")?;
        Ok(Self {
            http,
            token_url,
            credentials,
            session: Mutex::new(None),
        })
    }

    /// The account e-mail this manager logs in as.
    pub fn email(&self) -> &str {
        &self.credentials.email
    }

    /// A copy of the current session, if one exists.
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Exchange email + password for a new session.
    ///
    /// Replaces any existing session. On rejection the session is cleared.
    pub async fn authenticate(&self) -> Result<Session, Error> {
        let mut guard = self.session.lock().await;
        self.authenticate_locked(&mut guard).await
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// A rejected refresh clears the session and does not fall back to the
    /// password grant; the next [`ensure_valid`](Self::ensure_valid) does.
    pub async fn refresh(&self) -> Result<Session, Error> {
        let mut guard = self.session.lock().await;
        self.refresh_locked(&mut guard).await
    }

    /// Return a session that is good for at least [`REFRESH_MARGIN_SECS`].
    ///
    /// Logs in when there is no session, refreshes when the current one is
    /// about to expire, and logs in again when there is nothing to refresh
    /// with.
    pub async fn ensure_valid(&self) -> Result<Session, Error> {
        let mut guard = self.session.lock().await;

        let Some(session) = guard.as_ref() else {
            debug!("no session, authenticating");
            return self.authenticate_locked(&mut guard).await;
        };

        if !session.needs_refresh(Utc::now()) {
            return Ok(session.clone());
        }

        if session.has_refresh_token() {
            debug!(expires_at = %session.expires_at, "access token near expiry, refreshing");
            self.refresh_locked(&mut guard).await
        } else {
            debug!("no refresh token, re-authenticating");
            self.authenticate_locked(&mut guard).await
        }
    }

    /// Drop the current session so the next call starts from a password grant.
    pub async fn invalidate(&self) {
        if self.session.lock().await.take().is_some() {
            debug!("session invalidated");
        }
    }

    // ── Grant helpers (called with the session lock held) ───────────

    async fn authenticate_locked(&self, slot: &mut Option<Session>) -> Result<Session, Error> {
        let body = json!({
            "email": self.credentials.email,
            "password": self.credentials.password.expose_secret(),
        });

        match self.grant(Grant::Password, &body).await {
            Ok(resp) => {
                let session = Session::from_response(resp, None)?;
                debug!(user_id = %session.user_id, "authenticated");
                *slot = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    *slot = None;
                }
                Err(e)
            }
        }
    }

    async fn refresh_locked(&self, slot: &mut Option<Session>) -> Result<Session, Error> {
        let previous = slot
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or_else(|| Error::Authentication {
                message: "no refresh token available".into(),
            })?;

        let body = json!({ "refresh_token": previous.expose_secret() });

        match self.grant(Grant::RefreshToken, &body).await {
            Ok(resp) => {
                let session = Session::from_response(resp, Some(previous))?;
                debug!(expires_at = %session.expires_at, "access token refreshed");
                *slot = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    warn!(error = %e, "refresh token rejected, clearing session");
                    *slot = None;
                }
                Err(e)
            }
        }
    }

    async fn grant(&self, grant: Grant, body: &serde_json::Value) -> Result<TokenResponse, Error> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("grant_type", grant.as_query());

        debug!(grant = grant.as_query(), "POST {}", self.token_url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let action = match grant {
                Grant::Password => "login",
                Grant::RefreshToken => "token refresh",
            };
            return Err(Error::Authentication {
                message: format!("{action} failed (HTTP {status}): {}", body_excerpt(&text)),
            });
        }

        let text = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: format!("token response: {e}"),
            body: text,
        })
    }
}

impl Session {
    /// Fails when `expires_in` does not fit a representable expiry instant.
    fn from_response(
        resp: TokenResponse,
        previous_refresh: Option<SecretString>,
    ) -> Result<Self, Error> {
        let expires_at = TimeDelta::try_seconds(resp.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| Error::Deserialization {
                message: format!("token response: expires_in {} out of range", resp.expires_in),
                body: String::new(),
            })?;

        Ok(Self {
            access_token: SecretString::from(resp.access_token),
            refresh_token: resp
                .refresh_token
                .map(SecretString::from)
                .or(previous_refresh),
            expires_at,
            user_id: resp.user.id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session_expiring_in(secs: i64) -> Session {
        Session {
            access_token: SecretString::from("access"),
            refresh_token: Some(SecretString::from("refresh")),
            expires_at: Utc::now() + TimeDelta::seconds(secs),
            user_id: "user-1".into(),
        }
    }

    #[test]
    fn fresh_session_does_not_need_refresh() {
        assert!(!session_expiring_in(3600).needs_refresh(Utc::now()));
    }

    #[test]
    fn session_inside_margin_needs_refresh() {
        assert!(session_expiring_in(299).needs_refresh(Utc::now()));
        assert!(session_expiring_in(-10).needs_refresh(Utc::now()));
    }

    #[test]
    fn refresh_response_without_token_keeps_previous() {
        let resp = TokenResponse {
            access_token: "new-access".into(),
            refresh_token: None,
            expires_in: 3600,
            user: TokenUser { id: "u".into() },
        };
        let session =
            Session::from_response(resp, Some(SecretString::from("old-refresh"))).unwrap();
        let kept = session.refresh_token.as_ref().map(|s| s.expose_secret().to_owned());
        assert_eq!(kept.as_deref(), Some("old-refresh"));
        assert_eq!(session.access_token().expose_secret(), "new-access");
    }

    #[test]
    fn unrepresentable_expiry_is_rejected() {
        for expires_in in [i64::MAX, i64::MIN] {
            let resp = TokenResponse {
                access_token: "access".into(),
                refresh_token: None,
                expires_in,
                user: TokenUser { id: "u".into() },
            };
            let err = Session::from_response(resp, None).unwrap_err();
            assert!(
                matches!(err, Error::Deserialization { .. }),
                "got {err:?}"
            );
            assert!(!err.is_auth_failure());
        }
    }
}
