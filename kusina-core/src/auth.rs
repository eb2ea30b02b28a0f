//! Authentication and sessions
//!
//! A [`Session`] is the signed-in admin's identity: uid plus the ID token the
//! document store expects. It is passed explicitly to every fetch; nothing in
//! this crate reads a process-wide "current user".
//!
//! Sessions are persisted as JSON under the state directory so the CLI can
//! reuse them between invocations, and refreshed with the stored refresh
//! token when the ID token is about to expire.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::{collections, FromDocument, RecordStore};
use crate::types::UserProfile;

/// Tokens are treated as expired this many seconds before they really are.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Authenticated identity of the dashboard user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session for stores that do not check tokens (the in-memory store).
    pub fn offline(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: None,
            id_token: String::new(),
            refresh_token: None,
            expires_at: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// Load a persisted session, `None` if nobody is signed in.
    pub fn load(path: &Path) -> Result<Option<Session>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Remove a persisted session. Succeeds when there is none.
    pub fn clear(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Turn an optional session into the session a fetch needs.
pub fn require(session: Option<&Session>) -> Result<&Session> {
    session.ok_or(Error::NotAuthenticated)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

/// Client for the password sign-in and token refresh endpoints.
pub struct AuthClient {
    http_client: reqwest::Client,
    api_key: String,
    auth_url: String,
    token_url: String,
}

impl AuthClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("store.api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange email and password for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!(
            "{}/v1/accounts:signInWithPassword?key={}",
            self.auth_url,
            urlencoding::encode(&self.api_key)
        );
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Auth(format!("API error ({}): {}", status, error_text)));
        }

        let signed_in: SignInResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("failed to parse response: {}", e)))?;

        tracing::info!(uid = %signed_in.local_id, "Signed in");

        Ok(Session {
            uid: signed_in.local_id,
            email: signed_in.email.or_else(|| Some(email.to_string())),
            id_token: signed_in.id_token,
            refresh_token: Some(signed_in.refresh_token),
            expires_at: expiry(&signed_in.expires_in)?,
        })
    }

    /// Mint a fresh ID token from the session's refresh token.
    pub async fn refresh(&self, session: &Session) -> Result<Session> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(Error::NotAuthenticated)?;

        let url = format!(
            "{}/v1/token?key={}",
            self.token_url,
            urlencoding::encode(&self.api_key)
        );
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Auth(format!("API error ({}): {}", status, error_text)));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("failed to parse response: {}", e)))?;

        tracing::debug!(uid = %refreshed.user_id, "Refreshed ID token");

        Ok(Session {
            uid: refreshed.user_id,
            email: session.email.clone(),
            id_token: refreshed.id_token,
            refresh_token: Some(refreshed.refresh_token),
            expires_at: expiry(&refreshed.expires_in)?,
        })
    }

    /// Return the session unchanged while valid, refreshed otherwise.
    pub async fn ensure_fresh(&self, session: Session) -> Result<Session> {
        if session.is_expired(Utc::now()) {
            self.refresh(&session).await
        } else {
            Ok(session)
        }
    }
}

fn expiry(expires_in: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = expires_in
        .parse()
        .map_err(|_| Error::Auth(format!("invalid expiresIn: {}", expires_in)))?;
    Ok(Utc::now() + chrono::Duration::seconds(secs))
}

/// Admit only business accounts to the dashboard.
///
/// Reads `users/{uid}` and checks `roles.business`. A missing profile is
/// treated the same as a non-business one.
pub async fn verify_business(store: &dyn RecordStore, session: &Session) -> Result<UserProfile> {
    let doc = store
        .get(session, collections::USERS, &session.uid)
        .await?
        .ok_or_else(|| Error::AccessDenied("Business account required.".to_string()))?;
    let profile = UserProfile::from_document(&doc)?;

    if !profile.roles.business {
        tracing::warn!(uid = %session.uid, "Rejected non-business account");
        return Err(Error::AccessDenied("Business account required.".to_string()));
    }
    Ok(profile)
}
