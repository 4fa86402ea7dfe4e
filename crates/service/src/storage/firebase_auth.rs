//! Google service-account credentials for the Realtime Database REST API.
//!
//! A signed RS256 assertion is exchanged at the account's `token_uri` for a
//! short-lived OAuth2 access token, which is cached until shortly before it
//! expires.

use std::{path::Path, time::Duration};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info};

use super::StoreError;

const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String { "https://oauth2.googleapis.com/token".into() }

/// The subset of a service-account key file the token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Auth(format!("invalid credentials file {}: {e}", path.display())))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 { 3600 }

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Mints and caches access tokens for one service account.
pub struct TokenSource {
    account: ServiceAccount,
    key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(account: ServiceAccount, client: reqwest::Client) -> Result<Self, StoreError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid private key: {e}")))?;
        Ok(Self { account, key, client, cached: Mutex::new(None) })
    }

    pub fn client_email(&self) -> &str {
        &self.account.client_email
    }

    pub(crate) fn claims(&self, now_unix: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.account.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.account.token_uri.clone(),
            iat: now_unix,
            exp: now_unix + ASSERTION_TTL_SECS,
        }
    }

    fn assertion(&self) -> Result<String, StoreError> {
        let claims = self.claims(chrono::Utc::now().timestamp());
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StoreError::Auth(format!("cannot sign assertion: {e}")))
    }

    /// A valid access token, fetching a new one when the cached one is close to expiry.
    pub async fn token(&self) -> Result<String, StoreError> {
        // held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(c.token.clone());
            }
        }

        debug!(account = %self.account.client_email, "requesting access token");
        let assertion = self.assertion()?;
        let resp = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token exchange failed ({status}): {body}")));
        }
        let parsed: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(account = %self.account.client_email, expires_in = parsed.expires_in, "access token refreshed");
        *cached = Some(CachedToken { token: parsed.access_token.clone(), refresh_at: Instant::now() + lifetime });
        Ok(parsed.access_token)
    }
}
