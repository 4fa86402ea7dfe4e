use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{header::HeaderValue, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{
    firebase_auth::{ServiceAccount, TokenSource},
    matching_children, segments, DocumentStore, StoreError,
};

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
/// Error text the database returns for a query on a field without `.indexOn`.
const INDEX_NOT_DEFINED: &str = "Index not defined";

/// How requests authenticate against the database.
pub enum FirebaseAuth {
    /// Emulator or publicly readable rules.
    None,
    /// Legacy database secret or Firebase ID token, sent as `auth=`.
    Secret(String),
    /// OAuth2 access token minted from a service account, sent as `access_token=`.
    ServiceAccount(TokenSource),
}

/// Firebase Realtime Database over its REST API.
///
/// Every path maps to `<database url>/<path>.json`; equality queries use
/// `orderBy`/`equalTo`. Without an `.indexOn` rule for the queried field the
/// database refuses the query, and the collection is read and filtered here.
pub struct FirebaseStore {
    client: reqwest::Client,
    base: Url,
    auth: FirebaseAuth,
}

impl FirebaseStore {
    pub fn new(database_url: &str, auth: FirebaseAuth, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Self::with_client(database_url, auth, client)
    }

    pub fn with_client(database_url: &str, auth: FirebaseAuth, client: reqwest::Client) -> Result<Self, StoreError> {
        let base = Url::parse(database_url)
            .map_err(|e| StoreError::Network(format!("invalid database url {database_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Network(format!("invalid database url {database_url}")));
        }
        Ok(Self { client, base, auth })
    }

    /// Build a store choosing credentials the way deployments provide them:
    /// a service-account file when it exists, else a static token, else none.
    pub async fn connect(
        database_url: &str,
        credentials_path: &str,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let auth = if Path::new(credentials_path).exists() {
            let account = ServiceAccount::from_file(credentials_path).await?;
            let source = TokenSource::new(account, client.clone())?;
            info!(account = %source.client_email(), "using service account credentials");
            FirebaseAuth::ServiceAccount(source)
        } else if let Some(token) = auth_token.filter(|t| !t.trim().is_empty()) {
            info!("using static database token");
            FirebaseAuth::Secret(token.to_string())
        } else {
            warn!(%credentials_path, "no credentials found; requests are unauthenticated");
            FirebaseAuth::None
        };
        Self::with_client(database_url, auth, client)
    }

    /// `<base>/<segments...>.json`, each segment percent-encoded.
    pub fn url_for(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let segs: Vec<&str> = segments(path).collect();
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty();
            match segs.split_last() {
                Some((last, parents)) => {
                    parts.extend(parents);
                    parts.push(&format!("{last}.json"));
                }
                None => {
                    parts.push(".json");
                }
            }
        }
        url
    }

    /// `orderBy`/`equalTo` take JSON-encoded values.
    pub fn equality_query(field: &str, value: &str) -> [(&'static str, String); 2] {
        [("orderBy", Value::from(field).to_string()), ("equalTo", Value::from(value).to_string())]
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let builder = self.client.request(method, self.url_for(path));
        Ok(match &self.auth {
            FirebaseAuth::None => builder,
            FirebaseAuth::Secret(secret) => builder.query(&[("auth", secret)]),
            FirebaseAuth::ServiceAccount(source) => builder.query(&[("access_token", source.token().await?)]),
        })
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Status { status: status.as_u16(), body })
    }

    async fn body(resp: Response) -> Result<Option<Value>, StoreError> {
        let value: Value = resp.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[async_trait]
impl DocumentStore for FirebaseStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        debug!(%path, backend = "firebase", "read");
        let resp = self.request(Method::GET, path).await?.send().await?;
        Self::body(Self::check(resp).await?).await
    }

    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        debug!(%path, backend = "firebase", "write");
        let resp = self
            .request(Method::PUT, path)
            .await?
            .query(&[("print", "silent")])
            .json(value)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn create(&self, path: &str, value: &Value) -> Result<bool, StoreError> {
        debug!(%path, backend = "firebase", "create");
        // read with ETag, then write conditioned on that ETag still matching
        let resp = self
            .request(Method::GET, path)
            .await?
            .header(ETAG_REQUEST_HEADER, "true")
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let etag: HeaderValue = resp
            .headers()
            .get(reqwest::header::ETAG)
            .cloned()
            .ok_or_else(|| StoreError::Decode("missing ETag header".into()))?;
        if Self::body(resp).await?.is_some() {
            return Ok(false);
        }

        let resp = self
            .request(Method::PUT, path)
            .await?
            .header(reqwest::header::IF_MATCH, etag)
            .query(&[("print", "silent")])
            .json(value)
            .send()
            .await?;
        if resp.status() == StatusCode::PRECONDITION_FAILED {
            debug!(%path, "conditional create lost the race");
            return Ok(false);
        }
        Self::check(resp).await?;
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        debug!(%path, backend = "firebase", "delete");
        let resp = self.request(Method::DELETE, path).await?.send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Map<String, Value>, StoreError> {
        debug!(%collection, %field, %value, backend = "firebase", "query");
        let resp = self
            .request(Method::GET, collection)
            .await?
            .query(&Self::equality_query(field, value))
            .send()
            .await?;
        let resp = match Self::check(resp).await {
            Err(StoreError::Status { status: 400, body }) if body.contains(INDEX_NOT_DEFINED) => {
                warn!(%collection, %field, "no index on query field; filtering the whole collection");
                return match self.read(collection).await? {
                    Some(Value::Object(children)) => Ok(matching_children(&children, field, value)),
                    _ => Ok(Map::new()),
                };
            }
            other => other?,
        };
        match Self::body(resp).await? {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(StoreError::Decode(format!("expected object from query, got {other}"))),
        }
    }

    fn backend(&self) -> &'static str {
        "firebase"
    }
}
