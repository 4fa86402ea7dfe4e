use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: Some(4) }
    }
}

/// Which `DocumentStore` implementation backs the API.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Firebase Realtime Database over its REST API.
    #[default]
    Firebase,
    /// In-process JSON tree, optionally persisted to `data_file`.
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database root, e.g. `https://<project>-default-rtdb.firebaseio.com/`.
    #[serde(default)]
    pub url: String,
    /// Google service-account JSON used to mint OAuth2 access tokens.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Legacy database secret or ID token, sent as `auth=`; used when no credentials file exists.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Persistence file for the local backend; `None` keeps everything in memory.
    #[serde(default = "default_data_file")]
    pub data_file: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: String::new(),
            credentials_path: default_credentials_path(),
            auth_token: None,
            data_file: default_data_file(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 3001 }
fn default_credentials_path() -> String { "firebase-credentials.json".into() }
fn default_data_file() -> Option<String> { Some("data/db.json".into()) }
fn default_request_timeout() -> u64 { 30 }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl AppConfig {
    /// Load `config.toml` when present, otherwise build from environment variables.
    /// Environment overrides (`PORT`, store URL/token) are applied on top and the
    /// result is validated.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path).map_err(|e| anyhow!("cannot parse {path}: {e}"))?
        } else {
            Self::from_env_with(process_env)
        };
        cfg.apply_env_overrides(process_env);
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Build a config purely from environment lookups.
    pub fn from_env_with<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AppConfig::default();
        if let Some(host) = get("HOST") {
            cfg.server.host = host;
        }
        if let Some(threads) = get("TOKIO_WORKER_THREADS").and_then(|v| v.parse().ok()) {
            cfg.server.worker_threads = Some(threads);
        }
        match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("local") => cfg.store.backend = StoreBackend::Local,
            Some("firebase") => cfg.store.backend = StoreBackend::Firebase,
            _ => {}
        }
        if let Some(path) = get("FIREBASE_CREDENTIALS") {
            cfg.store.credentials_path = path;
        }
        if let Some(file) = get("LOCAL_DATA_FILE") {
            cfg.store.data_file = if file.trim().is_empty() { None } else { Some(file) };
        }
        cfg
    }

    /// `PORT` always wins; URL and token fill in only what the file left empty.
    pub fn apply_env_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = get("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
        if self.store.url.trim().is_empty() {
            if let Some(url) = get("FIREBASE_DATABASE_URL") {
                self.store.url = url;
            }
        }
        if self.store.auth_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            self.store.auth_token = get("FIREBASE_AUTH_TOKEN").filter(|t| !t.trim().is_empty());
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("store.request_timeout_secs must be a positive number of seconds"));
        }
        if self.backend == StoreBackend::Firebase {
            if self.url.trim().is_empty() {
                return Err(anyhow!(
                    "store.url is empty; set it in config.toml or FIREBASE_DATABASE_URL"
                ));
            }
            let lower = self.url.to_lowercase();
            if !(lower.starts_with("https://") || lower.starts_with("http://")) {
                return Err(anyhow!("store.url must start with http:// or https://"));
            }
        }
        Ok(())
    }
}
