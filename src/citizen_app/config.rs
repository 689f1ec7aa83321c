use crate::citizen_app::offline::RetryPolicy;
use crate::citizen_app::storage::FileStore;
use crate::citizen_app::sync::DEFAULT_SETTLE_DELAY;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://localhost:8085/api";

/// Optional TOML overrides, every field may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    api_token: Option<String>,
    reconnect_settle_ms: Option<u64>,
    max_attempts: Option<u32>,
    data_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

/// Citizen client configuration.
///
/// Layered as defaults, then an optional TOML file, then `GEOINFO_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
    reconnect_settle_delay: Duration,
    retry_policy: RetryPolicy,
    data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                server_url: Some(DEFAULT_SERVER_URL.to_string()),
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
            token: None,
            reconnect_settle_delay: DEFAULT_SETTLE_DELAY,
            retry_policy: RetryPolicy::unlimited(),
            data_dir: FileStore::default_location(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults, then `path`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overridden by a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut config = Self::default();

        let mut builder = AppConfig::builder()
            .server_url(file.api_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()));
        if let Some(secs) = file.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        config.app = builder.build()?;

        config.token = file.api_token;
        if let Some(ms) = file.reconnect_settle_ms {
            config.reconnect_settle_delay = Duration::from_millis(ms);
        }
        if let Some(max) = file.max_attempts {
            config.retry_policy = RetryPolicy::with_max_attempts(max);
        }
        if let Some(dir) = file.data_dir {
            config.data_dir = dir;
        }
        Ok(config)
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self {
            app: builder.build()?,
            ..Self::default()
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let url = std::env::var("GEOINFO_API_URL").ok();
        let timeout = env_parse::<u64>("GEOINFO_REQUEST_TIMEOUT_SECS")?;
        if url.is_some() || timeout.is_some() {
            let builder = AppConfig::builder()
                .server_url(url.unwrap_or_else(|| self.server_url().to_string()))
                .request_timeout(timeout.map(Duration::from_secs).unwrap_or(self.app.request_timeout));
            self.app = builder.build()?;
        }

        if let Ok(token) = std::env::var("GEOINFO_API_TOKEN") {
            self.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(ms) = env_parse::<u64>("GEOINFO_RECONNECT_SETTLE_MS")? {
            self.reconnect_settle_delay = Duration::from_millis(ms);
        }
        if let Some(max) = env_parse::<u32>("GEOINFO_MAX_ATTEMPTS")? {
            self.retry_policy = RetryPolicy::with_max_attempts(max);
        }
        if let Ok(dir) = std::env::var("GEOINFO_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout
    }

    pub fn reconnect_settle_delay(&self) -> Duration {
        self.reconnect_settle_delay
    }

    pub fn set_reconnect_settle_delay(&mut self, delay: Duration) {
        self.reconnect_settle_delay = delay;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry_policy = policy;
    }

    /// Directory of the file store
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn set_data_dir(&mut self, dir: impl Into<PathBuf>) {
        self.data_dir = dir.into();
    }
}

fn env_parse<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}
