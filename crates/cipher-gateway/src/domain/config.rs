//! Gateway configuration with validation.
//!
//! Values come from built-in defaults, then an optional TOML file named by
//! `CIPHER_GATEWAY_CONFIG`, then individual environment overrides.

use cipher_broker::BrokerConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "CIPHER_GATEWAY_CONFIG";

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// External worker configuration
    pub worker: BrokerConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// API key protection for the encryption routes
    pub auth: AuthConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.worker.validate()?;

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if let Some(key) = &self.auth.api_key {
            if key.is_empty() {
                return Err(ConfigError::Invalid(
                    "auth.api_key cannot be empty; omit it to disable auth".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Parse a TOML document; missing sections keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load from the process environment and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CIPHER_*` environment overrides on top of the current values.
    ///
    /// # Environment Variables
    ///
    /// - `CIPHER_HTTP_PORT`: listen port
    /// - `CIPHER_WORKER_PROGRAM`: worker executable
    /// - `CIPHER_WORKER_ARGS`: whitespace separated prefix arguments
    /// - `CIPHER_WORKER_TIMEOUT_SECS`: worker deadline in seconds
    /// - `CIPHER_WORKER_MAX_CONCURRENT`: worker pool size
    /// - `CIPHER_API_KEY`: API key for the encryption routes
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup("CIPHER_HTTP_PORT") {
            self.http.port = parse_var("CIPHER_HTTP_PORT", &port)?;
        }
        if let Some(program) = lookup("CIPHER_WORKER_PROGRAM") {
            self.worker.program = PathBuf::from(program);
        }
        if let Some(args) = lookup("CIPHER_WORKER_ARGS") {
            self.worker.program_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(secs) = lookup("CIPHER_WORKER_TIMEOUT_SECS") {
            self.worker.timeout =
                Duration::from_secs(parse_var("CIPHER_WORKER_TIMEOUT_SECS", &secs)?);
        }
        if let Some(max) = lookup("CIPHER_WORKER_MAX_CONCURRENT") {
            self.worker.max_concurrent = parse_var("CIPHER_WORKER_MAX_CONCURRENT", &max)?;
        }
        if let Some(key) = lookup("CIPHER_API_KEY") {
            self.auth.api_key = Some(key);
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{name}={value:?}: {e}")))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-API-Key".to_string(),
            ],
            max_age: 86400, // 24 hours
        }
    }
}

/// API key configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key required on the encryption routes (None = open)
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Worker section rejected
    #[error("worker: {0}")]
    Worker(#[from] cipher_broker::ConfigError),
    /// Config file could not be read
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
