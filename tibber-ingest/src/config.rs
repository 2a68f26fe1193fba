use std::{fs, net::SocketAddr, path::PathBuf, time::Duration};

use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "TIBBER_INGEST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "tibber-ingest.toml";
pub const TIBBER_TOKEN_ENV: &str = "TIBBER_TOKEN";
pub const INFLUXDB_TOKEN_ENV: &str = "INFLUXDB_TOKEN";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level '{0}'")]
    LogLevel(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9501".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TibberConfig {
    pub endpoint: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for TibberConfig {
    fn default() -> Self {
        Self {
            endpoint: tibber_client::DEFAULT_ENDPOINT.to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    InfluxHttp,
    IlpTcp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub emit_home_point: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::InfluxHttp,
            batch_size: 5000,
            max_retries: 2,
            retry_backoff_ms: 500,
            emit_home_point: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: String::new(),
            org: String::new(),
            bucket: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IlpConfig {
    pub addr: String,
}

impl Default for IlpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9009".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
    pub tibber: TibberConfig,
    pub sink: SinkConfig,
    pub influxdb: InfluxDbConfig,
    pub ilp: IlpConfig,
}

impl AppConfig {
    /// Load from the file named by `TIBBER_INGEST_CONFIG`, apply token
    /// overrides from the environment and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = PathBuf::from(
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        );
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let mut cfg = Self::from_toml(&contents)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TIBBER_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.tibber.token = token;
        }
        if let Some(token) = lookup(INFLUXDB_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.influxdb.token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.logging.level)?;
        self.http_bind_addr()?;

        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid("schedule.interval_secs must be > 0".to_string()));
        }
        if self.tibber.token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "tibber.token is empty (set it in the file or via {TIBBER_TOKEN_ENV})"
            )));
        }
        if self.sink.batch_size == 0 {
            return Err(ConfigError::Invalid("sink.batch_size must be > 0".to_string()));
        }

        match self.sink.kind {
            SinkKind::InfluxHttp => {
                let db = &self.influxdb;
                if db.url.is_empty() || db.org.is_empty() || db.bucket.is_empty() {
                    return Err(ConfigError::Invalid(
                        "influxdb.url, influxdb.org and influxdb.bucket are required for sink.kind = \"influx_http\""
                            .to_string(),
                    ));
                }
            }
            SinkKind::IlpTcp => {
                self.ilp_addr()?;
            }
        }

        Ok(())
    }

    pub fn http_bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http
            .bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid http.bind_addr: {e}")))
    }

    pub fn ilp_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.ilp
            .addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid ilp.addr: {e}")))
    }
}

/// Parse a `trace|debug|info|warn|error` level name, case-insensitively.
/// Numeric levels are rejected.
pub fn parse_level(level: &str) -> Result<tracing::Level, ConfigError> {
    let name = level.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::LogLevel(level.to_string()));
    }
    name.parse::<tracing::Level>()
        .map_err(|_| ConfigError::LogLevel(level.to_string()))
}
