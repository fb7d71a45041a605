//! Worker pool configuration with validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How to launch the external worker and how many may run at once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Executable to spawn
    pub program: PathBuf,
    /// Fixed arguments placed before the per-request ones (e.g. a script path)
    pub program_args: Vec<String>,
    /// Deadline for a running worker; it is killed afterwards
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Upper bound on concurrently running worker processes
    pub max_concurrent: usize,
    /// Cap on buffered stdout/stderr per stream
    pub max_output_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            program_args: vec!["scripts/analysis.py".to_string()],
            timeout: Duration::from_secs(30),
            max_concurrent: 16,
            max_output_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl BrokerConfig {
    /// Config for a bare executable with no prefix arguments
    pub fn for_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            program_args: Vec::new(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("worker program cannot be empty".into()));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "worker timeout cannot be 0".into(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_concurrent cannot be 0".into(),
            ));
        }

        if self.max_output_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_output_bytes cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration (de)serialization as `"30s"`, `"500ms"` or `"2m"`
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" has to be tried before the single-letter suffixes
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Plain number means seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
