use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the config file path when no explicit
/// `--config` flag is given.
pub const CONFIG_ENV_VAR: &str = "OGMA_PRIME_CONFIG";

pub const DEFAULT_DATABASE_TYPE: &str = "mongo";
pub const DEFAULT_DATABASE_PATH: &str = "localhost:27017";
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: &str = "22327";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("invalid timeout {value:?}: {reason}")]
    Timeout { value: String, reason: String },
}

/// Resolved process configuration. Every field is non-empty once produced by
/// [`GatewayConfig::load_from`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub database_type: String,
    #[serde(rename = "database_string")]
    pub database_path: String,
    pub listen_host: String,
    pub listen_port: String,
    #[serde(with = "duration_string")]
    pub timeout: Duration,
}

/// Shape of the JSON file before defaults are applied.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database_type: Option<String>,
    database_string: Option<String>,
    listen_host: Option<String>,
    listen_port: Option<String>,
    timeout: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_type: DEFAULT_DATABASE_TYPE.to_string(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            listen_port: DEFAULT_LISTEN_PORT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from an optional JSON file.
    ///
    /// No path means all defaults. A path that does not exist is an error and
    /// nothing else is attempted.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let raw: RawConfig = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let timeout = match non_empty(raw.timeout) {
            Some(value) => {
                let parsed = parse_duration(&value)
                    .map_err(|reason| ConfigError::Timeout { value, reason })?;
                if parsed.is_zero() {
                    DEFAULT_TIMEOUT
                } else {
                    parsed
                }
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            database_type: non_empty(raw.database_type)
                .unwrap_or_else(|| DEFAULT_DATABASE_TYPE.to_string()),
            database_path: non_empty(raw.database_string)
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            listen_host: non_empty(raw.listen_host)
                .unwrap_or_else(|| DEFAULT_LISTEN_HOST.to_string()),
            listen_port: non_empty(raw.listen_port)
                .unwrap_or_else(|| DEFAULT_LISTEN_PORT.to_string()),
            timeout,
        })
    }

    /// Get the server bind address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    /// Render as two-space indented JSON, the format `show-config` prints.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a duration such as `"300ms"`, `"10s"`, `"1m30s"` or `"2h"`.
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = input.parse::<f64>() {
        return seconds(secs);
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit after {rest:?}"))?;
        if digits == 0 {
            return Err(format!("expected a number at {rest:?}"));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| format!("bad number {:?}", &rest[..digits]))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            other => return Err(format!("unknown unit {other:?}")),
        };
        total += value * scale;
        rest = &rest[unit_len..];
    }

    seconds(total)
}

fn seconds(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

/// Inverse of [`parse_duration`]; output always parses back to the same value.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration.subsec_nanos() == 0 {
        let secs = duration.as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        let mut out = String::new();
        if h > 0 {
            out.push_str(&format!("{h}h"));
        }
        if m > 0 {
            out.push_str(&format!("{m}m"));
        }
        if s > 0 {
            out.push_str(&format!("{s}s"));
        }
        return out;
    }
    let nanos = duration.as_nanos();
    if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else {
        format!("{nanos}ns")
    }
}

mod duration_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
