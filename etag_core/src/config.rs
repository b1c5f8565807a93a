use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub const ENV_MAX_BODY_BYTES: &str = "ETAG_MAX_BODY_BYTES";
pub const ENV_STORE_CAPACITY: &str = "ETAG_STORE_CAPACITY";
pub const ENV_STORE_TTL_SECS: &str = "ETAG_STORE_TTL_SECS";
pub const ENV_ENFORCE_PRECONDITIONS: &str = "ETAG_ENFORCE_PRECONDITIONS";
pub const ENV_CONTENT_TYPE_MARKER: &str = "ETAG_CONTENT_TYPE_MARKER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// ETag middleware configuration
pub struct EtagConfig {
    /// Largest response body (bytes) buffered for fingerprinting
    pub max_body_bytes: usize,
    /// Maximum number of resource keys kept in the store (unbounded if `None`)
    pub store_capacity: Option<usize>,
    /// Seconds after which a stored fingerprint is forgotten (never if `None`)
    pub store_ttl_secs: Option<u64>,
    /// Whether PUT/PATCH requests with a stale `If-Match` are rejected with 412
    pub enforce_preconditions: bool,
    /// Substring a response content type must contain to be fingerprinted
    pub content_type_marker: String,
}

impl Default for EtagConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            store_capacity: None,
            store_ttl_secs: None,
            enforce_preconditions: true,
            content_type_marker: String::from("json"),
        }
    }
}

impl EtagConfig {
    /// Reads overrides from `ETAG_*` environment variables on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the variable whose value can't be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EtagConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the variable whose value can't be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_BODY_BYTES) {
            config.max_body_bytes = parse_number(ENV_MAX_BODY_BYTES, &value)?;
        }
        if let Some(value) = lookup(ENV_STORE_CAPACITY) {
            config.store_capacity = Some(parse_number(ENV_STORE_CAPACITY, &value)?);
        }
        if let Some(value) = lookup(ENV_STORE_TTL_SECS) {
            config.store_ttl_secs = Some(parse_number(ENV_STORE_TTL_SECS, &value)?);
        }
        if let Some(value) = lookup(ENV_ENFORCE_PRECONDITIONS) {
            config.enforce_preconditions = parse_flag(ENV_ENFORCE_PRECONDITIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONTENT_TYPE_MARKER) {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::Empty {
                    var: ENV_CONTENT_TYPE_MARKER,
                });
            }
            config.content_type_marker = value.to_string();
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn with_store_capacity(mut self, capacity: usize) -> Self {
        self.store_capacity = Some(capacity);
        self
    }

    /// Sets the entry age limit, rounded up to whole seconds.
    #[must_use]
    pub fn with_store_ttl(mut self, ttl: Duration) -> Self {
        self.store_ttl_secs = Some(ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0));
        self
    }

    #[must_use]
    pub fn with_enforce_preconditions(mut self, enforce: bool) -> Self {
        self.enforce_preconditions = enforce;
        self
    }

    #[must_use]
    pub fn store_ttl(&self) -> Option<Duration> {
        self.store_ttl_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
