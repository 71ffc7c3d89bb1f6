use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::{AdapterError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:9090";

pub const ENV_ENDPOINT: &str = "PROMETHEUS_ENDPOINT";
pub const ENV_TIMEOUT_MS: &str = "PROMETHEUS_TIMEOUT_MS";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "PROMETHEUS_INSECURE_SKIP_VERIFY";

/// Connection settings for a single call against a monitoring endpoint.
///
/// Nothing here is cached; every operation builds its own client from a
/// config value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Request timeout applied on the transport. `None` waits indefinitely.
    #[serde(with = "timeout_millis")]
    pub timeout: Option<Duration>,
    /// Accept any TLS certificate. Off unless the caller asks for it.
    pub insecure_skip_verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            insecure_skip_verify: false,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Reads `PROMETHEUS_ENDPOINT`, `PROMETHEUS_TIMEOUT_MS` and
    /// `PROMETHEUS_INSECURE_SKIP_VERIFY`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_ENDPOINT).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let timeout = match lookup(ENV_TIMEOUT_MS) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    AdapterError::InvalidArgument(format!("{}={}", ENV_TIMEOUT_MS, raw))
                })?;
                Some(Duration::from_millis(millis))
            }
            None => None,
        };

        let insecure_skip_verify = lookup(ENV_INSECURE_SKIP_VERIFY)
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            timeout,
            insecure_skip_verify,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(self.insecure_skip_verify);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| AdapterError::Connection(format!("Failed to build HTTP client: {}", e)))
    }
}

mod timeout_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
