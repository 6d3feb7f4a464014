//! Configuration for the Helix client.
//!
//! Every value has a default matching the development backend on
//! `localhost:5000` and can be overridden from the environment.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::ReconnectPolicy;
use crate::workspace::FieldPrecedence;

/// Default Socket.IO endpoint.
pub const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";
/// Default REST API base.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding the socket endpoint.
pub const SOCKET_URL_ENV: &str = "HELIX_SOCKET_URL";
/// Environment variable overriding the REST API base.
pub const API_URL_ENV: &str = "HELIX_API_URL";
/// Environment variable overriding the maximum reconnect attempts (`0` disables reconnection).
pub const RECONNECT_ATTEMPTS_ENV: &str = "HELIX_RECONNECT_ATTEMPTS";
/// Environment variable overriding the reconnect delay in milliseconds.
pub const RECONNECT_DELAY_ENV: &str = "HELIX_RECONNECT_DELAY_MS";
/// Environment variable overriding the REST request timeout in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "HELIX_REQUEST_TIMEOUT_SECS";

/// Top-level client configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HelixConfig {
    /// Real-time connection settings.
    pub transport: TransportConfig,
    /// REST client settings.
    pub api: ApiConfig,
    /// Which task fields win when projecting sequences.
    pub precedence: FieldPrecedence,
}

impl HelixConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults overridden by `HELIX_*` environment variables.
    ///
    /// Malformed numeric values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(SOCKET_URL_ENV) {
            config.transport.endpoint = url;
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api.base_url = url;
        }
        if let Some(attempts) = env_parse::<u32>(RECONNECT_ATTEMPTS_ENV) {
            config.transport.reconnect.max_attempts = Some(attempts);
        }
        if let Some(delay_ms) = env_parse::<u64>(RECONNECT_DELAY_ENV) {
            let delay = Duration::from_millis(delay_ms);
            config.transport.reconnect.delay_min = delay;
            config.transport.reconnect.delay_max = delay;
        }
        if let Some(secs) = env_parse::<u64>(REQUEST_TIMEOUT_ENV) {
            config.api.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Set the socket endpoint.
    #[must_use]
    pub fn with_socket_url(mut self, url: impl Into<String>) -> Self {
        self.transport.endpoint = url.into();
        self
    }

    /// Set the REST API base.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub const fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.transport.reconnect = policy;
        self
    }

    /// Set the projection field precedence.
    #[must_use]
    pub const fn with_precedence(mut self, precedence: FieldPrecedence) -> Self {
        self.precedence = precedence;
        self
    }
}

/// Real-time connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Server origin, e.g. `http://localhost:5000`.
    pub endpoint: String,
    /// Time allowed for the transport and namespace handshake.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    /// Reconnection behaviour after a failed or lost connection.
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SOCKET_URL.to_string(),
            connect_timeout: Duration::from_secs(20),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// REST client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL that endpoint paths are joined onto.
    pub base_url: String,
    /// Whole-request timeout.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// TCP connect timeout.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring malformed environment override");
            None
        }
    }
}

/// Serde module for `Duration` as whole milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
