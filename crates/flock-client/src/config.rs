//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration for local development.

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    /// Env: `FLOCK_API_URL`
    /// Default: `http://localhost:3000`
    pub api_base_url: String,

    /// URL of the realtime socket endpoint (consumed by whichever transport
    /// connector is plugged in).
    /// Env: `FLOCK_SOCKET_URL`
    /// Default: `http://localhost:3000`
    pub socket_url: String,

    /// Per-request timeout for REST calls, in seconds.
    /// Env: `FLOCK_HTTP_TIMEOUT_SECS`
    /// Default: `10`
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            socket_url: "http://localhost:3000".to_string(),
            http_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FLOCK_API_URL") {
            config.api_base_url = url;
        }

        if let Ok(url) = std::env::var("FLOCK_SOCKET_URL") {
            config.socket_url = url;
        }

        if let Ok(val) = std::env::var("FLOCK_HTTP_TIMEOUT_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.http_timeout_secs = n;
            } else {
                tracing::warn!(value = %val, "Invalid FLOCK_HTTP_TIMEOUT_SECS, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
