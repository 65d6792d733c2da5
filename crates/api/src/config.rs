use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use calendar_core::config::{env_or, env_secs, ConfigError};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: IpAddr,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// HTTP request timeout (default: 30 s).
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `HOST`                 | `127.0.0.1` |
    /// | `PORT`                 | `8080`      |
    /// | `REQUEST_TIMEOUT_SECS` | `30`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
