//! Gateway configuration
//!
//! Read once at process start from command line flags, falling back to
//! environment variables.

use clap::Parser;
use elgas_core::{ElgasError, ElgasResult};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Gateway configuration
#[derive(Debug, Clone, Parser)]
#[command(
    name = "elgas-gateway",
    version,
    about = "Accepts ELGAS2 calls to dispatching and reads the calling device's archive"
)]
pub struct GatewayConfig {
    /// Host to serve the application on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to serve the application on
    #[arg(long, env = "PORT", default_value_t = 8649)]
    pub port: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Base URL of the metering backend
    #[arg(long = "base-url", env = "UTILITARIAN_BASE_URL")]
    pub base_url: String,

    /// API key for the metering backend
    #[arg(long = "api-key", env = "UTILITARIAN_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Timeout for backend requests, in seconds
    #[arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value_t = 30)]
    pub http_timeout: u64,

    /// Read/write timeout on device connections, in seconds
    #[arg(long = "socket-timeout", env = "SOCKET_TIMEOUT", default_value_t = 30)]
    pub socket_timeout: u64,
}

impl GatewayConfig {
    /// Resolve host and port to the address to listen on
    pub fn listen_address(&self) -> ElgasResult<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                ElgasError::Configuration(format!(
                    "Invalid listen address {}:{}: {}",
                    self.host, self.port, e
                ))
            })?
            .next()
            .ok_or_else(|| {
                ElgasError::Configuration(format!("No address for {}:{}", self.host, self.port))
            })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout)
    }
}
