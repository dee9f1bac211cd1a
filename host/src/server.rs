//! Serving a bootstrapped platform.
//!
//! 1. **Bind** the listener from the `Server` section
//! 2. **Serve** the router until Ctrl+C or SIGTERM
//! 3. **Drain** in-flight requests
//! 4. **Stop** the bus, bounded by `ShutdownTimeoutSeconds`

use crate::bootstrap::ReadyPlatform;
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use transit_platform_core::config::{Configuration, de};
use transit_platform_core::error::{BootstrapError, ConfigError};

/// Section holding [`ServerOptions`].
pub const SERVER_SECTION: &str = "Server";

/// HTTP listener options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Listen address
    #[serde(deserialize_with = "de::string")]
    pub host: String,
    /// Listen port
    #[serde(deserialize_with = "de::number")]
    pub port: u16,
    /// Time allowed for the bus to stop after the server drains
    #[serde(rename = "shutdowntimeoutseconds", deserialize_with = "de::number")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl ServerOptions {
    /// Bind the `Server` section; an absent section yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if a value is malformed.
    pub fn bind(configuration: &Configuration) -> Result<Self, ConfigError> {
        configuration.bind(SERVER_SECTION)
    }

    /// `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bus stop timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

/// Serves a [`ReadyPlatform`] and stops its bus on shutdown.
#[derive(Debug)]
pub struct PlatformHost {
    platform: ReadyPlatform,
    options: ServerOptions,
}

impl PlatformHost {
    /// Host for `platform`.
    #[must_use]
    pub const fn new(platform: ReadyPlatform, options: ServerOptions) -> Self {
        Self { platform, options }
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Http`] if the listener cannot be bound or
    /// the server fails.
    pub async fn run(self) -> Result<(), BootstrapError> {
        let address = self.options.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| BootstrapError::Http(format!("failed to bind {address}: {e}")))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Http`] if the server fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: Option<SocketAddr> = listener.local_addr().ok();
        info!(
            address = ?local,
            transport = %self.platform.options().transport,
            "HTTP server listening"
        );

        let served = axum::serve(listener, self.platform.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| BootstrapError::Http(e.to_string()));

        info!("HTTP server stopped, stopping bus");
        let timeout = self.options.shutdown_timeout();
        match tokio::time::timeout(timeout, self.platform.bus().stop()).await {
            Ok(Ok(())) => info!("Bus stopped"),
            Ok(Err(error)) => warn!(%error, "Bus stop failed"),
            Err(_) => warn!(timeout_secs = timeout.as_secs(), "Bus stop timed out"),
        }

        served
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        assert_eq!(
            ServerOptions::bind(&Configuration::new()).unwrap(),
            ServerOptions::default()
        );

        let options = ServerOptions::bind(
            &Configuration::new()
                .with_value("Server:Port", "9090")
                .with_value("Server:ShutdownTimeoutSeconds", "5"),
        )
        .unwrap();
        assert_eq!(options.address(), "0.0.0.0:9090");
        assert_eq!(options.shutdown_timeout(), Duration::from_secs(5));
    }
}
