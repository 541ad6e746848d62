//! API Server
//!
//! Serves the REST router until shutdown is requested.

use crate::driver::FlashBladeShareDriver;
use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8090)),
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server in front of one driver instance
pub struct ApiServer {
    config: ApiServerConfig,
    driver: Arc<FlashBladeShareDriver>,
    shutdown_tx: watch::Sender<bool>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, driver: Arc<FlashBladeShareDriver>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            driver,
            shutdown_tx,
        }
    }

    /// Run the API server until [`ApiServer::shutdown`] is called or the
    /// process receives Ctrl-C. A shutdown requested before `run` is
    /// honoured as soon as the listener is bound.
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.rest_addr;
        let app = RestRouter::new(self.driver.clone()).build();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

        info!(
            "REST API for backend {} listening on {}",
            self.driver.settings().backend_name,
            addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx.wait_for(|stop| *stop) => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::MemoryArray;
    use crate::config::DriverConfig;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.rest_addr.port(), 8090);
        assert!(config.rest_addr.ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let settings = DriverConfig {
            flashblade_mgmt_vip: Some("10.1.0.10".into()),
            flashblade_data_vip: Some("10.2.0.10".into()),
            flashblade_api: Some("T-0001".into()),
            ..Default::default()
        }
        .settings()
        .unwrap();
        let driver = FlashBladeShareDriver::setup(settings, Arc::new(MemoryArray::new()))
            .await
            .unwrap();

        let server = ApiServer::new(
            ApiServerConfig {
                rest_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            },
            Arc::new(driver),
        );
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), server.run()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
