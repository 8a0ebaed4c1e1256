//! MITM proxy server.
//!
//! Provides the local proxy that intercepts the game's radio manifest
//! traffic and hands it to [`RewriteHandler`].

use std::net::SocketAddr;

use hudsucker::rustls::crypto::aws_lc_rs::default_provider;
use hudsucker::Proxy;
use tokio::sync::broadcast;

use crossfade_api::ApiClient;
use crossfade_core::SharedState;

use crate::ca::CaManager;
use crate::error::{ProxyError, Result};
use crate::handler::RewriteHandler;
use crate::DEFAULT_PROXY_PORT;

/// Proxy server configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to bind the proxy to.
    pub addr: SocketAddr,
    /// The CA manager for certificate generation.
    pub ca_manager: CaManager,
}

impl ProxyConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Result<Self> {
        let ca_manager = CaManager::with_default_dir().map_err(ProxyError::Ca)?;

        Ok(Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PROXY_PORT)),
            ca_manager,
        })
    }

    /// Sets the listen address.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the CA manager.
    pub fn with_ca_manager(mut self, ca_manager: CaManager) -> Self {
        self.ca_manager = ca_manager;
        self
    }
}

/// MITM proxy server for redirecting radio manifest traffic.
#[derive(Debug)]
pub struct ProxyServer {
    config: ProxyConfig,
    state: SharedState,
    api: ApiClient,
}

impl ProxyServer {
    /// Creates a new proxy server with the given configuration.
    pub fn new(config: ProxyConfig, state: SharedState, api: ApiClient) -> Result<Self> {
        // Ensure CA exists (will generate if missing)
        config.ca_manager.ensure_ca().map_err(ProxyError::Ca)?;

        Ok(Self { config, state, api })
    }

    /// Returns the address the proxy is configured to listen on.
    pub fn addr(&self) -> SocketAddr {
        self.config.addr
    }

    /// Returns the CA certificate path for trust-store installation.
    pub fn ca_cert_path(&self) -> std::path::PathBuf {
        self.config.ca_manager.cert_path()
    }

    /// Starts the proxy server in the background.
    ///
    /// Returns a handle that can be used to stop the server.
    pub fn start(self) -> Result<ProxyHandle> {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let shutdown_tx_clone = shutdown_tx.clone();
        let addr = self.config.addr;

        // Load CA authority before spawning
        let authority = self.config.ca_manager.ensure_ca().map_err(ProxyError::Ca)?;

        let handler = RewriteHandler::new(self.state.clone(), self.api.clone());

        tracing::info!("Starting MITM proxy on {}", addr);
        tracing::info!("CA certificate: {:?}", self.ca_cert_path());

        let handle = tokio::spawn(async move {
            let proxy = match Proxy::builder()
                .with_addr(addr)
                .with_ca(authority)
                .with_rustls_connector(default_provider())
                .with_http_handler(handler.clone())
                .with_websocket_handler(handler)
                .build()
            {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!("Failed to build proxy: {}", e);
                    return;
                }
            };

            let mut shutdown_rx = shutdown_tx.subscribe();

            tokio::select! {
                result = proxy.start() => {
                    if let Err(e) = result {
                        tracing::error!("Proxy error: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Proxy shutdown signal received");
                }
            };
        });

        Ok(ProxyHandle {
            shutdown_tx: shutdown_tx_clone,
            addr,
            handle,
        })
    }
}

/// Handle for controlling a running proxy server.
pub struct ProxyHandle {
    shutdown_tx: broadcast::Sender<()>,
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl ProxyHandle {
    /// Returns the address the proxy is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signals the proxy to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Waits for the proxy to finish.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }

    /// Shuts down the proxy and waits for it to finish.
    pub async fn stop(self) {
        self.shutdown();
        self.wait().await;
    }
}
