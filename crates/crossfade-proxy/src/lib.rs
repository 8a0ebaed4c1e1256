//! Crossfade Proxy - local MITM proxy that redirects radio manifests.
//!
//! The game fetches in-game radio playlists over HTTPS from a CDN. This crate
//! runs a loopback proxy, registers it as the system proxy, and answers those
//! fetches with the backend station the user bound instead.
//!
//! ## Features
//!
//! - Generates a root CA certificate on first run
//! - Creates per-host certificates on the fly
//! - Intercepts only the radio CDN host (passthrough for others)
//! - Rewrites bound manifest requests to the backend with credentials
//! - Refuses tunnels to the stream-event telemetry host
//! - Captures and restores the system proxy settings
//!
//! ## Architecture
//!
//! ```text
//! CONNECT host:443 → Host Check ──────────────┬──────────────┐
//!                        │ other              │ radio CDN    │ telemetry
//!                        ▼                    ▼              ▼
//!                   Blind Tunnel            MITM         403 Refused
//!                                             │
//!                                             ▼
//!                              GET /{id}/master.blurl?
//!                                │ no            │ yes, binding exists
//!                                ▼              ▼
//!                           Passthrough    Rewrite to backend station
//! ```

mod ca;
mod error;
mod handler;
mod hosts;
mod platform;
mod proxy;

pub use ca::{CaManager, CA_COMMON_NAME};
pub use error::{CaError, PlatformError, ProxyError, Result};
pub use handler::RewriteHandler;
pub use hosts::{host_policy, HostPolicy, BLOCKED_HOST, INTERCEPT_HOST, PROXY_SERVER_VALUE};
pub use platform::{Platform, ProxyState, SystemPlatform};
pub use proxy::{ProxyConfig, ProxyHandle, ProxyServer};

/// Default proxy port.
pub const DEFAULT_PROXY_PORT: u16 = 18149;
