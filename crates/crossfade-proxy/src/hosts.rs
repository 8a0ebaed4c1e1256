//! Host classification for proxied traffic.
//!
//! The proxy only ever cares about two upstream hosts: the CDN host the
//! game fetches radio manifests from, and the stream-event CDN whose
//! tunnels are refused so the game falls back to its local playlist.
//! Everything else is tunneled untouched.

/// Host whose manifest requests are decrypted and rewritten.
pub const INTERCEPT_HOST: &str = "fortnite-vod.akamaized.net";

/// Host whose tunnels are refused outright.
pub const BLOCKED_HOST: &str = "cdn-0001.qstv.on.epicgames.com";

/// Registry value pointing WinINet's HTTPS traffic at the local listener.
pub const PROXY_SERVER_VALUE: &str = "https=127.0.0.1:18149";

/// How the proxy treats one upstream host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPolicy {
    /// Decrypt the tunnel and inspect requests.
    Intercept,
    /// Refuse the tunnel.
    Reject,
    /// Pass bytes through untouched.
    Tunnel,
}

/// Classifies a request authority (`host` or `host:port`).
pub fn host_policy(authority: &str) -> HostPolicy {
    let host = authority.split(':').next().unwrap_or(authority);

    if host.eq_ignore_ascii_case(INTERCEPT_HOST) {
        HostPolicy::Intercept
    } else if host.eq_ignore_ascii_case(BLOCKED_HOST) {
        HostPolicy::Reject
    } else {
        HostPolicy::Tunnel
    }
}
