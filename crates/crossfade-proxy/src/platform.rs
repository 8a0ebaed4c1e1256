//! System integration for the proxy.
//!
//! Handles:
//! - Pointing the WinINet proxy settings at the local listener
//! - Restoring whatever was configured before on exit
//! - CA certificate installation into the user trust store
//!
//! The operations sit behind the [`Platform`] trait so bootstrap and
//! shutdown logic can be exercised without touching the registry.
//! [`SystemPlatform`] is the only real implementation and is Windows-only;
//! other platforms get [`PlatformError::Unsupported`].

use std::path::Path;

use crate::error::PlatformError;
use crate::hosts::PROXY_SERVER_VALUE;

/// Registry key holding the WinINet proxy settings.
#[cfg(target_os = "windows")]
const INTERNET_SETTINGS_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Internet Settings";

/// Snapshot of the system proxy settings taken before we change them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyState {
    /// Whether a proxy was enabled.
    pub enabled: bool,
    /// The configured proxy server value, empty if none.
    pub server: String,
}

/// OS-facing trust-store and proxy-setting operations.
pub trait Platform {
    /// Adds the certificate file to the current user's root trust store.
    fn install_root_certificate(&self, cert_path: &Path) -> Result<(), PlatformError>;

    /// Reports whether that certificate is already trusted.
    fn is_root_certificate_installed(&self, cert_path: &Path) -> bool;

    /// Points the system proxy at the local listener.
    ///
    /// Returns the previous settings so they can be restored on shutdown.
    fn enable_system_proxy(&self) -> Result<ProxyState, PlatformError>;

    /// Restores the settings captured by [`Platform::enable_system_proxy`].
    fn restore_system_proxy(&self, previous: &ProxyState) -> Result<(), PlatformError>;

    /// Installs the CA certificate unless it is already trusted.
    fn ensure_root_certificate(&self, cert_path: &Path) -> Result<(), PlatformError> {
        if self.is_root_certificate_installed(cert_path) {
            tracing::debug!("CA certificate already trusted");
            return Ok(());
        }
        self.install_root_certificate(cert_path)
    }
}

/// Normalizes a captured proxy snapshot before it is saved for restore.
///
/// If the settings already point at our own listener (a previous run that
/// never cleaned up), the snapshot records "disabled" instead, so restoring
/// it does not resurrect a dead proxy entry.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn captured_state(enabled: bool, server: String) -> ProxyState {
    if enabled {
        if server == PROXY_SERVER_VALUE {
            return ProxyState::default();
        }
        tracing::warn!(existing = %server, "Replacing an existing system proxy");
    }

    ProxyState { enabled, server }
}

/// The real OS integration: WinINet registry settings and certutil.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

#[cfg(target_os = "windows")]
impl Platform for SystemPlatform {
    fn install_root_certificate(&self, cert_path: &Path) -> Result<(), PlatformError> {
        use std::os::windows::process::CommandExt;
        use std::process::Command;

        const CREATE_NO_WINDOW: u32 = 0x08000000;

        let cert_path_str = cert_path.to_string_lossy();

        let output = Command::new("certutil")
            .args(["-addstore", "-user", "Root", &cert_path_str])
            .creation_flags(CREATE_NO_WINDOW)
            .output()
            .map_err(|e| PlatformError::CertInstall(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::CertInstall(stderr.trim().to_string()));
        }

        tracing::info!("CA certificate installed to user trust store");

        Ok(())
    }

    fn is_root_certificate_installed(&self, _cert_path: &Path) -> bool {
        use std::os::windows::process::CommandExt;
        use std::process::Command;

        use crate::ca::CA_COMMON_NAME;

        const CREATE_NO_WINDOW: u32 = 0x08000000;

        let output = Command::new("certutil")
            .args(["-store", "-user", "Root"])
            .creation_flags(CREATE_NO_WINDOW)
            .output();

        match output {
            Ok(out) => String::from_utf8_lossy(&out.stdout).contains(CA_COMMON_NAME),
            Err(_) => false,
        }
    }

    fn enable_system_proxy(&self) -> Result<ProxyState, PlatformError> {
        use winreg::enums::*;
        use winreg::RegKey;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let key = hkcu
            .open_subkey_with_flags(INTERNET_SETTINGS_KEY, KEY_QUERY_VALUE | KEY_SET_VALUE)
            .map_err(|e| PlatformError::Registry(e.to_string()))?;

        let enabled: u32 = key.get_value("ProxyEnable").unwrap_or(0);
        let server: String = key.get_value("ProxyServer").unwrap_or_default();
        let previous = captured_state(enabled == 1, server);

        key.set_value("ProxyEnable", &1u32)
            .map_err(|e| PlatformError::Registry(e.to_string()))?;
        key.set_value("ProxyServer", &PROXY_SERVER_VALUE)
            .map_err(|e| PlatformError::Registry(e.to_string()))?;

        tracing::info!(server = PROXY_SERVER_VALUE, "System proxy enabled");

        Ok(previous)
    }

    fn restore_system_proxy(&self, previous: &ProxyState) -> Result<(), PlatformError> {
        use winreg::enums::*;
        use winreg::RegKey;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let key = hkcu
            .open_subkey_with_flags(INTERNET_SETTINGS_KEY, KEY_SET_VALUE)
            .map_err(|e| PlatformError::Registry(e.to_string()))?;

        key.set_value("ProxyEnable", &u32::from(previous.enabled))
            .map_err(|e| PlatformError::Registry(e.to_string()))?;

        if previous.server.is_empty() {
            // The value may not exist; nothing to restore then.
            let _ = key.delete_value("ProxyServer");
        } else {
            key.set_value("ProxyServer", &previous.server)
                .map_err(|e| PlatformError::Registry(e.to_string()))?;
        }

        tracing::info!(
            enabled = previous.enabled,
            server = %previous.server,
            "System proxy restored"
        );

        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl Platform for SystemPlatform {
    fn install_root_certificate(&self, _cert_path: &Path) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn is_root_certificate_installed(&self, _cert_path: &Path) -> bool {
        false
    }

    fn enable_system_proxy(&self) -> Result<ProxyState, PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn restore_system_proxy(&self, _previous: &ProxyState) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}
