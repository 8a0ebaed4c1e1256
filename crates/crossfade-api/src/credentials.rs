//! Persistent account credentials, keyed by backend root.
//!
//! Accounts are anonymous: the backend mints an `{id, secret}` pair on first
//! contact and the pair is stored locally, one per backend root, so pointing
//! the client at a different deployment registers a separate account instead
//! of leaking one backend's secret to another.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};

/// File name of the credential store inside the config directory.
const STORE_FILE: &str = "credentials.json";

/// An `{id, secret}` pair minted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

/// On-disk store mapping backend roots to credentials.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store in the per-user config directory.
    pub fn with_default_dir() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("com", "crossfade", "Crossfade").ok_or(ApiError::NoConfigDir)?;

        Ok(Self::new(proj_dirs.config_dir().join(STORE_FILE)))
    }

    /// The store's backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored credentials for a backend root, if any.
    pub fn load(&self, api_root: &str) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut entries = self.read_entries()?;
        Ok(entries.remove(api_root))
    }

    /// Stores credentials for a backend root, keeping other roots' entries.
    pub fn save(&self, api_root: &str, credentials: &Credentials) -> Result<()> {
        let mut entries = if self.path.exists() {
            self.read_entries()?
        } else {
            HashMap::new()
        };

        entries.insert(api_root.to_string(), credentials.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;

        Ok(())
    }

    fn read_entries(&self) -> Result<HashMap<String, Credentials>> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Loads the account for a backend root, registering a new one on first use.
pub async fn load_or_register(store: &CredentialStore, root: &str) -> Result<Credentials> {
    if let Some(credentials) = store.load(root)? {
        tracing::debug!(root, "Loaded stored account");
        return Ok(credentials);
    }

    let credentials = ApiClient::register(root).await?;
    store.save(root, &credentials)?;
    tracing::info!(root, id = %credentials.id, "Registered new account");

    Ok(credentials)
}
