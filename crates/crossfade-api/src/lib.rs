//! Crossfade API - backend client, account storage and party sync.
//!
//! This crate owns every conversation with the station backend: the typed
//! REST client, the on-disk credential store that gives each backend root
//! its own anonymous account, and the sync engine that pushes party
//! transitions and rebinds the rewrite source to the party leader.
//!
//! ## Features
//!
//! - Basic-auth REST client over the backend's user/station/binding surface
//! - First-run account registration with per-root credential persistence
//! - Party pushes on match transitions, retried on transient failures
//! - Leader reconciliation: fetch-and-bind the backend's leader answer
//!
//! ## Architecture
//!
//! ```text
//! Party transition → match boundary? ──no──▶ (stays local)
//!        │ yes
//!        ▼
//!   POST /users/@me/party  ──▶ 204: disabled ──▶ rebind local account
//!        │
//!        ▼
//!   200 {leader} ──▶ leader == us? ──yes──▶ rebind local account
//!        │ no
//!        ▼
//!   GET /users/{leader} ──▶ bind leader's stations and bindings
//! ```

mod client;
mod credentials;
mod error;
mod sync;

pub use client::ApiClient;
pub use credentials::{load_or_register, CredentialStore, Credentials};
pub use error::{ApiError, Result};
pub use sync::SyncEngine;
