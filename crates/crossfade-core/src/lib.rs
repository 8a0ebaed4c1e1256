//! Crossfade Core - domain model and party state tracking.
//!
//! This crate holds everything the other Crossfade crates agree on: the
//! backend wire model (users, stations, bindings), the party state machine
//! fed by the game's log, the fixed table of in-game stations, and the
//! shared client-state aggregate.
//!
//! ## Architecture
//!
//! ```text
//! Log lines → extract_event → PartyEvent → Party::apply
//!                                              │
//!            ClientState.apply_log_lines ──────┘
//!                     │
//!                     ▼
//!             PartyChange (old, new) → sync engine
//! ```

mod model;
mod party;
mod state;
pub mod stations;

pub use model::{Binding, Station, StationKind, User};
pub use party::{extract_event, Party, PartyEvent, LOG_CLOSED_MARKER};
pub use state::{ClientState, PartyChange, SharedState};
pub use stations::{station_by_name, InGameStation, IN_GAME_STATIONS};
