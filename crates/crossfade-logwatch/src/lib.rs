//! Crossfade Logwatch - tails the game's log file.
//!
//! Wraps a filesystem watch around one append-mostly log file and turns it
//! into an ordered stream of line batches:
//!
//! ```text
//! FortniteGame.log → notify write events → TailCursor.read_new
//!                                               │
//!          Initial(lines) ─ once ◄──────────────┤
//!          Append(lines)  ─ per write ◄─────────┘
//! ```
//!
//! Truncation (log rotation) resets the cursor to zero; partial trailing
//! lines are withheld until terminated. Startup failures surface as one
//! [`LogEvent::Error`]; failures after startup just end the stream.

mod error;
mod tailer;

pub use error::{Result, TailerError};
pub use tailer::{LogEvent, LogTailer};
