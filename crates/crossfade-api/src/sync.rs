//! Push-on-change party synchronization.
//!
//! When the party derived from the game log crosses a match boundary, the
//! new value is pushed to the backend, which answers with the party's
//! authoritative leader (or disables the party outright). The bound-user
//! pointer then follows the answer: a remote leader's record is fetched and
//! bound, anything else rebinds the local account. Transient push failures
//! are retried a fixed number of times with a short delay.

use std::time::Duration;

use crossfade_core::{Party, PartyChange, SharedState};

use crate::client::ApiClient;

/// How many times one party value is offered to the backend.
const SYNC_ATTEMPTS: u32 = 4;

/// Pause between push attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Drives party pushes and the resulting binding changes.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    api: ApiClient,
    state: SharedState,
    retry_delay: Duration,
}

impl SyncEngine {
    pub fn new(api: ApiClient, state: SharedState) -> Self {
        Self {
            api,
            state,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the pause between push attempts (shortened in tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Reacts to one party transition.
    ///
    /// Only match transitions reach the backend; leadership or party-id
    /// churn between matches stays local. The push sends the post-batch
    /// party value, so a retry always offers the freshest state this
    /// transition produced.
    pub async fn handle_change(&self, change: PartyChange) {
        if change.old.match_id == change.new.match_id {
            tracing::debug!("Party changed without a match transition, not syncing");
            return;
        }

        if let Some(answer) = self.push_with_retry(&change.new).await {
            self.reconcile(answer).await;
        }
    }

    /// Offers the party to the backend until it answers or attempts run out.
    ///
    /// Returns `None` when every attempt failed; the outer `Option` from a
    /// successful push carries the backend's leader answer (`None` for a
    /// disabled party).
    async fn push_with_retry(&self, party: &Party) -> Option<Option<String>> {
        for attempt in 1..=SYNC_ATTEMPTS {
            match self.api.set_party(party).await {
                Ok(answer) => {
                    match answer.as_deref() {
                        Some(leader) if !leader.is_empty() => {
                            tracing::info!(leader, "Updated backend party")
                        }
                        _ => tracing::info!("Backend party disabled"),
                    }
                    return Some(answer);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "Failed to push party");
                    if attempt < SYNC_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!("Party not pushed after {SYNC_ATTEMPTS} attempts");
        None
    }

    /// Points the bound-user pointer at whoever the backend named leader.
    ///
    /// A failed leader fetch leaves the previous binding in place rather
    /// than falling back to the local account.
    async fn reconcile(&self, answer: Option<String>) {
        let local_id = self.state.lock().local_id().to_string();

        match answer {
            Some(leader) if !leader.is_empty() && leader != local_id => {
                tracing::info!(leader = %leader, "Fetching party leader");
                match self.api.get_user(&leader).await {
                    Ok(user) => self.state.lock().bind_leader(leader, user),
                    Err(err) => tracing::warn!(error = %err, "Failed to fetch party leader"),
                }
            }
            _ => self.state.lock().rebind_local(),
        }
    }
}
