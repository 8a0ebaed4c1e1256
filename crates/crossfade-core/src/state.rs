//! Shared client state.
//!
//! One [`ClientState`] aggregate holds everything the concurrent tasks agree
//! on: the cached user records, the bound-user pointer governing request
//! rewriting, and the current party. It lives behind an `Arc<Mutex<_>>` and
//! exposes only coarse operations; internal maps are never handed out by
//! reference, and no caller holds the lock across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::{Binding, Station, User};
use crate::party::{extract_event, Party};

/// Handle shared by the proxy, the log consumer, the sync engine and the
/// shell.
pub type SharedState = Arc<Mutex<ClientState>>;

/// A party transition produced by one log batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyChange {
    /// Party value before the batch.
    pub old: Party,
    /// Party value after the batch.
    pub new: Party,
}

/// The mutable aggregate all tasks share.
#[derive(Debug)]
pub struct ClientState {
    /// The local account id.
    local_id: String,
    /// Whose bindings govern rewriting right now.
    bound_user: String,
    /// Cached user records: the local account plus at most one leader.
    users: HashMap<String, User>,
    /// Current party as derived from the game log.
    party: Party,
}

impl ClientState {
    /// Creates state bound to the local account.
    pub fn new(local_id: impl Into<String>, local_user: User) -> Self {
        let local_id = local_id.into();
        let mut users = HashMap::new();
        users.insert(local_id.clone(), local_user);

        Self {
            bound_user: local_id.clone(),
            local_id,
            users,
            party: Party::default(),
        }
    }

    /// Wraps the state for sharing across tasks.
    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// The local account id.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// The account whose bindings currently govern rewriting.
    pub fn bound_user(&self) -> &str {
        &self.bound_user
    }

    /// Id of the cached leader record, when bound to one.
    pub fn cached_leader(&self) -> Option<&str> {
        (self.bound_user != self.local_id).then_some(self.bound_user.as_str())
    }

    #[cfg(test)]
    fn cached_user_count(&self) -> usize {
        self.users.len()
    }

    /// Snapshot of the current party.
    pub fn party(&self) -> Party {
        self.party.clone()
    }

    /// Finds the bound user's binding with the given binding identifier.
    ///
    /// This is the proxy's rewrite lookup: the id captured from a manifest
    /// path either names a binding here or the request passes through.
    pub fn binding_target(&self, binding_id: &str) -> Option<Binding> {
        self.users
            .get(&self.bound_user)
            .and_then(|user| user.bindings.values().find(|b| b.id == binding_id))
            .cloned()
    }

    /// Points rewriting back at the local account, evicting any cached
    /// leader record.
    pub fn rebind_local(&mut self) {
        if self.bound_user != self.local_id {
            self.users.remove(&self.bound_user);
            self.bound_user = self.local_id.clone();
        }
    }

    /// Caches a fetched leader record and points rewriting at it.
    ///
    /// At most one non-local record stays cached; a previously bound leader
    /// is evicted first.
    pub fn bind_leader(&mut self, leader_id: impl Into<String>, user: User) {
        let leader_id = leader_id.into();
        if self.bound_user != self.local_id && self.bound_user != leader_id {
            self.users.remove(&self.bound_user);
        }
        self.users.insert(leader_id.clone(), user);
        self.bound_user = leader_id;
    }

    /// Looks a station up in the local account.
    pub fn local_station(&self, id: &str) -> Option<Station> {
        self.users
            .get(&self.local_id)
            .and_then(|user| user.stations.get(id))
            .cloned()
    }

    /// Looks a binding up in the local account by in-game station id.
    pub fn local_binding(&self, in_game_id: &str) -> Option<Binding> {
        self.users
            .get(&self.local_id)
            .and_then(|user| user.bindings.get(in_game_id))
            .cloned()
    }

    /// Records a created or updated station in the local account.
    pub fn upsert_station(&mut self, station: Station) {
        if let Some(user) = self.users.get_mut(&self.local_id) {
            user.stations.insert(station.id.clone(), station);
        }
    }

    /// Removes a station from the local account along with every local
    /// binding that pointed at it.
    pub fn remove_station(&mut self, id: &str) {
        if let Some(user) = self.users.get_mut(&self.local_id) {
            user.stations.remove(id);
            let local_id = &self.local_id;
            user.bindings
                .retain(|_, b| !(b.station_user == *local_id && b.station_id == id));
        }
    }

    /// Records a created binding in the local account.
    pub fn upsert_binding(&mut self, binding: Binding) {
        if let Some(user) = self.users.get_mut(&self.local_id) {
            user.bindings.insert(binding.id.clone(), binding);
        }
    }

    /// Removes a binding from the local account by in-game station id.
    pub fn remove_binding(&mut self, in_game_id: &str) {
        if let Some(user) = self.users.get_mut(&self.local_id) {
            user.bindings.remove(in_game_id);
        }
    }

    /// Runs one log batch through the party state machine.
    ///
    /// Every line is mapped to an event (unmatched lines are skipped) and
    /// applied in order. Returns the (old, new) pair when the batch changed
    /// the party, so the caller can kick off a sync without holding the
    /// lock.
    pub fn apply_log_lines(&mut self, lines: &[String]) -> Option<PartyChange> {
        let old = self.party.clone();

        for line in lines {
            if let Some(event) = extract_event(line) {
                self.party.apply(&event);
            }
        }

        if old != self.party {
            Some(PartyChange {
                old,
                new: self.party.clone(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StationKind;

    const LOCAL_ID: &str = "9f86d081884c7d659a2feaa0c55ad015";
    const LEADER_ID: &str = "c0ffee81884c7d659a2feaa0c55ad015";

    fn station(id: &str) -> Station {
        Station {
            id: id.to_string(),
            kind: StationKind::Stream,
            source: String::new(),
        }
    }

    fn binding(in_game_id: &str, user: &str, station_id: &str) -> Binding {
        Binding {
            id: in_game_id.to_string(),
            station_user: user.to_string(),
            station_id: station_id.to_string(),
        }
    }

    fn local_state() -> ClientState {
        ClientState::new(LOCAL_ID, User::default())
    }

    #[test]
    fn starts_bound_to_local() {
        let state = local_state();
        assert_eq!(state.bound_user(), LOCAL_ID);
        assert_eq!(state.party(), Party::default());
    }

    #[test]
    fn binding_target_reads_bound_user() {
        let mut state = local_state();
        state.upsert_binding(binding("DGeVaWdcXtfpbAaP", LOCAL_ID, "lofi"));

        let hit = state.binding_target("DGeVaWdcXtfpbAaP").unwrap();
        assert_eq!(hit.station_id, "lofi");
        assert!(state.binding_target("unknown").is_none());
    }

    #[test]
    fn bind_leader_switches_rewrite_source() {
        let mut state = local_state();
        state.upsert_binding(binding("DGeVaWdcXtfpbAaP", LOCAL_ID, "mine"));

        let mut leader = User::default();
        leader.bindings.insert(
            "DGeVaWdcXtfpbAaP".to_string(),
            binding("DGeVaWdcXtfpbAaP", LEADER_ID, "theirs"),
        );
        state.bind_leader(LEADER_ID, leader);

        assert_eq!(state.bound_user(), LEADER_ID);
        let hit = state.binding_target("DGeVaWdcXtfpbAaP").unwrap();
        assert_eq!(hit.station_user, LEADER_ID);
        assert_eq!(hit.station_id, "theirs");
    }

    #[test]
    fn switching_leaders_evicts_previous() {
        let mut state = local_state();
        state.bind_leader(LEADER_ID, User::default());

        let other = "deadbe81884c7d659a2feaa0c55ad015";
        state.bind_leader(other, User::default());

        assert_eq!(state.bound_user(), other);
        assert_eq!(state.cached_leader(), Some(other));
        // Local record plus exactly one leader record.
        assert_eq!(state.cached_user_count(), 2);

        state.rebind_local();
        assert_eq!(state.bound_user(), LOCAL_ID);
        assert_eq!(state.cached_leader(), None);
        assert_eq!(state.cached_user_count(), 1);
    }

    #[test]
    fn rebind_local_evicts_cached_leader() {
        let mut state = local_state();
        state.upsert_binding(binding("GEviYjIhzVVzJufW", LOCAL_ID, "mine"));
        state.bind_leader(LEADER_ID, User::default());

        state.rebind_local();

        assert_eq!(state.bound_user(), LOCAL_ID);
        let hit = state.binding_target("GEviYjIhzVVzJufW").unwrap();
        assert_eq!(hit.station_id, "mine");
    }

    #[test]
    fn remove_station_drops_its_bindings() {
        let mut state = local_state();
        state.upsert_station(station("lofi"));
        state.upsert_binding(binding("BXrDueZkosvNvxtx", LOCAL_ID, "lofi"));
        state.upsert_binding(binding("PcQCHxHkBsmjSneR", LOCAL_ID, "other"));

        state.remove_station("lofi");

        assert!(state.local_station("lofi").is_none());
        assert!(state.local_binding("BXrDueZkosvNvxtx").is_none());
        assert!(state.local_binding("PcQCHxHkBsmjSneR").is_some());
    }

    #[test]
    fn apply_log_lines_reports_change_once() {
        let mut state = local_state();
        let lines = vec![format!(
            "LogOnlineParty: MCP: OnCreatePartyComplete: User=[{LOCAL_ID}] Party=[V2:a3bf4f1b2b0b822cd15d6c15b0f00a08]"
        )];

        let change = state.apply_log_lines(&lines).unwrap();
        assert_eq!(change.old, Party::default());
        assert_eq!(change.new.id, "V2:a3bf4f1b2b0b822cd15d6c15b0f00a08");
        assert!(change.new.leader);

        // Same lines again: same resulting state, no transition.
        assert!(state.apply_log_lines(&lines).is_none());
    }

    #[test]
    fn apply_log_lines_ignores_noise() {
        let mut state = local_state();
        let lines = vec![
            "LogInit: Display: Engine is initialized.".to_string(),
            String::new(),
        ];
        assert!(state.apply_log_lines(&lines).is_none());
    }
}
