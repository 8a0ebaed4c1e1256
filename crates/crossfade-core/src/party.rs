//! Party lifecycle tracking driven by the game's log output.
//!
//! The game logs every party and matchmaking transition. Each line is matched
//! against a fixed set of patterns and mapped to a typed [`PartyEvent`];
//! applying an event mutates the single current [`Party`] value. Line-to-event
//! mapping is a pure function so it can be tested apart from the mutation
//! step.
//!
//! Leadership is derived from how the game prints the leader id: the local
//! player's own id appears in full, while other players' ids are redacted to
//! `xxxxx...xxxxx`. A full id therefore means "we lead now". This is upstream
//! log behavior and must not be normalized away.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substring of the final line of a log left behind by a closed game.
///
/// When the initial read of the log ends with this marker the game is not
/// running and the batch describes a previous session.
pub const LOG_CLOSED_MARKER: &str = "Log file closed, ";

/// Literal line logged when the player returns to the main menu.
const MAIN_MENU_MARKER: &str = "LogOnlineGame: FortPC::ReturnToMainMenu()";

/// Elision marker inside a redacted account id.
const REDACTION_MARKER: &str = "...";

static PARTY_CREATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"LogOnlineParty: MCP: OnCreatePartyComplete: User=\[([0-9a-f]{32})] Party=\[(V2:[0-9a-f]{32})]",
    )
    .expect("Invalid party create pattern")
});

static PARTY_JOINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"LogOnlineParty: MCP: JoinParty: User=\[([0-9a-f]{32})] .+PartyId\((V2:[0-9a-f]{32})\)")
        .expect("Invalid party join pattern")
});

static NEW_LEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"LogOnlineParty: MCP: OnPartyNewLeader: User=\[([0-9a-f]{32})] Party=\[(V2:[0-9a-f]{32})] NewLeader=\[([0-9a-f]{32}|[0-9a-f]{5}\.\.\.[0-9a-f]{5})]",
    )
    .expect("Invalid new leader pattern")
});

static MEMBER_PROMOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"LogParty: Verbose: Member \[MCP:([0-9a-f]{32}|[0-9a-f]{5}\.\.\.[0-9a-f]{5}), Party \((V2:[0-9a-f]{32})\)] promoted to party leader",
    )
    .expect("Invalid member promoted pattern")
});

static SESSION_ASSIGNED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"LogMatchmakingServiceClient: Verbose: HandleWebSocketMessage - Received message: "\{"payload":\{"matchId":"([0-9a-f]{32})","sessionId":"([0-9a-f]{32})","joinDelaySec":\d+\},"name":"Play"\}""#,
    )
    .expect("Invalid session pattern")
});

/// The local model of the player's current multiplayer session.
///
/// Serializes to the backend's party wire shape. Equality is structural over
/// all four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party identifier (`V2:` prefixed).
    pub id: String,
    /// Current match identifier, empty outside a match.
    #[serde(rename = "match")]
    pub match_id: String,
    /// Current matchmaking session identifier, empty outside a match.
    pub session: String,
    /// Whether the local account leads the party.
    pub leader: bool,
}

/// A session-lifecycle fact extracted from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyEvent {
    /// Player returned to the main menu; the match is over.
    MainMenu,
    /// The local player created a party.
    PartyCreated { user: String, party: String },
    /// The local player joined an existing party.
    PartyJoined { user: String, party: String },
    /// The party announced a new leader (id possibly redacted).
    NewLeader { party: String, leader: String },
    /// A member was promoted to leader (id possibly redacted).
    MemberPromoted { member: String, party: String },
    /// Matchmaking assigned a match and session.
    SessionAssigned { match_id: String, session: String },
}

/// Maps a log line to a [`PartyEvent`], if any pattern matches.
///
/// Patterns are tried in a fixed order and the first match wins. Lines that
/// match nothing are ignored by the caller.
pub fn extract_event(line: &str) -> Option<PartyEvent> {
    if line.contains(MAIN_MENU_MARKER) {
        return Some(PartyEvent::MainMenu);
    }

    if let Some(caps) = PARTY_CREATED.captures(line) {
        return Some(PartyEvent::PartyCreated {
            user: caps[1].to_string(),
            party: caps[2].to_string(),
        });
    }

    if let Some(caps) = PARTY_JOINED.captures(line) {
        return Some(PartyEvent::PartyJoined {
            user: caps[1].to_string(),
            party: caps[2].to_string(),
        });
    }

    if let Some(caps) = NEW_LEADER.captures(line) {
        return Some(PartyEvent::NewLeader {
            party: caps[2].to_string(),
            leader: caps[3].to_string(),
        });
    }

    if let Some(caps) = MEMBER_PROMOTED.captures(line) {
        return Some(PartyEvent::MemberPromoted {
            member: caps[1].to_string(),
            party: caps[2].to_string(),
        });
    }

    if let Some(caps) = SESSION_ASSIGNED.captures(line) {
        return Some(PartyEvent::SessionAssigned {
            match_id: caps[1].to_string(),
            session: caps[2].to_string(),
        });
    }

    None
}

/// True when an account id was elided by the game's log redaction.
fn is_redacted(id: &str) -> bool {
    id.contains(REDACTION_MARKER)
}

impl Party {
    /// Applies one extracted event to the party state.
    pub fn apply(&mut self, event: &PartyEvent) {
        match event {
            PartyEvent::MainMenu => {
                self.match_id.clear();
                self.session.clear();
                tracing::debug!("Cleared match info after return to main menu");
            }
            PartyEvent::PartyCreated { party, .. } => {
                self.id = party.clone();
                self.leader = true;
                tracing::debug!(party = %self.id, "Created party");
            }
            PartyEvent::PartyJoined { party, .. } => {
                self.id = party.clone();
                self.leader = false;
                tracing::debug!(party = %self.id, "Joined party");
            }
            PartyEvent::NewLeader { party, leader } => {
                self.id = party.clone();
                self.leader = !is_redacted(leader);
                tracing::debug!(party = %self.id, leader = self.leader, "Party leader changed");
            }
            PartyEvent::MemberPromoted { member, party } => {
                self.id = party.clone();
                self.leader = !is_redacted(member);
                tracing::debug!(party = %self.id, leader = self.leader, "Party member promoted");
            }
            PartyEvent::SessionAssigned { match_id, session } => {
                self.match_id = match_id.clone();
                self.session = session.clone();
                tracing::debug!(match_id = %self.match_id, session = %self.session, "Joined match");
            }
        }
    }
}
