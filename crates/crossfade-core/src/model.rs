//! Backend wire model: users, stations, bindings.
//!
//! Field names are pinned to the backend's JSON contract; a `Station` is one
//! user-hosted audio source, a `Binding` points an in-game station at a
//! (user, station) pair.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a station sources its audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    /// Plays a fixed folder of files; `play` replaces the source.
    Static,
    /// Live queue; `play` appends to it.
    Stream,
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationKind::Static => write!(f, "static"),
            StationKind::Stream => write!(f, "stream"),
        }
    }
}

impl FromStr for StationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(StationKind::Static),
            "stream" => Ok(StationKind::Stream),
            _ => Err(()),
        }
    }
}

/// A user-hosted audio station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier, unique per owning user.
    pub id: String,
    /// Source kind.
    #[serde(rename = "type")]
    pub kind: StationKind,
    /// Source folder (static) or empty (stream).
    #[serde(default)]
    pub source: String,
}

/// Points an in-game station at a user's hosted station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// In-game station identifier this binding covers.
    pub id: String,
    /// Account owning the target station.
    pub station_user: String,
    /// Target station identifier under that account.
    pub station_id: String,
}

/// A backend account: its stations and its in-game bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Station id → station.
    #[serde(default)]
    pub stations: HashMap<String, Station>,
    /// In-game station id → binding.
    #[serde(default)]
    pub bindings: HashMap<String, Binding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_kind_round_trips_through_str() {
        assert_eq!("static".parse::<StationKind>(), Ok(StationKind::Static));
        assert_eq!("stream".parse::<StationKind>(), Ok(StationKind::Stream));
        assert!("live".parse::<StationKind>().is_err());
        assert_eq!(StationKind::Static.to_string(), "static");
    }

    #[test]
    fn station_serializes_type_field() {
        let station = Station {
            id: "lofi".to_string(),
            kind: StationKind::Stream,
            source: String::new(),
        };
        let json = serde_json::to_value(&station).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "lofi", "type": "stream", "source": ""})
        );
    }

    #[test]
    fn binding_uses_snake_case_wire_names() {
        let binding = Binding {
            id: "DGeVaWdcXtfpbAaP".to_string(),
            station_user: "user-1".to_string(),
            station_id: "lofi".to_string(),
        };
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["station_user"], "user-1");
        assert_eq!(json["station_id"], "lofi");
    }

    #[test]
    fn user_tolerates_missing_maps() {
        let user: User = serde_json::from_str("{}").unwrap();
        assert!(user.stations.is_empty());
        assert!(user.bindings.is_empty());
    }
}
