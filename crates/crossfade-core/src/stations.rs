//! The game's built-in radio stations.
//!
//! These ids are baked into the game client; the manifest path of every
//! station request starts with one of them. Bindings are keyed by these ids.

/// One of the game's built-in radio stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InGameStation {
    /// Opaque id used in manifest request paths.
    pub id: &'static str,
    /// Display name shown in the game UI.
    pub name: &'static str,
}

/// Every in-game station the current season ships with.
pub const IN_GAME_STATIONS: &[InGameStation] = &[
    InGameStation { id: "saeOLZXrNKpBEPGRBQ", name: "Icon Radio" },
    InGameStation { id: "hgsuJcchvKuaEzzijr", name: "Rock & Royale" },
    InGameStation { id: "VlYSRdFWOKyyhNNNgr", name: "Radio Underground" },
    InGameStation { id: "DGeVaWdcXtfpbAaP", name: "Party Royale" },
    InGameStation { id: "GEviYjIhzVVzJufW", name: "Radio Yonder" },
    InGameStation { id: "BXrDueZkosvNvxtx", name: "Beat Box" },
    InGameStation { id: "PcQCHxHkBsmjSneR", name: "Power Play" },
];

/// Looks an in-game station up by its display name (exact match).
pub fn station_by_name(name: &str) -> Option<&'static InGameStation> {
    IN_GAME_STATIONS.iter().find(|station| station.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let station = station_by_name("Party Royale").unwrap();
        assert_eq!(station.id, "DGeVaWdcXtfpbAaP");
    }

    #[test]
    fn lookup_is_exact() {
        assert!(station_by_name("party royale").is_none());
        assert!(station_by_name("Nope FM").is_none());
    }

    #[test]
    fn ids_are_unique() {
        for (i, a) in IN_GAME_STATIONS.iter().enumerate() {
            for b in &IN_GAME_STATIONS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
