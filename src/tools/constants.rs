//! Physics constants lookup — a static table loaded once at startup.
//!
//! A missing or unreadable data file yields an empty table rather than a
//! startup failure; lookups against an empty table simply report the key as
//! unknown with no alternatives.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One table entry, as stored in `data/physics_constants.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantEntry {
    pub description: String,
    pub symbol: String,
    pub value: f64,
    pub unit: String,
}

/// Short listing form used when enumerating the table.
#[derive(Debug, Clone, Serialize)]
pub struct ConstantSummary {
    pub description: String,
    pub symbol: String,
}

/// Result envelope for one lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ConstantLookup {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstantEntry>,
    /// Full enumeration, returned when no key was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_constants: Option<BTreeMap<String, ConstantSummary>>,
    /// Valid keys, returned when the requested key is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PhysicsConstants {
    constants: BTreeMap<String, ConstantEntry>,
}

impl PhysicsConstants {
    /// Load the table from `path`. Absence of the file is not an error.
    pub fn load(path: &Path) -> Self {
        let constants = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, ConstantEntry>>(&text) {
                Ok(table) => table,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "constants file unparseable, starting with empty table");
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "constants file unavailable, starting with empty table");
                BTreeMap::new()
            }
        };
        info!(entries = constants.len(), "physics constants loaded");
        Self { constants }
    }

    /// Build a table directly from entries — used by tests and embedders.
    pub fn from_entries<I: IntoIterator<Item = (String, ConstantEntry)>>(entries: I) -> Self {
        Self { constants: entries.into_iter().collect() }
    }

    /// Look up a constant by key, or enumerate the table when `name` is `None`.
    pub fn execute(&self, name: Option<&str>) -> ConstantLookup {
        match name {
            None => ConstantLookup {
                success: true,
                constant: None,
                available_constants: Some(
                    self.constants
                        .iter()
                        .map(|(key, entry)| {
                            (
                                key.clone(),
                                ConstantSummary {
                                    description: entry.description.clone(),
                                    symbol: entry.symbol.clone(),
                                },
                            )
                        })
                        .collect(),
                ),
                valid_keys: None,
                error: None,
            },
            Some(key) => match self.constants.get(key) {
                Some(entry) => ConstantLookup {
                    success: true,
                    constant: Some(entry.clone()),
                    available_constants: None,
                    valid_keys: None,
                    error: None,
                },
                None => ConstantLookup {
                    success: false,
                    constant: None,
                    available_constants: None,
                    valid_keys: Some(self.constants.keys().cloned().collect()),
                    error: Some(format!("constant '{key}' not found")),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PhysicsConstants {
        PhysicsConstants::from_entries([
            (
                "c".to_string(),
                ConstantEntry {
                    description: "Speed of light in vacuum".to_string(),
                    symbol: "c".to_string(),
                    value: 299_792_458.0,
                    unit: "m/s".to_string(),
                },
            ),
            (
                "G".to_string(),
                ConstantEntry {
                    description: "Gravitational constant".to_string(),
                    symbol: "G".to_string(),
                    value: 6.674e-11,
                    unit: "m^3/(kg s^2)".to_string(),
                },
            ),
        ])
    }

    #[test]
    fn known_key_returns_entry() {
        let lookup = table().execute(Some("c"));
        assert!(lookup.success);
        assert_eq!(lookup.constant.unwrap().value, 299_792_458.0);
        assert!(lookup.valid_keys.is_none());
    }

    #[test]
    fn unknown_key_lists_every_valid_key() {
        let lookup = table().execute(Some("speed"));
        assert!(!lookup.success);
        assert!(lookup.error.unwrap().contains("speed"));
        assert_eq!(lookup.valid_keys.unwrap(), vec!["G".to_string(), "c".to_string()]);
    }

    #[test]
    fn no_key_enumerates_descriptions_and_symbols() {
        let lookup = table().execute(None);
        assert!(lookup.success);
        let listing = lookup.available_constants.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing["c"].description, "Speed of light in vacuum");
        assert_eq!(listing["G"].symbol, "G");
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let table = PhysicsConstants::load(Path::new("/nonexistent/constants.json"));
        let lookup = table.execute(Some("c"));
        assert!(!lookup.success);
        assert_eq!(lookup.valid_keys.unwrap().len(), 0);
    }
}
