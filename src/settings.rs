//! Settings registry: language definitions and the display position.
//!
//! An explicit service object owned by the caller and injected into the
//! editor panel and the content injector. Definitions live in their own
//! table with generated ids; the display position lives in the key-value
//! options table under `language_link_position`.

use crate::sanitize::{sanitize_text, sanitize_url};
use crate::store::{Database, DefinitionUpdate, LanguageDefinition, ReplaceOutcome};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Option name for the configured display position.
pub const POSITION_OPTION: &str = "language_link_position";

/// Where the rendered link block is spliced into post content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPosition {
    Below,
    Before,
    Both,
}

impl DisplayPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayPosition::Below => "below",
            DisplayPosition::Before => "before",
            DisplayPosition::Both => "both",
        }
    }

    /// Parse a stored or submitted value. Anything unrecognized coerces to
    /// the default rather than failing.
    pub fn parse_or_default(value: &str) -> DisplayPosition {
        match value {
            "before" => DisplayPosition::Before,
            "both" => DisplayPosition::Both,
            _ => DisplayPosition::Below,
        }
    }
}

impl Default for DisplayPosition {
    fn default() -> Self {
        DisplayPosition::Below
    }
}

/// Result of saving the definition list: what is now configured and how many
/// link rows were purged along with removed definitions.
#[derive(Debug, Clone)]
pub struct SavedDefinitions {
    pub definitions: Vec<LanguageDefinition>,
    pub removed: Vec<LanguageDefinition>,
}

#[derive(Clone)]
pub struct SettingsService {
    db: Database,
}

impl SettingsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The ordered definition list. An empty registry is seeded with the
    /// default pair on first access, and the seed is persisted.
    pub fn definitions(&self) -> Result<Vec<LanguageDefinition>> {
        let definitions = self.db.list_definitions()?;
        if !definitions.is_empty() {
            return Ok(definitions);
        }

        let ReplaceOutcome { definitions, .. } =
            self.db.replace_definitions(&default_definitions())?;
        info!("seeded {} default language definitions", definitions.len());
        Ok(definitions)
    }

    /// Sanitize and persist the submitted definition list. Entries whose
    /// label is blank after trimming are dropped whole, icon included, so a
    /// removed language never leaves a stray icon behind. Link rows of
    /// removed definitions are purged in the same transaction.
    pub fn save_definitions(&self, entries: &[DefinitionUpdate]) -> Result<SavedDefinitions> {
        let cleaned: Vec<DefinitionUpdate> = entries
            .iter()
            .filter_map(|entry| {
                let label = sanitize_text(&entry.label);
                if label.is_empty() {
                    return None;
                }
                Some(DefinitionUpdate {
                    id: entry.id,
                    label,
                    icon_url: sanitize_url(&entry.icon_url),
                })
            })
            .collect();

        let ReplaceOutcome {
            definitions,
            removed,
        } = self.db.replace_definitions(&cleaned)?;

        if !removed.is_empty() {
            info!(
                "removed {} language definition(s), purging their stored links",
                removed.len()
            );
        }

        Ok(SavedDefinitions {
            definitions,
            removed,
        })
    }

    /// The configured display position; missing or invalid values fall back
    /// to the default.
    pub fn display_position(&self) -> Result<DisplayPosition> {
        let stored = self.db.option_get(POSITION_OPTION)?;
        Ok(stored
            .map(|value| DisplayPosition::parse_or_default(&value))
            .unwrap_or_default())
    }

    /// Persist the display position. Unrecognized input coerces to the
    /// default instead of being rejected.
    pub fn set_display_position(&self, value: &str) -> Result<DisplayPosition> {
        let position = DisplayPosition::parse_or_default(value);
        self.db.option_set(POSITION_OPTION, position.as_str())?;
        Ok(position)
    }
}

/// The initial registry contents, matching the stock install.
fn default_definitions() -> Vec<DefinitionUpdate> {
    vec![
        DefinitionUpdate {
            id: None,
            label: "English Link".to_string(),
            icon_url: "https://mrpsychologist.com/up/uk.svg".to_string(),
        },
        DefinitionUpdate {
            id: None,
            label: "Persian Link".to_string(),
            icon_url: "https://mrpsychologist.com/up/ir.svg".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test_settings.db");
        let db = Database::open(db_path.to_str().unwrap()).expect("Failed to create database");
        (SettingsService::new(db), temp_dir)
    }

    fn entry(label: &str, icon_url: &str) -> DefinitionUpdate {
        DefinitionUpdate {
            id: None,
            label: label.to_string(),
            icon_url: icon_url.to_string(),
        }
    }

    // ==================== Default Seeding Tests ====================

    #[test]
    fn test_definitions_seeds_defaults_on_first_access() {
        let (service, _temp_dir) = create_test_service();

        let definitions = service.definitions().expect("definitions");

        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].label, "English Link");
        assert_eq!(definitions[1].label, "Persian Link");
    }

    #[test]
    fn test_default_seed_is_persisted() {
        let (service, _temp_dir) = create_test_service();

        let first = service.definitions().expect("first access");
        let second = service.definitions().expect("second access");

        // Same rows, same ids: the seed happened once
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_seed_after_explicit_save() {
        let (service, _temp_dir) = create_test_service();

        service
            .save_definitions(&[entry("French Link", "fr.svg")])
            .expect("save");

        let definitions = service.definitions().expect("definitions");
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].label, "French Link");
    }

    // ==================== Save Tests ====================

    #[test]
    fn test_save_then_read_returns_pairs_in_order() {
        let (service, _temp_dir) = create_test_service();

        service
            .save_definitions(&[
                entry("English Link", "https://cdn.example.com/uk.svg"),
                entry("Persian Link", "https://cdn.example.com/ir.svg"),
                entry("French Link", "https://cdn.example.com/fr.svg"),
            ])
            .expect("save");

        let definitions = service.definitions().expect("definitions");
        let pairs: Vec<(&str, &str)> = definitions
            .iter()
            .map(|d| (d.label.as_str(), d.icon_url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("English Link", "https://cdn.example.com/uk.svg"),
                ("Persian Link", "https://cdn.example.com/ir.svg"),
                ("French Link", "https://cdn.example.com/fr.svg"),
            ]
        );
    }

    #[test]
    fn test_blank_label_drops_entry_with_its_icon() {
        let (service, _temp_dir) = create_test_service();

        service
            .save_definitions(&[
                entry("English Link", "uk.svg"),
                entry("   ", "orphan.svg"),
                entry("Persian Link", "ir.svg"),
            ])
            .expect("save");

        let definitions = service.definitions().expect("definitions");
        assert_eq!(definitions.len(), 2);
        // The icon of the blank entry disappears with it; the following
        // definition keeps its own icon
        assert_eq!(definitions[1].label, "Persian Link");
        assert_eq!(definitions[1].icon_url, "ir.svg");
    }

    #[test]
    fn test_save_sanitizes_label_markup() {
        let (service, _temp_dir) = create_test_service();

        service
            .save_definitions(&[entry("  <b>English</b> Link ", "uk.svg")])
            .expect("save");

        let definitions = service.definitions().expect("definitions");
        assert_eq!(definitions[0].label, "English Link");
    }

    #[test]
    fn test_save_keeps_malformed_icon_url_as_is() {
        let (service, _temp_dir) = create_test_service();

        // Not a URL at all, but sanitization is not validation
        service
            .save_definitions(&[entry("English Link", "not a url at all")])
            .expect("save");

        let definitions = service.definitions().expect("definitions");
        assert_eq!(definitions[0].icon_url, "notaurlatall");
    }

    #[test]
    fn test_save_reports_removed_definitions() {
        let (service, _temp_dir) = create_test_service();

        let saved = service
            .save_definitions(&[entry("English Link", "uk.svg"), entry("Persian Link", "ir.svg")])
            .expect("save");
        let english_id = saved.definitions[0].id;

        let resaved = service
            .save_definitions(&[DefinitionUpdate {
                id: Some(saved.definitions[1].id),
                label: "Persian Link".to_string(),
                icon_url: "ir.svg".to_string(),
            }])
            .expect("resave");

        assert_eq!(resaved.removed.len(), 1);
        assert_eq!(resaved.removed[0].id, english_id);
    }

    // ==================== Display Position Tests ====================

    #[test]
    fn test_display_position_defaults_to_below() {
        let (service, _temp_dir) = create_test_service();

        assert_eq!(
            service.display_position().expect("position"),
            DisplayPosition::Below
        );
    }

    #[test]
    fn test_set_display_position_roundtrip() {
        let (service, _temp_dir) = create_test_service();

        service.set_display_position("before").expect("set");
        assert_eq!(
            service.display_position().expect("position"),
            DisplayPosition::Before
        );

        service.set_display_position("both").expect("set");
        assert_eq!(
            service.display_position().expect("position"),
            DisplayPosition::Both
        );
    }

    #[test]
    fn test_set_display_position_coerces_invalid_input() {
        let (service, _temp_dir) = create_test_service();

        service.set_display_position("both").expect("set");
        let coerced = service.set_display_position("sideways").expect("set");

        assert_eq!(coerced, DisplayPosition::Below);
        assert_eq!(
            service.display_position().expect("position"),
            DisplayPosition::Below
        );
    }

    #[test]
    fn test_display_position_coerces_invalid_stored_value() {
        // Simulate a corrupted stored option
        let temp_dir = TempDir::new().expect("temp dir");
        let db_path = temp_dir.path().join("corrupt.db");
        let db = Database::open(db_path.to_str().unwrap()).expect("db");
        db.option_set(POSITION_OPTION, "garbage").expect("set");
        let service = SettingsService::new(db);

        assert_eq!(
            service.display_position().expect("position"),
            DisplayPosition::Below
        );
    }

    #[test]
    fn test_position_serde_lowercase() {
        let json = serde_json::to_string(&DisplayPosition::Before).expect("serialize");
        assert_eq!(json, "\"before\"");

        let parsed: DisplayPosition = serde_json::from_str("\"both\"").expect("deserialize");
        assert_eq!(parsed, DisplayPosition::Both);
    }
}
