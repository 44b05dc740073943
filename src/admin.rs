//! Settings UI: the admin form for language definitions and the display
//! position.
//!
//! Saving diffs the submitted definition list against what is stored;
//! definitions that disappear take their per-post link rows with them.

use crate::html::escape_attr;
use crate::settings::{DisplayPosition, SettingsService};
use crate::store::{DefinitionUpdate, LanguageDefinition};
use crate::token::{TokenService, SETTINGS_ACTION};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One definition row of the settings form.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub label: String,
    #[serde(default)]
    pub icon_url: String,
}

/// The submitted settings form.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSubmission {
    pub token: String,
    #[serde(default)]
    pub definitions: Vec<DefinitionEntry>,
    #[serde(default)]
    pub position: Option<String>,
}

/// Host-supplied facts about the save request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminContext {
    pub can_manage: bool,
}

/// What a settings save did. `Skipped` is the silent no-op of a failed guard.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettingsOutcome {
    Skipped,
    Saved {
        definitions: Vec<LanguageDefinition>,
        removed: usize,
        position: DisplayPosition,
    },
}

#[derive(Clone)]
pub struct SettingsAdmin {
    settings: SettingsService,
    tokens: TokenService,
}

impl SettingsAdmin {
    pub fn new(settings: SettingsService, tokens: TokenService) -> Self {
        Self { settings, tokens }
    }

    /// The settings form: one section per definition (hidden id, label
    /// input, icon input hinting at the host's media picker), the position
    /// selector, and the anti-forgery token.
    pub fn render(&self) -> Result<String> {
        let definitions = self.settings.definitions()?;
        let position = self.settings.display_position()?;

        let mut html = String::from("<form method=\"post\" id=\"language-links-form\">");
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"language_links_settings_token\" value=\"{}\" />",
            escape_attr(&self.tokens.issue(SETTINGS_ACTION))
        ));

        html.push_str("<div id=\"language-links-container\">");
        for (index, definition) in definitions.iter().enumerate() {
            html.push_str(&format!(
                "<div class=\"language-link\"><h2>Language {n}</h2>\
                 <input type=\"hidden\" name=\"language_id[]\" value=\"{id}\" />\
                 <label>Language Field Label:</label>\
                 <input type=\"text\" name=\"language_label[]\" value=\"{label}\" />\
                 <label>Language Icon (SVG URL):</label>\
                 <input type=\"text\" name=\"language_icon[]\" class=\"language_icon\" \
                 value=\"{icon}\" data-media-picker=\"image/svg+xml\" />\
                 </div>",
                n = index + 1,
                id = definition.id,
                label = escape_attr(&definition.label),
                icon = escape_attr(&definition.icon_url),
            ));
        }
        html.push_str("</div>");

        html.push_str("<select name=\"language_link_position\">");
        for option in [
            DisplayPosition::Below,
            DisplayPosition::Before,
            DisplayPosition::Both,
        ] {
            let selected = if option == position { " selected" } else { "" };
            html.push_str(&format!(
                "<option value=\"{value}\"{selected}>{value}</option>",
                value = option.as_str(),
            ));
        }
        html.push_str("</select>");

        html.push_str("</form>");
        Ok(html)
    }

    /// Handle a settings form submission: token and manage-permission guards
    /// first, then definitions (with link purge) and position.
    pub fn handle_save(
        &self,
        submission: &SettingsSubmission,
        ctx: &AdminContext,
    ) -> Result<SettingsOutcome> {
        if !self.tokens.verify(SETTINGS_ACTION, &submission.token) {
            debug!("settings save skipped: token check failed");
            return Ok(SettingsOutcome::Skipped);
        }
        if !ctx.can_manage {
            debug!("settings save skipped: no manage permission");
            return Ok(SettingsOutcome::Skipped);
        }

        let entries: Vec<DefinitionUpdate> = submission
            .definitions
            .iter()
            .map(|entry| DefinitionUpdate {
                id: entry.id,
                label: entry.label.clone(),
                icon_url: entry.icon_url.clone(),
            })
            .collect();
        let saved = self.settings.save_definitions(&entries)?;

        let position = match submission.position.as_deref() {
            Some(value) => self.settings.set_display_position(value)?,
            None => self.settings.display_position()?,
        };

        Ok(SettingsOutcome::Saved {
            removed: saved.removed.len(),
            definitions: saved.definitions,
            position,
        })
    }
}
