//! Post editor panel: the per-post form for entering language link URLs.
//!
//! Renders one input per configured definition and handles the host's
//! post-save event. Failed token or permission checks and autosave cycles
//! are silent no-ops, indistinguishable from "nothing submitted".

use crate::html::{escape_attr, escape_html};
use crate::sanitize::sanitize_url;
use crate::settings::SettingsService;
use crate::store::Database;
use crate::token::{TokenService, EDITOR_ACTION};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// The submitted per-post form: the anti-forgery token plus a map of
/// definition id to URL.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorSubmission {
    pub token: String,
    #[serde(default)]
    pub links: BTreeMap<i64, String>,
}

/// Host-supplied facts about the save request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveContext {
    pub can_edit: bool,
    pub is_autosave: bool,
}

/// What a save did. `Skipped` is the silent no-op of a failed guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Skipped,
    Saved { updated: usize, cleared: usize },
}

#[derive(Clone)]
pub struct PostEditorPanel {
    settings: SettingsService,
    store: Database,
    tokens: TokenService,
}

impl PostEditorPanel {
    pub fn new(settings: SettingsService, store: Database, tokens: TokenService) -> Self {
        Self {
            settings,
            store,
            tokens,
        }
    }

    /// The panel fragment: a hidden token plus one text input per configured
    /// definition, pre-filled from the store.
    pub fn render(&self, post_id: i64) -> Result<String> {
        let definitions = self.settings.definitions()?;
        let links = self.store.links_for_post(post_id)?;
        let stored: BTreeMap<i64, &str> = links
            .iter()
            .map(|link| (link.definition_id, link.url.as_str()))
            .collect();

        let mut html = format!(
            "<input type=\"hidden\" name=\"language_links_token\" value=\"{}\" />",
            escape_attr(&self.tokens.issue(EDITOR_ACTION))
        );

        for definition in &definitions {
            let value = stored.get(&definition.id).copied().unwrap_or("");
            html.push_str(&format!(
                "<p><label for=\"link_field_{id}\">{label}:</label><br>\
                 <input type=\"text\" name=\"links[{id}]\" id=\"link_field_{id}\" \
                 value=\"{value}\" style=\"width: 100%;\" /></p>",
                id = definition.id,
                label = escape_html(&definition.label),
                value = escape_attr(value),
            ));
        }

        Ok(html)
    }

    /// Handle the host's post-save event for one post. Guard order matches
    /// the form lifecycle: token first, then the autosave short-circuit,
    /// then the per-post permission.
    pub fn handle_save(
        &self,
        post_id: i64,
        submission: &EditorSubmission,
        ctx: &SaveContext,
    ) -> Result<SaveOutcome> {
        if !self.tokens.verify(EDITOR_ACTION, &submission.token) {
            debug!("editor save for post {post_id} skipped: token check failed");
            return Ok(SaveOutcome::Skipped);
        }
        if ctx.is_autosave {
            debug!("editor save for post {post_id} skipped: autosave cycle");
            return Ok(SaveOutcome::Skipped);
        }
        if !ctx.can_edit {
            debug!("editor save for post {post_id} skipped: no edit permission");
            return Ok(SaveOutcome::Skipped);
        }

        let definitions = self.settings.definitions()?;
        let known: HashSet<i64> = definitions.iter().map(|d| d.id).collect();

        let mut updated = 0;
        let mut cleared = 0;
        for (&definition_id, url) in &submission.links {
            if !known.contains(&definition_id) {
                continue;
            }
            let url = sanitize_url(url);
            if url.is_empty() {
                // An emptied field clears the value back to "absent"
                if self.store.delete_link(post_id, definition_id)? {
                    cleared += 1;
                }
            } else {
                self.store.upsert_link(post_id, definition_id, &url)?;
                updated += 1;
            }
        }

        info!("saved language links for post {post_id}: {updated} updated, {cleared} cleared");
        Ok(SaveOutcome::Saved { updated, cleared })
    }
}
