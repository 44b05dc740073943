//! Content injection: renders the configured language links into post
//! content at the configured position.
//!
//! The injector is a pure filter over the outgoing content string. It never
//! fails a render: a post without links, or content without a paragraph to
//! anchor on, passes through unchanged.

use crate::html::escape_attr;
use crate::settings::{DisplayPosition, SettingsService};
use crate::store::{Database, LanguageDefinition, LanguageLink};
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

const CLOSING_P: &str = "</p>";

/// Facts about the render the host is performing. Injection only happens for
/// a singular post in the primary loop of the primary query, with no
/// password gate active.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RenderContext {
    pub is_singular: bool,
    pub in_main_loop: bool,
    pub is_main_query: bool,
    pub password_protected: bool,
}

impl Default for RenderContext {
    /// An ordinary single-post render on the primary query.
    fn default() -> Self {
        Self {
            is_singular: true,
            in_main_loop: true,
            is_main_query: true,
            password_protected: false,
        }
    }
}

impl RenderContext {
    pub fn injectable(&self) -> bool {
        self.is_singular && self.in_main_loop && self.is_main_query && !self.password_protected
    }
}

#[derive(Clone)]
pub struct ContentInjector {
    settings: SettingsService,
    store: Database,
}

impl ContentInjector {
    pub fn new(settings: SettingsService, store: Database) -> Self {
        Self { settings, store }
    }

    /// Apply the content filter for one post. Content comes back unchanged
    /// unless the context qualifies and the post has stored links.
    pub fn filter(&self, post_id: i64, content: &str, ctx: &RenderContext) -> Result<String> {
        if !ctx.injectable() {
            return Ok(content.to_string());
        }

        let links = self.store.links_for_post(post_id)?;
        if links.is_empty() {
            return Ok(content.to_string());
        }

        let definitions = self.settings.definitions()?;
        let block = build_block(&links, &definitions);
        let position = self.settings.display_position()?;

        Ok(splice(content, &block, position))
    }
}

/// Assemble the wrapper block: a fixed caption followed by one anchor+icon
/// pair per stored link, in storage order.
pub fn build_block(links: &[LanguageLink], definitions: &[LanguageDefinition]) -> String {
    let by_id: HashMap<i64, &LanguageDefinition> =
        definitions.iter().map(|d| (d.id, d)).collect();

    let mut html = String::from(
        "<div class=\"language-links\" style=\"display: inline-flex; align-items: center; margin-top: 15px;\">",
    );
    html.push_str(
        "<h5 style=\"margin: 0; padding-right: 10px;\">Choose the language:&nbsp;&nbsp;</h5>",
    );

    for link in links {
        // A row can only outlive its definition mid-request; drop it rather
        // than render an unlabeled anchor.
        let Some(definition) = by_id.get(&link.definition_id) else {
            continue;
        };
        html.push_str(&format!(
            "<a href=\"{href}\" hreflang=\"{lang}\" style=\"margin-right: 10px;\">\
             <img class=\"mrl\" src=\"{icon}\" alt=\"{alt}\" width=\"30px\" style=\"margin-right: 10px;\" />\
             </a>",
            href = escape_attr(&link.url),
            lang = escape_attr(&definition.label),
            icon = escape_attr(&definition.icon_url),
            alt = escape_attr(&definition.label),
        ));
    }

    html.push_str("</div>");
    html
}

/// Splice the block into content at the configured position. `Both` applies
/// the two single-position splices independently, yielding two copies.
pub fn splice(content: &str, block: &str, position: DisplayPosition) -> String {
    match position {
        DisplayPosition::Below => format!("{content}{block}"),
        DisplayPosition::Before => insert_before_paragraph(block, 1, content),
        DisplayPosition::Both => {
            let with_leading = insert_before_paragraph(block, 1, content);
            format!("{with_leading}{block}")
        }
    }
}

/// Insert `insertion` immediately in front of the nth paragraph (1-based),
/// where paragraphs are delimited by their closing tag. Content with fewer
/// paragraphs than `paragraph` is returned unchanged. Apart from the
/// inserted block the content bytes are preserved exactly.
pub fn insert_before_paragraph(insertion: &str, paragraph: usize, content: &str) -> String {
    if paragraph == 0 {
        return content.to_string();
    }

    let mut result = String::with_capacity(content.len() + insertion.len());
    let mut seen = 0usize;
    let mut inserted = false;

    for fragment in content.split_inclusive(CLOSING_P) {
        if !inserted && fragment.ends_with(CLOSING_P) {
            seen += 1;
            if seen == paragraph {
                result.push_str(insertion);
                inserted = true;
            }
        }
        result.push_str(fragment);
    }

    if !inserted {
        return content.to_string();
    }
    result
}
