//! HTML entity escaping for rendered fragments.
//!
//! Values are stored raw and escaped at the output boundary, per context:
//! text nodes need the markup-significant characters escaped, attribute
//! values additionally need both quote styles escaped.

/// Escape a string for use as an HTML text node.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }

    result
}

/// Escape a string for use inside a quoted HTML attribute value.
pub fn escape_attr(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }

    result
}
