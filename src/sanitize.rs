//! Input sanitization for settings and editor submissions.
//!
//! Sanitization here is hygiene, not validation: values are made safe to
//! store and echo back, but a string that merely fails to be a working URL
//! is stored as-is and simply fails to render.

/// Sanitize a free-text field: strip markup tags, drop control characters,
/// collapse whitespace runs, and trim.
pub fn sanitize_text(input: &str) -> String {
    let tag_regex = regex::Regex::new(r"<[^>]*>").unwrap();
    let stripped = tag_regex.replace_all(input, "");

    let mut result = String::with_capacity(stripped.len());
    let mut pending_space = false;

    for c in stripped.chars() {
        if c.is_whitespace() {
            pending_space = !result.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            result.push(' ');
            pending_space = false;
        }
        result.push(c);
    }

    result
}

/// Sanitize a URL field: drop whitespace and control characters, and refuse
/// absolute URLs with a scheme other than http/https (stored as empty).
/// Anything else, malformed or not, passes through untouched.
pub fn sanitize_url(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_whitespace() || c.is_control() {
            continue;
        }
        cleaned.push(c);
    }

    if let Some((scheme, _)) = cleaned.split_once(':') {
        let is_scheme = !scheme.is_empty()
            && scheme.chars().next().unwrap().is_ascii_alphabetic()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
        if is_scheme && !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https")
        {
            return String::new();
        }
    }

    cleaned
}
