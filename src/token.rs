//! Anti-forgery tokens for the admin and editor forms.
//!
//! Tokens are stateless: a SHA-256 digest over the configured secret and a
//! fixed action name, hex-encoded. Each form embeds the token for its own
//! action, and verification compares in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Action name guarding the settings form.
pub const SETTINGS_ACTION: &str = "language_links_settings_action";

/// Action name guarding the per-post editor form.
pub const EDITOR_ACTION: &str = "language_links_action";

/// Constant-time string comparison to prevent timing attacks.
/// Use this for comparing tokens, API keys, and other sensitive values.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The token for a fixed action name, for embedding in a form.
    pub fn issue(&self, action: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        let digest = hasher.finalize();

        let mut token = String::with_capacity(digest.len() * 2);
        for byte in digest {
            token.push_str(&format!("{:02x}", byte));
        }
        token
    }

    /// Check a submitted token against the action it should be tied to.
    pub fn verify(&self, action: &str, token: &str) -> bool {
        constant_time_compare(&self.issue(action), token)
    }
}
