//! Language links: admin-configured language definitions, per-post link
//! values, and injection of the rendered link block into post content.
//!
//! The library holds all plugin logic; the binary in `main.rs` wires it into
//! a small HTTP service. Host concerns (session auth, media library,
//! template rendering) stay outside: handlers receive the host's verdicts as
//! explicit flags.

pub mod admin;
pub mod config;
pub mod html;
pub mod inject;
pub mod panel;
pub mod sanitize;
pub mod server;
pub mod settings;
pub mod store;
pub mod token;
