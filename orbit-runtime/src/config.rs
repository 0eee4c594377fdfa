use serde::{Deserialize, Serialize};

/// Runtime-wide settings, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppress diagnostics in the log. They are still collected.
    pub silent: bool,
    /// Stripped from attribute names before directive lookup: with `m-`, `m-if` is `if`.
    pub directive_prefix: String,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
