use std::collections::HashMap;
use std::env;

/// Environment variable overriding [`EngineConfig::prefix`].
pub const PREFIX_VAR: &str = "CONSOLE_PREFIX";
/// Environment variable overriding [`EngineConfig::separator`]. Only its first character is used.
pub const SEPARATOR_VAR: &str = "CONSOLE_SEPARATOR";

/// Settings passed to the interpreter at construction.
///
/// - `prefix`: leading text every registered keyword is stored with, e.g. `/`.
/// - `separator`: character splitting one submitted line into chained commands.
/// - `keep_empty_segments`: whether empty chained segments are kept (and run as no-ops).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub prefix: String,
    pub separator: char,
    pub keep_empty_segments: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
            separator: ';',
            keep_empty_segments: false,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars().collect())
    }

    /// Defaults overlaid with the given variables.
    ///
    /// An empty separator variable is ignored.
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(prefix) = vars.get(PREFIX_VAR) {
            config.prefix = prefix.clone();
        }
        if let Some(sep) = vars.get(SEPARATOR_VAR).and_then(|s| s.chars().next()) {
            config.separator = sep;
        }
        config
    }

    /// Keyword in its stored, prefixed form.
    pub fn prefixed(&self, keyword: &str) -> String {
        if keyword.starts_with(&self.prefix) {
            keyword.to_string()
        } else {
            format!("{}{}", self.prefix, keyword)
        }
    }
}
