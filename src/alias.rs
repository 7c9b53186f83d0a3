//! User-defined shortcut keywords.

use crate::lexer::simplify;
use crate::registry::CommandRegistry;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("alias '{0}' collides with a command keyword")]
    CollidesWithCommand(String),
    #[error("alias name '{0}' must be non-empty and contain no whitespace or quotes")]
    InvalidName(String),
    #[error("alias '{0}' needs a replacement line")]
    EmptyReplacement(String),
    #[error("no alias named '{0}'")]
    NotFound(String),
}

/// Maps alias names to the line of text replacing them.
///
/// Names can never shadow a command: the command keyword set is fixed when the
/// table is created, so checking against that snapshot is enough.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
    prefix: String,
    reserved: HashSet<String>,
}

impl AliasTable {
    /// An empty table guarding the keywords of `registry`.
    pub fn new(registry: &CommandRegistry) -> Self {
        Self {
            aliases: BTreeMap::new(),
            prefix: registry.prefix().to_string(),
            reserved: registry.keywords().into_iter().map(str::to_string).collect(),
        }
    }

    /// Creates or replaces an alias, returning the previous replacement.
    pub fn set_alias(
        &mut self,
        name: &str,
        replacement: &str,
    ) -> Result<Option<String>, AliasError> {
        self.check_name(name)?;
        let replacement = simplify(replacement);
        if replacement.is_empty() {
            return Err(AliasError::EmptyReplacement(name.to_string()));
        }
        tracing::debug!(name, %replacement, "alias set");
        Ok(self.aliases.insert(name.to_string(), replacement))
    }

    /// Deletes an alias, returning its replacement.
    pub fn remove_alias(&mut self, name: &str) -> Result<String, AliasError> {
        self.check_name(name)?;
        self.aliases
            .remove(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))
    }

    /// Replacement line of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Every alias, sorted by name.
    pub fn list_aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn check_name(&self, name: &str) -> Result<(), AliasError> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '"') {
            return Err(AliasError::InvalidName(name.to_string()));
        }
        let prefixed = if name.starts_with(&self.prefix) {
            name.to_string()
        } else {
            format!("{}{}", self.prefix, name)
        };
        if self.reserved.contains(&prefixed) {
            return Err(AliasError::CollidesWithCommand(name.to_string()));
        }
        Ok(())
    }
}
