//! The build-once keyword table.

use crate::command::{Command, CommandDefinition};
use crate::config::EngineConfig;
use crate::value::ParamType;
use std::collections::HashMap;
use thiserror::Error;

/// Defects in the command table. These are programming errors of the
/// embedding application and are reported once, when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("keyword '{0}' is registered more than once")]
    DuplicateKeyword(String),
    #[error("keyword '{0}' must be non-empty and contain no whitespace or quotes")]
    InvalidKeyword(String),
    #[error("{keyword}: required parameter '{param}' follows an optional one")]
    RequiredAfterOptional { keyword: String, param: String },
    #[error("{keyword}: array parameter '{param}' must be the last parameter")]
    ArrayNotLast { keyword: String, param: String },
    #[error("{keyword}: parameter '{param}' nests an array inside an array")]
    NestedArray { keyword: String, param: String },
    #[error("{keyword}: default of parameter '{param}' does not match its type")]
    DefaultTypeMismatch { keyword: String, param: String },
}

/// Maps prefixed keywords to commands.
///
/// Built once from the embedding application's command table and read-only
/// afterwards, so the keyword set never changes during a session.
#[derive(Debug)]
pub struct CommandRegistry {
    prefix: String,
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    /// Validates every definition and indexes it under its prefixed keyword.
    pub fn build(
        config: &EngineConfig,
        definitions: impl IntoIterator<Item = CommandDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut commands = HashMap::new();

        for definition in definitions {
            let command = compile(config, definition)?;
            if commands.contains_key(&command.keyword) {
                return Err(RegistryError::DuplicateKeyword(command.keyword));
            }
            tracing::trace!(keyword = %command.keyword, hint = %command.hint, "registered command");
            commands.insert(command.keyword.clone(), command);
        }

        Ok(Self {
            prefix: config.prefix.clone(),
            commands,
        })
    }

    /// Finds a command by keyword, with or without the prefix.
    pub fn lookup(&self, keyword: &str) -> Option<&Command> {
        self.commands.get(keyword).or_else(|| {
            if keyword.starts_with(&self.prefix) {
                None
            } else {
                self.commands.get(&format!("{}{}", self.prefix, keyword))
            }
        })
    }

    /// Whether `name` would resolve to a registered command.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Prefix every keyword is stored with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Prefixed keywords in sorted order.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    /// Keywords with the prefix stripped, sorted.
    pub fn bare_keywords(&self) -> Vec<&str> {
        self.keywords()
            .into_iter()
            .map(|keyword| keyword.strip_prefix(self.prefix.as_str()).unwrap_or(keyword))
            .collect()
    }

    /// All commands sorted by keyword.
    pub fn commands(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_unstable_by(|a, b| a.keyword.cmp(&b.keyword));
        commands
    }
}

fn compile(config: &EngineConfig, definition: CommandDefinition) -> Result<Command, RegistryError> {
    let CommandDefinition {
        keyword,
        description,
        parameters,
        handler,
        autocomplete,
    } = definition;

    let keyword = config.prefixed(&keyword);
    let bare = keyword.strip_prefix(config.prefix.as_str()).unwrap_or(&keyword);
    if bare.is_empty() || bare.chars().any(|c| c.is_whitespace() || c == '"') {
        return Err(RegistryError::InvalidKeyword(keyword));
    }

    let mut seen_optional = false;
    for (index, param) in parameters.iter().enumerate() {
        if let ParamType::Array(inner) = &param.ty {
            if inner.is_array() {
                return Err(RegistryError::NestedArray {
                    keyword,
                    param: param.name.clone(),
                });
            }
            if index + 1 != parameters.len() {
                return Err(RegistryError::ArrayNotLast {
                    keyword,
                    param: param.name.clone(),
                });
            }
        }

        match &param.default {
            Some(default) if !param.ty.accepts(default) => {
                return Err(RegistryError::DefaultTypeMismatch {
                    keyword,
                    param: param.name.clone(),
                });
            }
            Some(_) => seen_optional = true,
            None if seen_optional => {
                return Err(RegistryError::RequiredAfterOptional {
                    keyword,
                    param: param.name.clone(),
                });
            }
            None => {}
        }
    }

    let required_count = parameters.iter().filter(|param| !param.is_optional()).count();
    let hint = parameters
        .iter()
        .map(|param| param.hint())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Command {
        keyword,
        description,
        parameters,
        required_count,
        hint,
        handler,
        autocomplete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn noop(keyword: &str) -> CommandDefinition {
        CommandDefinition::new(keyword, "does nothing", |_, _| Ok(()))
    }

    fn build(definitions: Vec<CommandDefinition>) -> Result<CommandRegistry, RegistryError> {
        CommandRegistry::build(&EngineConfig::default(), definitions)
    }

    #[test]
    fn test_hint_and_required_count() {
        let registry = build(vec![
            noop("setlevel")
                .required("level", ParamType::Integer)
                .optional("mode", ParamType::String, "normal"),
        ])
        .unwrap();

        let command = registry.lookup("setlevel").unwrap();
        assert_eq!(command.keyword(), "/setlevel");
        assert_eq!(command.required_count(), 1);
        assert_eq!(command.hint(), "<int level> [string mode=normal]");
    }

    #[test]
    fn test_lookup_with_and_without_prefix() {
        let registry = build(vec![noop("/give")]).unwrap();
        assert!(registry.lookup("give").is_some());
        assert!(registry.lookup("/give").is_some());
        assert!(registry.lookup("//give").is_none());
        assert!(registry.lookup("take").is_none());
        assert_eq!(registry.bare_keywords(), vec!["give"]);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let registry = build(vec![noop("give").required("item", ParamType::String)]).unwrap();
        let first = registry.lookup("give").unwrap() as *const Command;
        let second = registry.lookup("give").unwrap() as *const Command;
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_keyword_rejected() {
        let err = build(vec![noop("give"), noop("/give")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKeyword("/give".into()));
    }

    #[test]
    fn test_invalid_keyword_rejected() {
        assert!(matches!(build(vec![noop("/")]), Err(RegistryError::InvalidKeyword(_))));
        assert!(matches!(build(vec![noop("two words")]), Err(RegistryError::InvalidKeyword(_))));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let err = build(vec![
            noop("bad")
                .optional("a", ParamType::Integer, 1)
                .required("b", ParamType::Integer),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::RequiredAfterOptional {
                keyword: "/bad".into(),
                param: "b".into()
            }
        );
    }

    #[test]
    fn test_array_must_be_last_and_flat() {
        let err = build(vec![
            noop("bad")
                .required("xs", ParamType::array_of(ParamType::Integer))
                .required("y", ParamType::Integer),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::ArrayNotLast { .. }));

        let err = build(vec![
            noop("bad").required("xs", ParamType::array_of(ParamType::array_of(ParamType::Integer))),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::NestedArray { .. }));
    }

    #[test]
    fn test_default_type_checked() {
        let err = build(vec![noop("bad").optional("n", ParamType::Integer, "ten")]).unwrap_err();
        assert!(matches!(err, RegistryError::DefaultTypeMismatch { .. }));

        assert!(
            build(vec![noop("ok").optional(
                "rest",
                ParamType::array_of(ParamType::String),
                Value::Array(vec![])
            )])
            .is_ok()
        );
    }
}
