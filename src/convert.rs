//! Conversion of text tokens into typed [`Value`]s.
//!
//! Primitive types go through the standard textual parsers. Entity and named
//! catalog lookups use case-insensitive prefix matching with an exact-match
//! tie-break, see [`get_partial_match`].

use crate::lexer::simplify;
use crate::value::{EntityId, EntityRef, ParamType, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// Why a token could not be turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionFailure {
    NoMatch,
    TooManyMatches,
    FormatError,
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionFailure::NoMatch => write!(f, "no match"),
            ConversionFailure::TooManyMatches => write!(f, "too many matches"),
            ConversionFailure::FormatError => write!(f, "format error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub kind: ConversionFailure,
    pub message: String,
}

impl ConversionError {
    fn new(kind: ConversionFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Source of live entities for [`ParamType::Entity`] parameters.
///
/// The embedding application implements this over its own world state.
pub trait EntityProvider {
    /// All entities currently alive.
    fn entities(&self) -> Vec<EntityRef>;

    /// Direct lookup by numeric id.
    fn by_id(&self, id: EntityId) -> Option<EntityRef> {
        self.entities().into_iter().find(|entity| entity.id == id)
    }
}

/// Fixed in-memory entity list.
#[derive(Debug, Clone, Default)]
pub struct StaticEntities(pub Vec<EntityRef>);

impl EntityProvider for StaticEntities {
    fn entities(&self) -> Vec<EntityRef> {
        self.0.clone()
    }
}

/// Converts raw tokens into values of a requested [`ParamType`].
pub struct TypeConverter {
    entities: Box<dyn EntityProvider>,
    catalogs: HashMap<String, Vec<String>>,
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new(Box::new(StaticEntities::default()))
    }
}

impl TypeConverter {
    /// Converter resolving entities through `entities`, with no catalogs.
    pub fn new(entities: Box<dyn EntityProvider>) -> Self {
        Self {
            entities,
            catalogs: HashMap::new(),
        }
    }

    /// Registers the candidate strings for a [`ParamType::Named`] domain.
    pub fn with_catalog<I, S>(mut self, domain: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalogs.insert(
            domain.into(),
            candidates.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Converts a single token.
    ///
    /// For an array type the token is treated as a one-element array.
    pub fn convert(&self, text: &str, ty: &ParamType) -> Result<Value, ConversionError> {
        match ty {
            ParamType::String => Ok(Value::String(text.to_string())),
            ParamType::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format_error(text, ty)),
            ParamType::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format_error(text, ty)),
            ParamType::Boolean => Ok(Value::Boolean(parse_bool(text))),
            ParamType::Entity => self.find_entity(text).map(Value::Entity),
            ParamType::Named(domain) => {
                let candidates = self.catalogs.get(domain).map(Vec::as_slice).unwrap_or(&[]);
                get_partial_match(candidates, text)
                    .map(Value::String)
                    .map_err(|e| ConversionError::new(e.kind, format!("{} ({})", e.message, domain)))
            }
            ParamType::Array(inner) => Ok(Value::Array(vec![self.convert(text, inner)?])),
        }
    }

    /// Converts a run of tokens for one parameter.
    ///
    /// An array type converts every token independently and fails on the first
    /// token that fails. Any other type converts only the first token.
    pub fn convert_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
        ty: &ParamType,
    ) -> Result<Value, ConversionError> {
        match ty {
            ParamType::Array(inner) => tokens
                .iter()
                .map(|token| self.convert(token.as_ref(), inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => match tokens.first() {
                Some(token) => self.convert(token.as_ref(), ty),
                None => Err(ConversionError::new(
                    ConversionFailure::FormatError,
                    format!("missing value for {}", ty),
                )),
            },
        }
    }

    /// Resolves an entity by numeric id or by partial display name.
    pub fn find_entity(&self, text: &str) -> Result<EntityRef, ConversionError> {
        // Any integer is an id, even one no entity can have.
        if let Ok(id) = text.trim().parse::<i128>() {
            return EntityId::try_from(id)
                .ok()
                .and_then(|id| self.entities.by_id(id))
                .ok_or_else(|| {
                    ConversionError::new(
                        ConversionFailure::NoMatch,
                        format!("no entity with id {}", id),
                    )
                });
        }

        match best_match(self.entities.entities(), text, |entity| entity.name.as_str()) {
            Ok(entity) => Ok(entity),
            Err((kind, names)) => Err(match kind {
                ConversionFailure::TooManyMatches => ConversionError::new(
                    kind,
                    format!("more than one entity matches '{}': {}", text, names.join(", ")),
                ),
                _ => ConversionError::new(kind, format!("no entity matches '{}'", text)),
            }),
        }
    }

    /// Candidate strings a completion UI can offer for a parameter type.
    pub fn candidates(&self, ty: &ParamType) -> Vec<String> {
        match ty {
            ParamType::Boolean => vec!["true".to_string(), "false".to_string()],
            ParamType::Entity => self
                .entities
                .entities()
                .into_iter()
                .map(|entity| entity.name)
                .collect(),
            ParamType::Named(domain) => self.catalogs.get(domain).cloned().unwrap_or_default(),
            ParamType::Array(inner) => self.candidates(inner),
            _ => Vec::new(),
        }
    }
}

/// Permissive boolean parsing: a fixed set of truthy literals, anything else is false.
pub fn parse_bool(text: &str) -> bool {
    let text = text.trim();
    TRUTHY.iter().any(|truthy| text.eq_ignore_ascii_case(truthy))
}

/// Finds the candidate best matching `text`.
///
/// Candidates are compared after [`simplify`] and case-insensitively. Every
/// candidate starting with `text` is a prefix match, shortest first. A single
/// prefix match wins outright. With several, the one exactly equal to `text`
/// wins, otherwise the lookup is ambiguous.
pub fn get_partial_match<I, S>(candidates: I, text: &str) -> Result<String, ConversionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let candidates: Vec<String> = candidates
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();

    best_match(candidates, text, String::as_str).map_err(|(kind, matches)| match kind {
        ConversionFailure::TooManyMatches => ConversionError::new(
            kind,
            format!("more than one match for '{}': {}", text, matches.join(", ")),
        ),
        _ => ConversionError::new(kind, format!("nothing matches '{}'", text)),
    })
}

fn best_match<T, F>(items: Vec<T>, text: &str, name_of: F) -> Result<T, (ConversionFailure, Vec<String>)>
where
    F: Fn(&T) -> &str,
{
    let needle = simplify(text).to_lowercase();

    let mut matches: Vec<(String, T)> = items
        .into_iter()
        .filter_map(|item| {
            let normalized = simplify(name_of(&item)).to_lowercase();
            normalized.starts_with(&needle).then_some((normalized, item))
        })
        .collect();
    matches.sort_by_key(|(normalized, _)| normalized.chars().count());

    match matches.len() {
        0 => Err((ConversionFailure::NoMatch, Vec::new())),
        1 => Ok(matches.remove(0).1),
        _ => match matches.iter().position(|(normalized, _)| *normalized == needle) {
            Some(exact) => Ok(matches.remove(exact).1),
            None => Err((
                ConversionFailure::TooManyMatches,
                matches
                    .iter()
                    .map(|(_, item)| name_of(item).to_string())
                    .collect(),
            )),
        },
    }
}

fn format_error(text: &str, ty: &ParamType) -> ConversionError {
    ConversionError::new(
        ConversionFailure::FormatError,
        format!("'{}' is not a valid {}", text, ty),
    )
}
