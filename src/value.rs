//! Typed argument values and the parameter types that produce them.

use crate::lexer::join_tokens;
use std::fmt;

/// Numeric identifier of a live entity.
pub type EntityId = u64;

/// A resolved reference to a live domain entity, e.g. a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: EntityId,
    pub name: String,
}

impl EntityRef {
    /// Reference to entity `id` shown as `name`.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Declared semantic type of a command parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// A live entity found by numeric id or by partial display name.
    Entity,
    /// A candidate string from a named catalog, matched by partial name.
    Named(String),
    /// Consumes every remaining token, converting each with the inner type.
    /// Only valid as the last parameter and never nested.
    Array(Box<ParamType>),
}

impl ParamType {
    /// Array of `inner`, e.g. `string...`.
    pub fn array_of(inner: ParamType) -> Self {
        ParamType::Array(Box::new(inner))
    }

    /// Whether this parameter swallows the remaining tokens.
    pub fn is_array(&self) -> bool {
        matches!(self, ParamType::Array(_))
    }

    /// Whether `value` is a legal value for a parameter of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Integer, Value::Integer(_)) => true,
            (ParamType::Float, Value::Float(_)) => true,
            (ParamType::Boolean, Value::Boolean(_)) => true,
            (ParamType::Entity, Value::Entity(_)) => true,
            (ParamType::Named(_), Value::String(_)) => true,
            (ParamType::Array(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Integer => write!(f, "int"),
            ParamType::Float => write!(f, "float"),
            ParamType::Boolean => write!(f, "bool"),
            ParamType::Entity => write!(f, "entity"),
            ParamType::Named(domain) => write!(f, "{}", domain),
            ParamType::Array(inner) => write!(f, "{}...", inner),
        }
    }
}

/// A converted argument, one per declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Entity(EntityRef),
    Array(Vec<Value>),
}

impl Value {
    /// The integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The number as a float; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// The text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// The entity, if this is one.
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Value::Entity(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Entity(v) => write!(f, "{}", v.name),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", join_tokens(&parts))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<EntityRef> for Value {
    fn from(v: EntityRef) -> Self {
        Value::Entity(v)
    }
}
