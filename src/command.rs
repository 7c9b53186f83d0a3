use crate::alias::AliasTable;
use crate::output::OutputQueue;
use crate::registry::CommandRegistry;
use crate::value::{EntityRef, ParamType, Value};
use anyhow::{Context, Result, anyhow};
use std::fmt;

/// Callback executing a command once all of its arguments are converted.
///
/// Errors and panics are caught by the interpreter and reported as a
/// handler failure; they never escape the dispatch call.
pub type Handler = Box<dyn Fn(&mut CommandContext<'_>, &Args) -> Result<()>>;

/// Completion provider: given a parameter index, returns candidate strings.
pub type Autocomplete = Box<dyn Fn(usize) -> Vec<String>>;

/// One declared parameter of a command.
///
/// A parameter with a default value is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl Parameter {
    /// Parameter that must be supplied.
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Parameter taking `default` when omitted.
    pub fn optional(name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
        }
    }

    /// Whether the parameter has a default.
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }

    /// `<type name>` for required parameters, `[type name=default]` for optional ones.
    pub fn hint(&self) -> String {
        match &self.default {
            None => format!("<{} {}>", self.ty, self.name),
            Some(default) => format!("[{} {}={}]", self.ty, self.name, default),
        }
    }
}

/// Entry of the command table supplied by the embedding application.
pub struct CommandDefinition {
    pub(crate) keyword: String,
    pub(crate) description: String,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) handler: Handler,
    pub(crate) autocomplete: Option<Autocomplete>,
}

impl CommandDefinition {
    /// Starts a definition. The keyword may be given with or without the
    /// configured prefix.
    pub fn new<F>(keyword: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>, &Args) -> Result<()> + 'static,
    {
        Self {
            keyword: keyword.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Box::new(handler),
            autocomplete: None,
        }
    }

    /// Appends a parameter.
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends a required parameter.
    pub fn required(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.param(Parameter::required(name, ty))
    }

    /// Appends an optional parameter with its default.
    pub fn optional(self, name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        self.param(Parameter::optional(name, ty, default))
    }

    /// Sets the completion provider, called with the parameter index.
    pub fn autocomplete<F>(mut self, provider: F) -> Self
    where
        F: Fn(usize) -> Vec<String> + 'static,
    {
        self.autocomplete = Some(Box::new(provider));
        self
    }
}

/// A registered command. Immutable once the registry is built.
pub struct Command {
    pub(crate) keyword: String,
    pub(crate) description: String,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) required_count: usize,
    pub(crate) hint: String,
    pub(crate) handler: Handler,
    pub(crate) autocomplete: Option<Autocomplete>,
}

impl Command {
    /// Keyword including the prefix, e.g. `/give`.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// One-line description shown by `help`.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters in order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Number of leading parameters without a default.
    pub fn required_count(&self) -> usize {
        self.required_count
    }

    /// Parameter list rendered for help output.
    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// Completion candidates from the command's own provider, if it has one.
    pub fn complete(&self, index: usize) -> Option<Vec<String>> {
        self.autocomplete.as_ref().map(|provider| provider(index))
    }

    /// The parameter receiving the argument at `index`, taking a trailing
    /// array parameter into account.
    pub fn parameter_for(&self, index: usize) -> Option<&Parameter> {
        match self.parameters.get(index) {
            Some(param) => Some(param),
            None => self.parameters.last().filter(|last| last.ty.is_array()),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("keyword", &self.keyword)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("required_count", &self.required_count)
            .field("hint", &self.hint)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

/// What a handler can reach while it runs.
pub struct CommandContext<'a> {
    /// Keyword of the running command, prefixed.
    pub keyword: &'a str,
    pub registry: &'a CommandRegistry,
    pub aliases: &'a mut AliasTable,
    pub output: OutputQueue,
}

impl CommandContext<'_> {
    /// Queues one line of output.
    pub fn print(&self, line: impl Into<String>) {
        self.output.push(line);
    }
}

/// Converted arguments, one per declared parameter in declaration order.
///
/// Omitted optional parameters hold their default. The typed getters fail
/// only when a handler asks for the wrong type or index, which is reported as
/// a handler failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// Wraps already converted values.
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of values, one per declared parameter.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the command declares no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Result<&Value> {
        self.0
            .get(index)
            .ok_or_else(|| anyhow!("no argument at position {}", index))
    }

    /// Integer argument at `index`.
    pub fn int(&self, index: usize) -> Result<i64> {
        self.get(index)?
            .as_int()
            .with_context(|| format!("argument {} is not an int", index))
    }

    /// Float argument at `index`; integers widen.
    pub fn float(&self, index: usize) -> Result<f64> {
        self.get(index)?
            .as_float()
            .with_context(|| format!("argument {} is not a float", index))
    }

    /// Boolean argument at `index`.
    pub fn bool(&self, index: usize) -> Result<bool> {
        self.get(index)?
            .as_bool()
            .with_context(|| format!("argument {} is not a bool", index))
    }

    /// String argument at `index`, also for named catalogs.
    pub fn str(&self, index: usize) -> Result<&str> {
        self.get(index)?
            .as_str()
            .with_context(|| format!("argument {} is not a string", index))
    }

    /// Entity argument at `index`.
    pub fn entity(&self, index: usize) -> Result<&EntityRef> {
        self.get(index)?
            .as_entity()
            .with_context(|| format!("argument {} is not an entity", index))
    }

    /// Elements of the trailing array argument at `index`.
    pub fn array(&self, index: usize) -> Result<&[Value]> {
        self.get(index)?
            .as_array()
            .with_context(|| format!("argument {} is not an array", index))
    }
}
