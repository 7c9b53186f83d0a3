//! An embeddable console command engine.
//!
//! The embedding application describes its commands once, as a table of
//! [`CommandDefinition`]s with typed parameters. The [`Interpreter`] then turns
//! free-form text lines into calls: it tokenizes the line, expands a leading
//! alias, looks the keyword up in the [`CommandRegistry`], converts every
//! argument with the [`TypeConverter`] and invokes the handler. Every failure
//! comes back as a [`Diagnostic`] instead of escaping to the caller.
//!
//! The public modules [`lexer`] and [`convert`] expose the tokenizer and the
//! partial-name matcher on their own, for help screens and completion widgets.

mod alias;
pub mod builtin;
mod command;
mod config;
pub mod convert;
mod diagnostic;
mod interpreter;
pub mod lexer;
mod logging;
mod output;
mod registry;
mod value;

pub use alias::{AliasError, AliasTable};
pub use command::{Args, Autocomplete, Command, CommandContext, CommandDefinition, Handler, Parameter};
pub use config::EngineConfig;
pub use convert::{
    ConversionError, ConversionFailure, EntityProvider, StaticEntities, TypeConverter,
    get_partial_match,
};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use interpreter::{COMMAND_CATALOG, Interpreter};
pub use logging::{LogSink, TracingSink};
pub use output::OutputQueue;
pub use registry::{CommandRegistry, RegistryError};
pub use value::{EntityId, EntityRef, ParamType, Value};
