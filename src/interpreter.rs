use crate::alias::AliasTable;
use crate::command::{Args, Command, CommandContext, CommandDefinition};
use crate::config::EngineConfig;
use crate::convert::{ConversionError, TypeConverter};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::{simplify, split_into_tokens, split_on_separator};
use crate::logging::{LogSink, TracingSink};
use crate::output::OutputQueue;
use crate::registry::{CommandRegistry, RegistryError};
use crate::value::{ParamType, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Catalog name under which registered keywords are offered to
/// [`ParamType::Named`] parameters, e.g. the argument of `help`.
pub const COMMAND_CATALOG: &str = "command";

/// Parses console lines and dispatches them to registered commands.
///
/// The interpreter owns the read-only [`CommandRegistry`], the session's
/// [`AliasTable`] and the [`TypeConverter`]. Every call to [`Interpreter::run`]
/// completes synchronously; a failure at any step comes back as a
/// [`Diagnostic`] and no handler runs unless all of its arguments converted.
///
/// Example
/// ```
/// use console_commands::{CommandDefinition, EngineConfig, Interpreter, ParamType, TypeConverter};
///
/// let mut console = Interpreter::new(
///     EngineConfig::default(),
///     vec![CommandDefinition::new("echo", "print the words", |ctx, args| {
///         ctx.print(args.str(0)?);
///         Ok(())
///     })
///     .required("text", ParamType::String)],
///     TypeConverter::default(),
/// )
/// .unwrap();
///
/// console.run("echo hello").unwrap();
/// assert_eq!(console.output().drain(), vec!["hello"]);
/// ```
pub struct Interpreter {
    config: EngineConfig,
    registry: CommandRegistry,
    aliases: AliasTable,
    converter: TypeConverter,
    output: OutputQueue,
    log: Box<dyn LogSink>,
}

impl Interpreter {
    /// Build the registry from `definitions` and set up an empty alias table.
    pub fn new(
        config: EngineConfig,
        definitions: impl IntoIterator<Item = CommandDefinition>,
        converter: TypeConverter,
    ) -> Result<Self, RegistryError> {
        let registry = CommandRegistry::build(&config, definitions)?;
        let converter = converter.with_catalog(COMMAND_CATALOG, registry.bare_keywords());
        let aliases = AliasTable::new(&registry);
        Ok(Self {
            config,
            registry,
            aliases,
            converter,
            output: OutputQueue::new(),
            log: Box::new(TracingSink),
        })
    }

    /// Replace the low-level diagnostic channel.
    pub fn with_log_sink(mut self, log: Box<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Print into a queue owned by the embedding application.
    pub fn with_output(mut self, output: OutputQueue) -> Self {
        self.output = output;
        self
    }

    /// Settings the interpreter was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The read-only command table.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Converter used for every argument.
    pub fn converter(&self) -> &TypeConverter {
        &self.converter
    }

    /// Aliases defined this session.
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Mutable access for the embedding application's own alias UI.
    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    /// Queue command handlers print into.
    pub fn output(&self) -> &OutputQueue {
        &self.output
    }

    /// Metadata of a command, by keyword with or without prefix.
    pub fn get_command(&self, keyword: &str) -> Option<&Command> {
        self.registry.lookup(keyword)
    }

    /// Run one command line.
    ///
    /// The line is simplified, an alias in first position is replaced by its
    /// line (once, never recursively), and the result is tokenized, bound and
    /// dispatched. An empty line does nothing.
    pub fn run(&mut self, line: &str) -> Result<(), Diagnostic> {
        let line = self.expand_alias(&simplify(line));
        let tokens = split_into_tokens(&line);
        let Some((keyword, args)) = tokens.split_first() else {
            return Ok(());
        };

        tracing::debug!(%keyword, ?args, "dispatching");
        let result = self.dispatch(keyword, args);
        self.report(&line, &result);
        result
    }

    /// Run a submitted line holding several commands joined by the
    /// configured separator.
    ///
    /// Each segment gets its own result; a failing segment does not stop the
    /// ones after it. An alias whose line itself contains separators expands
    /// into several commands, which are run as-is without further alias
    /// lookups.
    pub fn run_chain(&mut self, line: &str) -> Vec<Result<(), Diagnostic>> {
        let separator = self.config.separator;
        let keep_empty = self.config.keep_empty_segments;

        let mut results = Vec::new();
        for segment in split_on_separator(line, separator, keep_empty) {
            let simplified = simplify(&segment);
            let (head, rest) = simplified.split_once(' ').unwrap_or((simplified.as_str(), ""));
            let Some(replacement) = self.aliases.get(head).map(str::to_string) else {
                results.push(self.run(&segment));
                continue;
            };

            // Only the stored line is split again; the typed rest was
            // already split and may hold unescaped separators.
            let mut commands = split_on_separator(&replacement, separator, keep_empty);
            if !rest.is_empty() {
                match commands.last_mut() {
                    Some(last) => {
                        last.push(' ');
                        last.push_str(rest);
                    }
                    None => commands.push(rest.to_string()),
                }
            }
            for command in commands {
                results.push(self.run_expanded(&command));
            }
        }
        results
    }

    /// Completion candidates for the last word of a partially typed line.
    ///
    /// In keyword position this offers command keywords and alias names.
    /// Past the keyword it asks the command's own provider for the current
    /// parameter, falling back to what the converter knows about its type.
    pub fn complete(&self, partial: &str) -> Vec<String> {
        let current_segment = split_on_separator(partial, self.config.separator, true)
            .pop()
            .unwrap_or_default();
        let mut tokens = split_into_tokens(&current_segment);
        let completing_new_word =
            tokens.is_empty() || partial.ends_with(|c: char| c.is_whitespace());
        let word = if completing_new_word {
            String::new()
        } else {
            tokens.pop().unwrap_or_default()
        };

        let candidates: Vec<String> = match tokens.first() {
            None => {
                let keywords = if !self.registry.prefix().is_empty()
                    && word.starts_with(self.registry.prefix())
                {
                    self.registry.keywords()
                } else {
                    self.registry.bare_keywords()
                };
                keywords
                    .into_iter()
                    .map(str::to_string)
                    .chain(self.aliases.list_aliases().keys().cloned())
                    .collect()
            }
            Some(keyword) => {
                let index = tokens.len() - 1;
                match self.registry.lookup(keyword) {
                    Some(command) => match command.complete(index) {
                        Some(candidates) => candidates,
                        None => command
                            .parameter_for(index)
                            .map(|param| self.converter.candidates(&param.ty))
                            .unwrap_or_default(),
                    },
                    None => Vec::new(),
                }
            }
        };

        let needle = word.to_lowercase();
        let mut matches: Vec<String> = candidates
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }

    fn run_expanded(&mut self, line: &str) -> Result<(), Diagnostic> {
        let tokens = split_into_tokens(&simplify(line));
        let Some((keyword, args)) = tokens.split_first() else {
            return Ok(());
        };
        let result = self.dispatch(keyword, args);
        self.report(line, &result);
        result
    }

    /// Handler failures already went to [`LogSink::handler_failed`] with
    /// their full detail.
    fn report(&self, line: &str, result: &Result<(), Diagnostic>) {
        match result {
            Err(diagnostic) if diagnostic.kind != DiagnosticKind::HandlerExecutionFailure => {
                self.log.diagnostic(line, diagnostic);
            }
            _ => {}
        }
    }

    /// Replace a leading alias name with its line. Single level only.
    fn expand_alias(&self, line: &str) -> String {
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        match self.aliases.get(head) {
            Some(replacement) if rest.is_empty() => replacement.to_string(),
            Some(replacement) => format!("{} {}", replacement, rest),
            None => line.to_string(),
        }
    }

    fn dispatch(&mut self, keyword: &str, args: &[String]) -> Result<(), Diagnostic> {
        let Interpreter {
            registry,
            aliases,
            converter,
            output,
            log,
            ..
        } = self;
        let registry = &*registry;

        let command = registry
            .lookup(keyword)
            .ok_or_else(|| Diagnostic::unknown_command(keyword))?;

        if args.len() < command.required_count() {
            return Err(Diagnostic::missing_arguments(
                command.keyword(),
                command.hint(),
                args.len(),
                command.required_count(),
            ));
        }

        let values = bind_arguments(converter, registry.prefix(), command, args)?;

        let mut ctx = CommandContext {
            keyword: command.keyword(),
            registry,
            aliases,
            output: output.clone(),
        };
        let args = Args::new(values);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (command.handler)(&mut ctx, &args)));
        output.flush_pending();

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                log.handler_failed(command.keyword(), &format!("{:?}", err));
                Err(Diagnostic::handler_failure(command.keyword(), &format!("{:#}", err)))
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log.handler_failed(command.keyword(), &format!("panicked: {}", reason));
                Err(Diagnostic::handler_failure(command.keyword(), &reason))
            }
        }
    }
}

/// Converts `args` into one value per declared parameter.
///
/// Missing optional parameters take their default, a trailing array
/// parameter takes every remaining token.
fn bind_arguments(
    converter: &TypeConverter,
    prefix: &str,
    command: &Command,
    args: &[String],
) -> Result<Vec<Value>, Diagnostic> {
    let parameters = command.parameters();
    let mut values = Vec::with_capacity(parameters.len());

    for (index, param) in parameters.iter().enumerate() {
        let supplied = args.get(index..).unwrap_or(&[]);

        let value = match (&param.ty, supplied.first()) {
            (_, None) => match &param.default {
                Some(default) => default.clone(),
                None => {
                    return Err(Diagnostic::missing_arguments(
                        command.keyword(),
                        command.hint(),
                        args.len(),
                        command.required_count(),
                    ));
                }
            },
            (ParamType::Array(inner), Some(_)) => {
                let mut items = Vec::with_capacity(supplied.len());
                for token in supplied {
                    let item = convert_token(converter, prefix, token, inner)
                        .map_err(|err| Diagnostic::conversion(&param.name, token, err))?;
                    items.push(item);
                }
                Value::Array(items)
            }
            (ty, Some(token)) => convert_token(converter, prefix, token, ty)
                .map_err(|err| Diagnostic::conversion(&param.name, token, err))?,
        };
        values.push(value);
    }

    let takes_rest = parameters.last().is_some_and(|param| param.ty.is_array());
    if !takes_rest && args.len() > parameters.len() {
        tracing::debug!(
            keyword = command.keyword(),
            ignored = ?&args[parameters.len()..],
            "ignoring extra arguments"
        );
    }

    Ok(values)
}

/// Keyword arguments are matched in their bare form, so `help /give` and
/// `help give` resolve alike.
fn convert_token(
    converter: &TypeConverter,
    prefix: &str,
    token: &str,
    ty: &ParamType,
) -> Result<Value, ConversionError> {
    match ty {
        ParamType::Named(domain) if domain == COMMAND_CATALOG => {
            converter.convert(token.strip_prefix(prefix).unwrap_or(token), ty)
        }
        _ => converter.convert(token, ty),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::convert::StaticEntities;
    use crate::diagnostic::DiagnosticKind;
    use crate::logging::testing::RecordingSink;
    use crate::value::EntityRef;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<Vec<Value>>>>;

    fn recorder(calls: Calls) -> impl Fn(&mut CommandContext<'_>, &Args) -> anyhow::Result<()> {
        move |_: &mut CommandContext<'_>, args: &Args| {
            calls.borrow_mut().push(args.values().to_vec());
            Ok(())
        }
    }

    fn console(calls: &Calls) -> Interpreter {
        let mut definitions = builtin::definitions();
        definitions.extend([
            CommandDefinition::new("setlevel", "set the level", recorder(calls.clone()))
                .required("level", ParamType::Integer)
                .optional("mode", ParamType::String, "normal"),
            CommandDefinition::new("give", "give an item", recorder(calls.clone()))
                .required("item", ParamType::Named("prefab".into()))
                .optional("count", ParamType::Integer, 1),
            CommandDefinition::new("heal", "heal players", recorder(calls.clone()))
                .required("targets", ParamType::array_of(ParamType::Entity)),
            CommandDefinition::new("fail", "always fails", |_, _| bail!("disk on fire")),
            CommandDefinition::new("boom", "always panics", |_, _| panic!("kaboom")),
        ]);
        let converter = TypeConverter::new(Box::new(StaticEntities(vec![
            EntityRef::new(1, "Bob"),
            EntityRef::new(2, "Bobby"),
            EntityRef::new(3, "Alice"),
        ])))
        .with_catalog("prefab", ["torch", "torch_unlit", "hammer"]);

        Interpreter::new(EngineConfig::default(), definitions, converter).unwrap()
    }

    #[test]
    fn test_setlevel_binds_defaults() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.run("setlevel 5").unwrap();
        console.run("/setlevel 5 hard").unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                vec![Value::Integer(5), Value::from("normal")],
                vec![Value::Integer(5), Value::from("hard")],
            ]
        );
    }

    #[test]
    fn test_missing_arguments_never_invokes_handler() {
        let calls = Calls::default();
        let mut console = console(&calls);

        let err = console.run("setlevel").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MissingArguments);
        assert!(err.message.contains("<int level>"));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let calls = Calls::default();
        let mut console = console(&calls);

        let err = console.run("fly away").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnknownCommand);
        assert_eq!(err.offending_token.as_deref(), Some("fly"));
    }

    #[test]
    fn test_conversion_failure_names_token() {
        let calls = Calls::default();
        let mut console = console(&calls);

        let err = console.run("setlevel five").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConversionFormatError);
        assert_eq!(err.offending_token.as_deref(), Some("five"));

        let err = console.run("give t 2").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConversionTooManyMatches);

        let err = console.run("give sword").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConversionNoMatch);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_partial_names_resolve() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.run("give ham").unwrap();
        console.run("give torch 3").unwrap();
        assert_eq!(calls.borrow()[0], vec![Value::from("hammer"), Value::Integer(1)]);
        assert_eq!(calls.borrow()[1], vec![Value::from("torch"), Value::Integer(3)]);
    }

    #[test]
    fn test_array_parameter_takes_remaining_tokens() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.run("heal bob ali 2").unwrap();
        assert_eq!(
            calls.borrow()[0],
            vec![Value::Array(vec![
                Value::Entity(EntityRef::new(1, "Bob")),
                Value::Entity(EntityRef::new(3, "Alice")),
                Value::Entity(EntityRef::new(2, "Bobby")),
            ])]
        );

        let err = console.run("heal bob carol").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConversionNoMatch);
        assert_eq!(err.offending_token.as_deref(), Some("carol"));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.run("setlevel 1 easy surplus").unwrap();
        assert_eq!(calls.borrow()[0], vec![Value::Integer(1), Value::from("easy")]);
    }

    #[test]
    fn test_handler_error_and_panic_are_reported() {
        let calls = Calls::default();
        let sink = RecordingSink::default();
        let mut console = console(&calls).with_log_sink(Box::new(sink.clone()));

        let err = console.run("fail").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::HandlerExecutionFailure);
        assert!(err.message.contains("/fail"));
        assert!(err.message.contains("disk on fire"));

        let err = console.run("boom").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::HandlerExecutionFailure);
        assert!(err.message.contains("kaboom"));

        let failures = sink.failures.borrow();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, "/fail");
        assert!(failures[1].1.contains("kaboom"));

        drop(failures);
        // The loop survives and keeps dispatching.
        console.run("setlevel 2").unwrap();
    }

    #[test]
    fn test_handler_failure_is_logged_once() {
        let calls = Calls::default();
        let sink = RecordingSink::default();
        let mut console = console(&calls).with_log_sink(Box::new(sink.clone()));

        console.run("fail").unwrap_err();
        console.run_chain("boom; nope");

        assert_eq!(sink.failures.borrow().len(), 2);
        assert_eq!(*sink.diagnostics.borrow(), vec![DiagnosticKind::UnknownCommand]);
    }

    #[test]
    fn test_alias_expands_first_token_only() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.aliases_mut().set_alias("sl", "setlevel 9").unwrap();
        console.run("sl hard").unwrap();
        assert_eq!(calls.borrow()[0], vec![Value::Integer(9), Value::from("hard")]);

        // Not in first position: left alone.
        let err = console.run("setlevel sl").unwrap_err();
        assert_eq!(err.offending_token.as_deref(), Some("sl"));
    }

    #[test]
    fn test_alias_is_single_hop() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.aliases_mut().set_alias("g", "give torch 5").unwrap();
        console.aliases_mut().set_alias("h", "g").unwrap();

        console.run("g").unwrap();
        assert_eq!(calls.borrow()[0], vec![Value::from("torch"), Value::Integer(5)]);

        let err = console.run("h").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnknownCommand);
        assert_eq!(err.offending_token.as_deref(), Some("g"));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_run_chain() {
        let calls = Calls::default();
        let mut console = console(&calls);

        let results = console.run_chain("setlevel 1; nope; setlevel 2 \"a;b\";");
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind, DiagnosticKind::UnknownCommand);
        assert!(results[2].is_ok());
        assert_eq!(calls.borrow()[1], vec![Value::Integer(2), Value::from("a;b")]);
    }

    #[test]
    fn test_chained_alias_runs_each_command() {
        let calls = Calls::default();
        let mut console = console(&calls);

        console.aliases_mut().set_alias("both", "setlevel 1; setlevel 2").unwrap();
        let results = console.run_chain("both");
        assert_eq!(results.len(), 2);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_escaped_separator_survives_alias_expansion() {
        let calls = Calls::default();
        let mut console = console(&calls);
        console.aliases_mut().set_alias("sl", "setlevel 4").unwrap();

        let results = console.run_chain(r"sl a\;b");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        assert_eq!(*calls.borrow(), vec![vec![Value::Integer(4), Value::from("a;b")]]);
    }

    #[test]
    fn test_chained_alias_passes_rest_to_last_command() {
        let calls = Calls::default();
        let mut console = console(&calls);
        console.aliases_mut().set_alias("both", "setlevel 1; setlevel 2").unwrap();

        let results = console.run_chain(r"both x\;y");
        assert_eq!(results.len(), 2);
        assert_eq!(
            *calls.borrow(),
            vec![
                vec![Value::Integer(1), Value::from("normal")],
                vec![Value::Integer(2), Value::from("x;y")],
            ]
        );
    }

    #[test]
    fn test_empty_line_is_a_no_op() {
        let calls = Calls::default();
        let mut console = console(&calls);
        assert!(console.run("   ").is_ok());
        assert!(console.run_chain(";;").is_empty());
    }

    #[test]
    fn test_complete() {
        let calls = Calls::default();
        let mut console = console(&calls);
        console.aliases_mut().set_alias("sl", "setlevel 1").unwrap();

        assert_eq!(console.complete("se"), vec!["setlevel"]);
        assert_eq!(console.complete("/se"), vec!["/setlevel"]);
        assert_eq!(console.complete("s"), vec!["setlevel", "sl"]);
        assert_eq!(console.complete("give to"), vec!["torch", "torch_unlit"]);
        assert_eq!(console.complete("heal bob b"), vec!["Bob", "Bobby"]);
        assert_eq!(console.complete("setlevel 1; give h"), vec!["hammer"]);
        assert!(console.complete("nope x").is_empty());
    }

    #[test]
    fn test_get_command_is_stable() {
        let calls = Calls::default();
        let console = console(&calls);
        let first = console.get_command("setlevel").unwrap();
        let second = console.get_command("/setlevel").unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.hint(), "<int level> [string mode=normal]");
    }
}
