use argh::FromArgs;
use console_commands::lexer::join_tokens;
use console_commands::{
    CommandDefinition, EngineConfig, EntityRef, Interpreter, ParamType, StaticEntities,
    TypeConverter, builtin,
};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::Level;

#[derive(FromArgs)]
/// Interactive demo console for the command engine.
struct Cli {
    #[argh(option)]
    /// keyword prefix, overrides CONSOLE_PREFIX
    prefix: Option<String>,

    #[argh(option)]
    /// command chaining separator, overrides CONSOLE_SEPARATOR
    separator: Option<char>,

    #[argh(switch, short = 'v')]
    /// log every dispatch
    verbose: bool,

    #[argh(option, short = 'c')]
    /// run this line and exit instead of starting the prompt
    command: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli: Cli = argh::from_env();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = EngineConfig::from_env();
    if let Some(prefix) = cli.prefix {
        config.prefix = prefix;
    }
    if let Some(separator) = cli.separator {
        config.separator = separator;
    }

    let console = Rc::new(RefCell::new(demo_console(config)?));

    if let Some(line) = cli.command {
        submit(&mut console.borrow_mut(), &line);
        return Ok(());
    }

    repl(console)
}

fn demo_console(config: EngineConfig) -> anyhow::Result<Interpreter> {
    let level = Rc::new(RefCell::new((1_i64, "normal".to_string())));

    let mut definitions = builtin::definitions();
    definitions.extend([
        CommandDefinition::new("echo", "print the words back", |ctx, args| {
            let words: Vec<String> = args.array(0)?.iter().map(ToString::to_string).collect();
            ctx.print(join_tokens(&words));
            Ok(())
        })
        .required("words", ParamType::array_of(ParamType::String)),
        CommandDefinition::new("setlevel", "set the difficulty level", move |ctx, args| {
            let mut level = level.borrow_mut();
            *level = (args.int(0)?, args.str(1)?.to_string());
            ctx.print(format!("level {} ({})", level.0, level.1));
            Ok(())
        })
        .required("level", ParamType::Integer)
        .optional("mode", ParamType::String, "normal")
        .autocomplete(|index| match index {
            1 => vec!["easy".into(), "normal".into(), "hard".into()],
            _ => Vec::new(),
        }),
        CommandDefinition::new("give", "give an item to a player", |ctx, args| {
            let item = args.str(0)?;
            let count = args.int(1)?;
            let player = args.entity(2)?;
            ctx.print(format!("gave {} x{} to {}", item, count, player.name));
            Ok(())
        })
        .required("item", ParamType::Named("item".into()))
        .optional("count", ParamType::Integer, 1)
        .optional("player", ParamType::Entity, EntityRef::new(1, "Host")),
        CommandDefinition::new("heal", "heal one or more players", |ctx, args| {
            for player in args.array(0)? {
                ctx.print(format!("healed {}", player));
            }
            Ok(())
        })
        .required("players", ParamType::array_of(ParamType::Entity)),
    ]);

    let converter = TypeConverter::new(Box::new(StaticEntities(vec![
        EntityRef::new(1, "Host"),
        EntityRef::new(2, "Bob"),
        EntityRef::new(3, "Bobby Tables"),
        EntityRef::new(4, "Alice"),
    ])))
    .with_catalog("item", ["torch", "torch_unlit", "hammer", "Red Potion"]);

    Ok(Interpreter::new(config, definitions, converter)?)
}

/// Run a submitted line and print what it produced.
fn submit(console: &mut Interpreter, line: &str) {
    for result in console.run_chain(line) {
        for output in console.output().drain() {
            println!("{}", output);
        }
        if let Err(diagnostic) = result {
            println!("{}", diagnostic);
        }
    }
}

#[derive(Helper, Highlighter, Hinter, Validator)]
struct ConsoleHelper {
    console: Rc<RefCell<Interpreter>>,
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let console = self.console.borrow();
        let start = word_start(typed, console.config().separator);
        let candidates = console
            .complete(typed)
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: join_tokens(&[candidate]),
            })
            .collect();
        Ok((start, candidates))
    }
}

/// Byte offset where the word being completed begins, opening quote included,
/// so the quoted replacement overwrites the whole word.
fn word_start(typed: &str, separator: char) -> usize {
    let mut start = 0;
    let mut in_quote = false;
    for (i, c) in typed.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            c if !in_quote && (c.is_whitespace() || c == separator) => start = i + c.len_utf8(),
            _ => {}
        }
    }
    start
}

fn repl(console: Rc<RefCell<Interpreter>>) -> anyhow::Result<()> {
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ConsoleHelper {
        console: console.clone(),
    }));

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                submit(&mut console.borrow_mut(), &line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_start_covers_open_quote() {
        assert_eq!(word_start("give \"Red P", ';'), 5);
        assert_eq!(word_start("give to", ';'), 5);
        assert_eq!(word_start("give ", ';'), 5);
        assert_eq!(word_start("echo a;gi", ';'), 7);
        assert_eq!(word_start("se", ';'), 0);
    }

    #[test]
    fn test_completion_replaces_quoted_word() {
        let console = demo_console(EngineConfig::default()).unwrap();
        let typed = "give \"Red P";
        let start = word_start(typed, ';');
        let candidates = console.complete(typed);
        assert_eq!(candidates, vec!["Red Potion"]);

        let completed = format!("{}{}", &typed[..start], join_tokens(&candidates));
        assert_eq!(completed, "give \"Red Potion\"");
    }
}
