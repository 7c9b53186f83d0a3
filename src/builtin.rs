//! Commands every console gets: help and alias management.
//!
//! They are ordinary [`CommandDefinition`]s; the embedding application
//! registers them next to its own commands.

use crate::command::{Args, CommandContext, CommandDefinition};
use crate::interpreter::COMMAND_CATALOG;
use crate::lexer::join_tokens;
use crate::value::{ParamType, Value};
use anyhow::Result;

/// Definitions of `help`, `alias`, `unalias` and `aliases`.
pub fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("help", "list commands or describe one", help)
            .optional("command", ParamType::Named(COMMAND_CATALOG.to_string()), ""),
        CommandDefinition::new("alias", "show an alias, or set it to the given line", alias)
            .required("name", ParamType::String)
            .optional(
                "replacement",
                ParamType::array_of(ParamType::String),
                Value::Array(Vec::new()),
            ),
        CommandDefinition::new("unalias", "remove an alias", unalias)
            .required("name", ParamType::String),
        CommandDefinition::new("aliases", "list all aliases", aliases),
    ]
}

fn help(ctx: &mut CommandContext<'_>, args: &Args) -> Result<()> {
    let wanted = args.str(0)?;
    if wanted.is_empty() {
        for command in ctx.registry.commands() {
            ctx.print(usage(command.keyword(), command.hint(), command.description()));
        }
        return Ok(());
    }

    if let Some(command) = ctx.registry.lookup(wanted) {
        ctx.print(usage(command.keyword(), command.hint(), command.description()));
    }
    Ok(())
}

fn usage(keyword: &str, hint: &str, description: &str) -> String {
    if hint.is_empty() {
        format!("{} - {}", keyword, description)
    } else {
        format!("{} {} - {}", keyword, hint, description)
    }
}

fn alias(ctx: &mut CommandContext<'_>, args: &Args) -> Result<()> {
    let name = args.str(0)?;
    let words: Vec<String> = args.array(1)?.iter().map(ToString::to_string).collect();

    if words.is_empty() {
        match ctx.aliases.get(name) {
            Some(replacement) => ctx.print(format!("{} = {}", name, replacement)),
            None => ctx.print(format!("no alias named '{}'", name)),
        }
        return Ok(());
    }

    let replacement = join_tokens(&words);
    match ctx.aliases.set_alias(name, &replacement) {
        Ok(_) => ctx.print(format!("{} = {}", name, replacement)),
        Err(err) => ctx.print(err.to_string()),
    }
    Ok(())
}

fn unalias(ctx: &mut CommandContext<'_>, args: &Args) -> Result<()> {
    let name = args.str(0)?;
    match ctx.aliases.remove_alias(name) {
        Ok(replacement) => ctx.print(format!("removed {} = {}", name, replacement)),
        Err(err) => ctx.print(err.to_string()),
    }
    Ok(())
}

fn aliases(ctx: &mut CommandContext<'_>, _args: &Args) -> Result<()> {
    if ctx.aliases.is_empty() {
        ctx.print("no aliases");
        return Ok(());
    }
    let lines: Vec<String> = ctx
        .aliases
        .list_aliases()
        .iter()
        .map(|(name, replacement)| format!("{} = {}", name, replacement))
        .collect();
    for line in lines {
        ctx.print(line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::convert::TypeConverter;
    use crate::diagnostic::DiagnosticKind;
    use crate::interpreter::Interpreter;

    fn console() -> Interpreter {
        let mut definitions = definitions();
        definitions.push(
            CommandDefinition::new("give", "give an item", |ctx, args| {
                ctx.print(format!("gave {} x{}", args.str(0)?, args.int(1)?));
                Ok(())
            })
            .required("item", ParamType::String)
            .optional("count", ParamType::Integer, 1),
        );
        Interpreter::new(EngineConfig::default(), definitions, TypeConverter::default()).unwrap()
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut console = console();
        console.run("help").unwrap();

        let lines = console.output().drain();
        assert_eq!(lines.len(), 5);
        assert!(lines.contains(&"/give <string item> [int count=1] - give an item".to_string()));
        assert!(lines.contains(&"/aliases - list all aliases".to_string()));
    }

    #[test]
    fn test_help_partial_command_name() {
        let mut console = console();
        console.run("help gi").unwrap();
        assert_eq!(
            console.output().drain(),
            vec!["/give <string item> [int count=1] - give an item"]
        );

        let err = console.run("help nothing").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConversionNoMatch);
    }

    #[test]
    fn test_help_accepts_the_printed_keyword() {
        let mut console = console();
        console.run("help /give").unwrap();
        console.run("help /gi").unwrap();
        assert_eq!(
            console.output().drain(),
            vec![
                "/give <string item> [int count=1] - give an item",
                "/give <string item> [int count=1] - give an item",
            ]
        );

        let err = console.run("help /nothing").unwrap_err();
        assert_eq!(err.offending_token.as_deref(), Some("/nothing"));
    }

    #[test]
    fn test_alias_round_trip_through_commands() {
        let mut console = console();

        console.run("alias g give \"Red Potion\" 5").unwrap();
        assert_eq!(console.aliases().get("g"), Some("give \"Red Potion\" 5"));
        console.output().drain();

        console.run("g").unwrap();
        assert_eq!(console.output().drain(), vec!["gave Red Potion x5"]);

        console.run("alias g").unwrap();
        console.run("aliases").unwrap();
        console.run("unalias g").unwrap();
        console.run("aliases").unwrap();
        assert_eq!(
            console.output().drain(),
            vec![
                "g = give \"Red Potion\" 5",
                "g = give \"Red Potion\" 5",
                "removed g = give \"Red Potion\" 5",
                "no aliases",
            ]
        );
    }

    #[test]
    fn test_alias_rejections_are_printed() {
        let mut console = console();

        console.run("alias give say hi").unwrap();
        console.run("unalias nope").unwrap();
        console.run("alias nope").unwrap();

        assert_eq!(
            console.output().drain(),
            vec![
                "alias 'give' collides with a command keyword",
                "no alias named 'nope'",
                "no alias named 'nope'",
            ]
        );
        assert!(console.aliases().is_empty());
    }
}
