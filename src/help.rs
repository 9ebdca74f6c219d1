//! Usage text. The core only supplies descriptors; renderers decide layout.

use std::fmt::Write;

use crate::metadata::{ArgumentDescriptor, CommandDescriptor, OptionDescriptor, HELP_LONG, HELP_SHORT};

pub trait HelpRenderer: Send + Sync {
    /// Usage for one command.
    fn render_command(&self, descriptor: &CommandDescriptor) -> String;

    /// Overview of every registered command.
    fn render_index(&self, commands: &[&CommandDescriptor]) -> String;
}

/// Uncoloured, column-aligned text.
#[derive(Debug, Clone)]
pub struct PlainHelp {
    program: String,
}

impl PlainHelp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn usage_line(&self, descriptor: &CommandDescriptor) -> String {
        let mut line = format!("Usage: {} {}", self.program, descriptor.name());
        if !descriptor.options().is_empty() {
            line.push_str(" [OPTIONS]");
        }
        for argument in descriptor.arguments() {
            let many = if argument.value_type.is_collection() { "..." } else { "" };
            if argument.required {
                let _ = write!(line, " <{}{}>", argument.name, many);
            } else {
                let _ = write!(line, " [{}{}]", argument.name, many);
            }
        }
        line
    }
}

impl Default for PlainHelp {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

impl HelpRenderer for PlainHelp {
    fn render_command(&self, descriptor: &CommandDescriptor) -> String {
        let mut out = String::new();
        if !descriptor.description().is_empty() {
            let _ = writeln!(out, "{}\n", descriptor.description());
        }
        let _ = writeln!(out, "{}", self.usage_line(descriptor));

        if !descriptor.arguments().is_empty() {
            let rows: Vec<(String, String)> = descriptor.arguments().iter().map(argument_row).collect();
            out.push_str("\nArguments:\n");
            write_rows(&mut out, &rows);
        }

        let mut rows: Vec<(String, String)> = descriptor.options().iter().map(option_row).collect();
        rows.push((
            format!("-{}, --{}", HELP_SHORT, HELP_LONG),
            "Print help".to_string(),
        ));
        out.push_str("\nOptions:\n");
        write_rows(&mut out, &rows);
        out
    }

    fn render_index(&self, commands: &[&CommandDescriptor]) -> String {
        let mut out = format!("Usage: {} <COMMAND> [ARGS]...\n\nCommands:\n", self.program);
        let rows: Vec<(String, String)> = commands
            .iter()
            .map(|c| (c.name(), c.description().to_string()))
            .collect();
        write_rows(&mut out, &rows);
        let _ = write!(
            out,
            "\nRun '{} <COMMAND> --{}' for details on a command.\n",
            self.program, HELP_LONG
        );
        out
    }
}

fn option_row(option: &OptionDescriptor) -> (String, String) {
    let mut flags = match (option.short, &option.long) {
        (Some(s), Some(l)) => format!("-{}, --{}", s, l),
        (Some(s), None) => format!("-{}", s),
        (None, Some(l)) => format!("    --{}", l),
        (None, None) => option.field.clone(),
    };
    if !option.is_switch() {
        let _ = write!(flags, " <{}>", option.value_type);
    }

    let mut text = option.description.clone();
    append_note(&mut text, option.required.then(|| "required".to_string()));
    append_note(&mut text, option.env.as_ref().map(|var| format!("env: {}", var)));
    append_note(&mut text, choices_note(&option.choices));
    (flags, text)
}

fn argument_row(argument: &ArgumentDescriptor) -> (String, String) {
    let mut text = argument.description.clone();
    append_note(&mut text, argument.required.then(|| "required".to_string()));
    append_note(&mut text, choices_note(&argument.choices));
    (format!("<{}>", argument.name), text)
}

fn choices_note(choices: &[String]) -> Option<String> {
    if choices.is_empty() {
        None
    } else {
        Some(format!("possible values: {}", choices.join(", ")))
    }
}

fn append_note(text: &mut String, note: Option<String>) {
    if let Some(note) = note {
        if !text.is_empty() {
            text.push(' ');
        }
        let _ = write!(text, "[{}]", note);
    }
}

fn write_rows(out: &mut String, rows: &[(String, String)]) {
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    for (left, right) in rows {
        let line = format!("  {:<width$}  {}", left, right, width = width);
        let _ = writeln!(out, "{}", line.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundValues;
    use crate::error::BindError;
    use crate::runner::{Command, CommandResult, InvocationContext};
    use crate::types::TypeId;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct Noop;

    impl Command for Noop {
        fn execute(self: Box<Self>, _ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
            async { Ok(()) }.boxed()
        }
    }

    fn greet() -> CommandDescriptor {
        CommandDescriptor::builder("greet")
            .about("Say hello")
            .option(
                OptionDescriptor::new("name", TypeId::String)
                    .short('n')
                    .env("GREET_NAME")
                    .required()
                    .describe("Who to greet"),
            )
            .option(OptionDescriptor::new("loud", TypeId::Bool))
            .argument(ArgumentDescriptor::new(0, "count", TypeId::I32).describe("Repetitions"))
            .build_with(|_: &BoundValues| -> Result<Box<dyn Command>, BindError> {
                Ok(Box::new(Noop))
            })
            .unwrap()
    }

    #[test]
    fn command_help_lists_everything() {
        let text = PlainHelp::new("demo").render_command(&greet());
        assert!(text.starts_with("Say hello\n"));
        assert!(text.contains("Usage: demo greet [OPTIONS] [count]"));
        assert!(text.contains("-n, --name <string>  Who to greet [required] [env: GREET_NAME]"));
        assert!(text.contains("--loud\n"));
        assert!(text.contains("<count>"));
        assert!(text.contains("-h, --help"));
    }

    #[test]
    fn index_lists_commands_in_order() {
        let greet = greet();
        let env = CommandDescriptor::builder("env show")
            .about("Print the environment")
            .build_with(|_: &BoundValues| -> Result<Box<dyn Command>, BindError> {
                Ok(Box::new(Noop))
            })
            .unwrap();
        let text = PlainHelp::new("demo").render_index(&[&greet, &env]);
        let greet_at = text.find("greet").unwrap();
        let env_at = text.find("env show").unwrap();
        assert!(greet_at < env_at);
        assert!(text.contains("Print the environment"));
    }
}
