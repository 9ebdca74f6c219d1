//! Tokenizer: raw args → flag occurrences and positionals.

use crate::error::BindError;
use crate::metadata::{OptionDescriptor, HELP_LONG, HELP_SHORT};

/// End-of-options marker.
pub const END_OF_OPTIONS: &str = "--";

/// A tokenized argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Occurrence of a declared option.
    Flag {
        /// Index into the command's option list.
        option: usize,
        /// Flag as written, without any inline value.
        flag: String,
        /// Explicit or consumed value. `None` only for switches.
        value: Option<String>,
    },
    /// Positional argument, in order.
    Positional(String),
}

fn looks_like_flag(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

fn is_negative_number(arg: &str) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|rest| !rest.is_empty() && rest.parse::<f64>().is_ok())
}

/// `--name=svc` → (`--name`, `Some("svc")`).
fn split_inline(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((flag, value)) => (flag, Some(value)),
        None => (arg, None),
    }
}

/// Whether the reserved help flag appears before any `--`.
pub fn wants_help(raw_args: &[String]) -> bool {
    let long = format!("--{}", HELP_LONG);
    let short = format!("-{}", HELP_SHORT);
    raw_args
        .iter()
        .take_while(|arg| arg.as_str() != END_OF_OPTIONS)
        .any(|arg| {
            let (flag, _) = split_inline(arg);
            flag == long || flag == short
        })
}

/// Tokenize raw args against a command's options.
///
/// `accepts_positionals` lets negative numbers pass as positionals instead
/// of being reported as unknown flags.
pub fn tokenize(
    raw_args: &[String],
    options: &[OptionDescriptor],
    accepts_positionals: bool,
) -> Result<Vec<Token>, BindError> {
    let mut tokens = Vec::new();
    let mut iter = raw_args.iter().peekable();
    let mut options_done = false;

    while let Some(arg) = iter.next() {
        if options_done || !looks_like_flag(arg) {
            tokens.push(Token::Positional(arg.clone()));
            continue;
        }
        if arg == END_OF_OPTIONS {
            options_done = true;
            continue;
        }

        let (flag, inline) = split_inline(arg);
        let Some(index) = options.iter().position(|o| o.matches(flag)) else {
            if accepts_positionals && is_negative_number(arg) {
                tokens.push(Token::Positional(arg.clone()));
                continue;
            }
            return Err(BindError::UnknownOption {
                flag: flag.to_string(),
            });
        };
        let option = &options[index];

        let value = if option.is_switch() || inline.is_some() {
            inline.map(String::from)
        } else {
            // Consume next arg unless it looks like another flag
            match iter.peek() {
                Some(next) if !looks_like_flag(next) || is_negative_number(next) => {
                    iter.next().cloned()
                }
                Some(_) | None => {
                    return Err(BindError::MissingValue {
                        flag: flag.to_string(),
                    })
                }
            }
        };

        tokens.push(Token::Flag {
            option: index,
            flag: flag.to_string(),
            value,
        });
    }

    Ok(tokens)
}
