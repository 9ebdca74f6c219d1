//! Binder: descriptor + raw args → validated, typed command instance.
//!
//! ```text
//! raw args → tokenize → resolve (argv, env, default) → validate all → convert all → factory
//! ```
//!
//! Nothing is converted until every raw value has passed validation, and the
//! command factory only runs once every value converted. Identical input
//! always yields an identical result.

mod tokenizer;
mod values;

pub use tokenizer::{tokenize, wants_help, Token, END_OF_OPTIONS};
pub use values::{BoundValue, BoundValues, ValueSource};

use std::fmt;
use std::sync::Arc;

use crate::config::EnvSource;
use crate::error::{choice_message, BindError, Target};
use crate::metadata::{CommandDescriptor, OptionDescriptor};
use crate::runner::Command;
use crate::types::{split_joined, CaseMode, TypeId, TypeParser, TypeRegistry};

/// A fully populated command, ready to run.
pub struct BoundCommand {
    path: Vec<String>,
    values: BoundValues,
    command: Box<dyn Command>,
}

impl BoundCommand {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path.join(" ")
    }

    pub fn values(&self) -> &BoundValues {
        &self.values
    }

    pub fn into_command(self) -> Box<dyn Command> {
        self.command
    }
}

impl fmt::Debug for BoundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCommand")
            .field("path", &self.path)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// A field whose raw values are resolved but not yet converted.
struct Pending<'d> {
    field: &'d str,
    target: Target,
    parser: Arc<dyn TypeParser>,
    raws: Vec<String>,
    source: ValueSource,
    choices: &'d [String],
    case: CaseMode,
}

pub struct Binder<'a> {
    types: &'a TypeRegistry,
    env: &'a dyn EnvSource,
}

impl<'a> Binder<'a> {
    pub fn new(types: &'a TypeRegistry, env: &'a dyn EnvSource) -> Self {
        Self { types, env }
    }

    /// Bind raw args (command path already stripped) and instantiate the command.
    pub fn bind(
        &self,
        descriptor: &CommandDescriptor,
        raw_args: &[String],
    ) -> Result<BoundCommand, BindError> {
        let values = self.bind_values(descriptor, raw_args)?;
        let command = descriptor.factory().create(&values)?;
        tracing::debug!(command = %descriptor.name(), fields = values.len(), "bound command");
        Ok(BoundCommand {
            path: descriptor.path().to_vec(),
            values,
            command,
        })
    }

    /// Resolve, validate and convert every field without instantiating.
    pub fn bind_values(
        &self,
        descriptor: &CommandDescriptor,
        raw_args: &[String],
    ) -> Result<BoundValues, BindError> {
        if wants_help(raw_args) {
            return Err(BindError::HelpRequested {
                command: descriptor.name(),
            });
        }

        let options = descriptor.options();
        let tokens = tokenize(raw_args, options, !descriptor.arguments().is_empty())?;

        let mut occurrences: Vec<Vec<String>> = vec![Vec::new(); options.len()];
        let mut positionals = Vec::new();
        for token in tokens {
            match token {
                Token::Flag { option, value, .. } => {
                    occurrences[option].push(value.unwrap_or_else(|| "true".to_string()));
                }
                Token::Positional(arg) => positionals.push(arg),
            }
        }

        let mut pending = Vec::with_capacity(options.len() + descriptor.arguments().len());

        for (option, raws) in options.iter().zip(occurrences) {
            pending.push(self.resolve_option(option, raws)?);
        }

        let mut remaining = positionals.into_iter();
        for argument in descriptor.arguments() {
            let target = Target::Argument {
                name: argument.name.clone(),
                position: argument.position,
            };
            let parser = self.parser(&argument.value_type, &target)?;
            let raws: Vec<String> = if parser.accumulates() {
                remaining.by_ref().collect()
            } else {
                remaining.next().into_iter().collect()
            };

            // An empty value never satisfies a required argument
            if argument.required && raws.iter().all(|raw| raw.is_empty()) {
                return Err(BindError::MissingRequiredArgument {
                    argument: argument.name.clone(),
                    position: argument.position,
                });
            }
            let source = if raws.is_empty() {
                ValueSource::Default
            } else {
                ValueSource::CommandLine
            };

            pending.push(Pending {
                field: &argument.name,
                target,
                parser,
                raws,
                source,
                choices: &argument.choices,
                case: argument.case_mode(),
            });
        }

        if let Some(extra) = remaining.next() {
            return Err(BindError::UnexpectedArgument { value: extra });
        }

        for field in &mut pending {
            validate(field)?;
        }

        let mut values = BoundValues::new();
        for field in pending {
            let value = convert(&field)?;
            values.push(field.field, value, field.source);
        }
        Ok(values)
    }

    fn resolve_option<'d>(
        &self,
        option: &'d OptionDescriptor,
        raws: Vec<String>,
    ) -> Result<Pending<'d>, BindError> {
        let target = Target::Option {
            flag: option.display_flag(),
        };
        let parser = self.parser(&option.value_type, &target)?;

        let (raws, source) = if !raws.is_empty() {
            (raws, ValueSource::CommandLine)
        } else if let Some(value) = option
            .env
            .as_deref()
            .and_then(|name| self.env.var(name))
            .filter(|value| !value.is_empty())
        {
            let raws = if parser.accumulates() {
                split_joined(&value)
            } else {
                vec![value]
            };
            (raws, ValueSource::Environment)
        } else {
            (Vec::new(), ValueSource::Default)
        };

        // Scalars: last occurrence wins
        let raws = if parser.accumulates() {
            raws
        } else {
            raws.into_iter().last().into_iter().collect()
        };

        // Absent or empty: an empty value never satisfies a required option
        if option.required && raws.iter().all(|raw| raw.is_empty()) {
            return Err(BindError::MissingRequiredOption {
                option: option.name(),
                flag: option.display_flag(),
            });
        }

        Ok(Pending {
            field: &option.field,
            target,
            parser,
            raws,
            source,
            choices: &option.choices,
            case: option.case_mode(),
        })
    }

    fn parser(&self, type_id: &TypeId, target: &Target) -> Result<Arc<dyn TypeParser>, BindError> {
        self.types
            .resolve(type_id)
            .map_err(|source| BindError::Unsupported {
                target: target.clone(),
                source,
            })
    }
}

/// Check every raw value. Case-insensitive choice matches are rewritten to
/// the declared spelling.
fn validate(field: &mut Pending<'_>) -> Result<(), BindError> {
    for raw in &mut field.raws {
        if !field.choices.is_empty() && !raw.is_empty() {
            let matched = field.choices.iter().find(|choice| match field.case {
                CaseMode::Sensitive => *choice == raw,
                CaseMode::Insensitive => choice.eq_ignore_ascii_case(raw),
            });
            match matched {
                Some(choice) => *raw = choice.clone(),
                None => {
                    return Err(BindError::Validation {
                        target: field.target.clone(),
                        message: choice_message(raw, field.choices),
                    });
                }
            }
        }
        field
            .parser
            .validate(raw)
            .map_err(|message| BindError::Validation {
                target: field.target.clone(),
                message,
            })?;
    }
    Ok(())
}

fn convert(field: &Pending<'_>) -> Result<crate::types::Value, BindError> {
    let result = match field.raws.as_slice() {
        [] => return Ok(field.parser.zero()),
        [raw] if !field.parser.accumulates() => field.parser.parse(raw),
        raws => field.parser.parse_all(raws),
    };
    result.map_err(|e| BindError::InvalidValue {
        target: field.target.clone(),
        value: e
            .value()
            .map(String::from)
            .unwrap_or_else(|| field.raws.join(" ")),
        reason: e.reason(),
    })
}
