//! Error taxonomy for type conversion, descriptor validation, binding and dispatch.
//!
//! Every error that can end an invocation knows its process exit code.

use std::fmt;

use thiserror::Error;

use crate::exit;

/// Builds the user-facing message for a value outside its allowed set.
pub fn choice_message(value: &str, choices: &[String]) -> String {
    format!(
        "'{}' is not a valid choice. Valid choices are:\n{}",
        value,
        choices.join("\n")
    )
}

/// Errors raised by the type registry and individual parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// No parser registered and none can be derived.
    #[error("No parser registered for type '{type_name}'")]
    Unsupported { type_name: String },

    /// Value outside an enumeration or choice set.
    #[error("{}", choice_message(.value, .choices))]
    Argument { value: String, choices: Vec<String> },

    /// Raw text could not be converted.
    #[error("'{value}' is not a valid {type_name}: {reason}")]
    Conversion {
        value: String,
        type_name: String,
        reason: String,
    },

    /// Typed value handed to the wrong parser.
    #[error("Cannot format {found} as {type_name}")]
    Mismatch { type_name: String, found: String },

    #[error("Enumeration '{name}' declares no members")]
    EmptyEnum { name: String },
}

impl TypeError {
    /// Raw text that caused the failure, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            TypeError::Argument { value, .. } | TypeError::Conversion { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Reason without the value prefix, for embedding in binding errors.
    pub fn reason(&self) -> String {
        match self {
            TypeError::Conversion { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// What a binding failure is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An option, by its display flag (`--name` or `-n`).
    Option { flag: String },
    /// A positional argument.
    Argument { name: String, position: usize },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Option { flag } => write!(f, "option '{}'", flag),
            Target::Argument { name, position } => {
                write!(f, "argument '{}' (position {})", name, position)
            }
        }
    }
}

/// Errors that abort binding. Binding never partially succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("Missing required option '{flag}'")]
    MissingRequiredOption { option: String, flag: String },

    #[error("Missing required argument '{argument}' (position {position})")]
    MissingRequiredArgument { argument: String, position: usize },

    /// Conversion failed; `value` is the original text.
    #[error("Invalid value '{value}' for {target}: {reason}")]
    InvalidValue {
        target: Target,
        value: String,
        reason: String,
    },

    /// A choice constraint or the parser's own validation rejected the value.
    #[error("Invalid value for {target}: {message}")]
    Validation { target: Target, message: String },

    #[error("Unknown option '{flag}'")]
    UnknownOption { flag: String },

    #[error("Option '{flag}' requires a value")]
    MissingValue { flag: String },

    #[error("Unexpected argument '{value}'")]
    UnexpectedArgument { value: String },

    /// The reserved help flag was given.
    #[error("Help requested for '{command}'")]
    HelpRequested { command: String },

    #[error("Cannot bind {target}: {source}")]
    Unsupported {
        target: Target,
        #[source]
        source: TypeError,
    },

    /// The command factory refused the bound values.
    #[error("Failed to create command '{command}': {reason}")]
    Instantiate { command: String, reason: String },

    /// A factory asked for a field that is absent or of another type.
    #[error("Field '{field}' is missing or not a {expected}")]
    Field {
        field: String,
        expected: &'static str,
    },
}

impl BindError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BindError::MissingRequiredOption { .. } | BindError::MissingRequiredArgument { .. } => {
                exit::MISSING_REQUIRED
            }
            BindError::HelpRequested { .. } => exit::SUCCESS,
            BindError::Unsupported { .. }
            | BindError::Instantiate { .. }
            | BindError::Field { .. } => exit::UNEXPECTED,
            BindError::InvalidValue { .. }
            | BindError::Validation { .. }
            | BindError::UnknownOption { .. }
            | BindError::MissingValue { .. }
            | BindError::UnexpectedArgument { .. } => exit::USAGE,
        }
    }

    /// Stable identifier for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            BindError::MissingRequiredOption { .. } => "missing_required_option",
            BindError::MissingRequiredArgument { .. } => "missing_required_argument",
            BindError::InvalidValue { .. } => "invalid_value",
            BindError::Validation { .. } => "argument_error",
            BindError::UnknownOption { .. } => "unknown_option",
            BindError::MissingValue { .. } => "missing_value",
            BindError::UnexpectedArgument { .. } => "unexpected_argument",
            BindError::HelpRequested { .. } => "help_requested",
            BindError::Unsupported { .. } => "unsupported_type",
            BindError::Instantiate { .. } => "instantiate",
            BindError::Field { .. } => "field",
        }
    }
}

/// Structural problems in a command declaration, caught at registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Command path is empty")]
    EmptyPath,

    #[error("Invalid command path segment '{segment}'")]
    InvalidSegment { segment: String },

    #[error("Option '{field}' declares neither a short nor a long flag")]
    NoFlagName { field: String },

    #[error("Invalid flag name '{flag}'")]
    InvalidFlag { flag: String },

    #[error("Flag '{flag}' is reserved for help")]
    ReservedFlag { flag: String },

    #[error("Command '{command}' declares flag '{flag}' more than once")]
    DuplicateFlag { command: String, flag: String },

    #[error("Command '{command}' declares field '{field}' more than once")]
    DuplicateField { command: String, field: String },

    #[error("Command '{command}' declares position {position} more than once")]
    DuplicatePosition { command: String, position: usize },

    #[error("Command '{command}' skips argument position {expected} (next declared is {found})")]
    PositionGap {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("Command '{command}': required argument '{argument}' follows an optional one")]
    RequiredAfterOptional { command: String, argument: String },

    #[error("Command '{command}': only the last argument may be a collection ('{argument}' is not last)")]
    CollectionNotLast { command: String, argument: String },
}

/// Errors from command registration and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Command '{path}' is already registered")]
    DuplicateCommand { path: String },

    #[error("{}", not_found_message(.requested, .suggestions))]
    CommandNotFound {
        requested: String,
        suggestions: Vec<String>,
    },

    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),
}

impl DispatchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::CommandNotFound { .. } => exit::COMMAND_NOT_FOUND,
            DispatchError::DuplicateCommand { .. } | DispatchError::InvalidDescriptor(_) => {
                exit::UNEXPECTED
            }
        }
    }
}

fn not_found_message(requested: &str, suggestions: &[String]) -> String {
    let mut message = format!("Command '{}' not found", requested);
    if !suggestions.is_empty() {
        message.push_str("\n\nDid you mean:");
        for suggestion in suggestions {
            message.push_str("\n    ");
            message.push_str(suggestion);
        }
    }
    message
}
