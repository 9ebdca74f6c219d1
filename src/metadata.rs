//! Command metadata: static descriptors built once at registration time.
//!
//! Descriptors are immutable after [`CommandBuilder::build`] validates them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::binder::BoundValues;
use crate::error::{BindError, DescriptorError};
use crate::runner::Command;
use crate::types::{CaseMode, TypeId};

/// Long form of the reserved help flag.
pub const HELP_LONG: &str = "help";
/// Short form of the reserved help flag.
pub const HELP_SHORT: char = 'h';

/// A named option (`-n`, `--name`).
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    /// Field the resolved value is assigned to.
    pub field: String,
    pub short: Option<char>,
    /// Long flag without the leading `--`.
    pub long: Option<String>,
    /// Environment variable consulted when the flag is absent.
    pub env: Option<String>,
    pub required: bool,
    pub value_type: TypeId,
    /// Allowed raw values. Empty means unconstrained.
    pub choices: Vec<String>,
    /// How raw values are matched against `choices` and enumeration members.
    pub case: CaseMode,
    pub description: String,
}

impl OptionDescriptor {
    /// Option with long flag `--<long>`, assigned to field `<long>` (dashes → underscores).
    pub fn new(long: impl Into<String>, value_type: TypeId) -> Self {
        let long = long.into();
        Self {
            field: long.replace('-', "_"),
            short: None,
            long: Some(long),
            env: None,
            required: false,
            value_type,
            choices: Vec::new(),
            case: CaseMode::Sensitive,
            description: String::new(),
        }
    }

    /// Option with only a short flag.
    pub fn short_only(short: char, field: impl Into<String>, value_type: TypeId) -> Self {
        Self {
            field: field.into(),
            short: Some(short),
            long: None,
            env: None,
            required: false,
            value_type,
            choices: Vec::new(),
            case: CaseMode::Sensitive,
            description: String::new(),
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Match enumeration members and choices case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.value_type = self.value_type.ignore_case();
        self.case = CaseMode::Insensitive;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name used in errors: the long flag if present, else the short one.
    pub fn name(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => long.clone(),
            (None, Some(short)) => short.to_string(),
            (None, None) => self.field.clone(),
        }
    }

    /// Preferred display form (`--name`, else `-n`).
    pub fn display_flag(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => format!("--{}", long),
            (None, Some(short)) => format!("-{}", short),
            (None, None) => self.field.clone(),
        }
    }

    /// Check if this descriptor matches a flag token (`--name` or `-n`, no inline value).
    pub fn matches(&self, flag: &str) -> bool {
        if let Some(long) = flag.strip_prefix("--") {
            return self.long.as_deref() == Some(long);
        }
        if let Some(short) = flag.strip_prefix('-') {
            let mut chars = short.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => self.short == Some(c),
                _ => false,
            };
        }
        false
    }

    /// Case mode for choices: insensitive if either the option or its type asks for it.
    pub fn case_mode(&self) -> CaseMode {
        merge_case(self.case, &self.value_type)
    }

    /// Boolean options are present/absent switches.
    pub fn is_switch(&self) -> bool {
        self.value_type.is_switch()
    }
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDescriptor {
    /// Field name, also shown in usage text.
    pub name: String,
    /// Zero-based; contiguous within a command.
    pub position: usize,
    pub value_type: TypeId,
    pub required: bool,
    pub choices: Vec<String>,
    pub case: CaseMode,
    pub description: String,
}

impl ArgumentDescriptor {
    pub fn new(position: usize, name: impl Into<String>, value_type: TypeId) -> Self {
        Self {
            name: name.into(),
            position,
            value_type,
            required: false,
            choices: Vec::new(),
            case: CaseMode::Sensitive,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.value_type = self.value_type.ignore_case();
        self.case = CaseMode::Insensitive;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn case_mode(&self) -> CaseMode {
        merge_case(self.case, &self.value_type)
    }
}

fn merge_case(case: CaseMode, value_type: &TypeId) -> CaseMode {
    match (case, value_type.case_mode()) {
        (CaseMode::Sensitive, CaseMode::Sensitive) => CaseMode::Sensitive,
        _ => CaseMode::Insensitive,
    }
}

/// Creates command instances from bound values.
///
/// This is the seam where a service container hands dependencies to commands:
/// a factory closure can capture whatever the command needs.
pub trait CommandFactory: Send + Sync {
    fn create(&self, values: &BoundValues) -> Result<Box<dyn Command>, BindError>;
}

impl<F> CommandFactory for F
where
    F: Fn(&BoundValues) -> Result<Box<dyn Command>, BindError> + Send + Sync,
{
    fn create(&self, values: &BoundValues) -> Result<Box<dyn Command>, BindError> {
        self(values)
    }
}

/// Command types that can construct themselves from bound values.
pub trait FromBound: Sized {
    fn from_bound(values: &BoundValues) -> Result<Self, BindError>;
}

struct FromBoundFactory<C>(std::marker::PhantomData<fn() -> C>);

impl<C> CommandFactory for FromBoundFactory<C>
where
    C: FromBound + Command,
{
    fn create(&self, values: &BoundValues) -> Result<Box<dyn Command>, BindError> {
        Ok(Box::new(C::from_bound(values)?))
    }
}

/// A registered command: path, options, positional arguments, factory.
#[derive(Clone)]
pub struct CommandDescriptor {
    path: Vec<String>,
    description: String,
    options: Vec<OptionDescriptor>,
    arguments: Vec<ArgumentDescriptor>,
    factory: Arc<dyn CommandFactory>,
}

impl CommandDescriptor {
    /// Start declaring a command. `path` is split on whitespace: `"env show"`.
    pub fn builder(path: &str) -> CommandBuilder {
        CommandBuilder {
            path: path.split_whitespace().map(String::from).collect(),
            description: String::new(),
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Path joined with spaces.
    pub fn name(&self) -> String {
        self.path.join(" ")
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    /// Arguments, sorted by position.
    pub fn arguments(&self) -> &[ArgumentDescriptor] {
        &self.arguments
    }

    pub fn factory(&self) -> &dyn CommandFactory {
        self.factory.as_ref()
    }

    pub fn find_option(&self, flag: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.matches(flag))
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("path", &self.path)
            .field("description", &self.description)
            .field("options", &self.options)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandDescriptor`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    path: Vec<String>,
    description: String,
    options: Vec<OptionDescriptor>,
    arguments: Vec<ArgumentDescriptor>,
}

impl CommandBuilder {
    pub fn about(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    pub fn argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Finish with a command type that builds itself via [`FromBound`].
    pub fn build<C>(self) -> Result<CommandDescriptor, DescriptorError>
    where
        C: FromBound + Command,
    {
        self.build_with(FromBoundFactory::<C>(std::marker::PhantomData))
    }

    /// Finish with an explicit factory.
    pub fn build_with(
        mut self,
        factory: impl CommandFactory + 'static,
    ) -> Result<CommandDescriptor, DescriptorError> {
        self.arguments.sort_by_key(|a| a.position);
        self.validate()?;
        Ok(CommandDescriptor {
            path: self.path,
            description: self.description,
            options: self.options,
            arguments: self.arguments,
            factory: Arc::new(factory),
        })
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.path.is_empty() {
            return Err(DescriptorError::EmptyPath);
        }
        if let Some(segment) = self.path.iter().find(|s| s.starts_with('-')) {
            return Err(DescriptorError::InvalidSegment {
                segment: segment.clone(),
            });
        }

        let command = self.path.join(" ");
        let mut flags = HashSet::new();
        let mut fields = HashSet::new();

        for option in &self.options {
            if option.short.is_none() && option.long.is_none() {
                return Err(DescriptorError::NoFlagName {
                    field: option.field.clone(),
                });
            }
            if let Some(long) = &option.long {
                validate_long(long)?;
                if long == HELP_LONG {
                    return Err(DescriptorError::ReservedFlag {
                        flag: format!("--{}", long),
                    });
                }
                if !flags.insert(format!("--{}", long)) {
                    return Err(DescriptorError::DuplicateFlag {
                        command,
                        flag: format!("--{}", long),
                    });
                }
            }
            if let Some(short) = option.short {
                if !short.is_ascii_alphanumeric() {
                    return Err(DescriptorError::InvalidFlag {
                        flag: format!("-{}", short),
                    });
                }
                if short == HELP_SHORT {
                    return Err(DescriptorError::ReservedFlag {
                        flag: format!("-{}", short),
                    });
                }
                if !flags.insert(format!("-{}", short)) {
                    return Err(DescriptorError::DuplicateFlag {
                        command,
                        flag: format!("-{}", short),
                    });
                }
            }
            if !fields.insert(option.field.clone()) {
                return Err(DescriptorError::DuplicateField {
                    command,
                    field: option.field.clone(),
                });
            }
        }

        let mut seen_optional = false;
        for (expected, argument) in self.arguments.iter().enumerate() {
            if argument.position < expected {
                return Err(DescriptorError::DuplicatePosition {
                    command,
                    position: argument.position,
                });
            }
            if argument.position > expected {
                return Err(DescriptorError::PositionGap {
                    command,
                    expected,
                    found: argument.position,
                });
            }
            if argument.required && seen_optional {
                return Err(DescriptorError::RequiredAfterOptional {
                    command,
                    argument: argument.name.clone(),
                });
            }
            seen_optional |= !argument.required;
            if argument.value_type.is_collection() && expected + 1 != self.arguments.len() {
                return Err(DescriptorError::CollectionNotLast {
                    command,
                    argument: argument.name.clone(),
                });
            }
            if !fields.insert(argument.name.clone()) {
                return Err(DescriptorError::DuplicateField {
                    command,
                    field: argument.name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn validate_long(long: &str) -> Result<(), DescriptorError> {
    let valid = !long.is_empty()
        && !long.starts_with('-')
        && long
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DescriptorError::InvalidFlag {
            flag: format!("--{}", long),
        })
    }
}
