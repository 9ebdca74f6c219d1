//! Enumeration parser.

use std::sync::Arc;

use crate::error::{choice_message, TypeError};
use crate::types::{mismatch, CaseMode, TypeId, TypeParser, Value};

/// A named set of members, declared once and registered with the
/// [`TypeRegistry`](super::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    /// Canonical spellings, in declaration order. The first is the default.
    pub members: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumParser {
    def: Arc<EnumDef>,
    case: CaseMode,
}

impl EnumParser {
    /// Fails with [`TypeError::EmptyEnum`] when `def` has no members.
    pub fn new(def: Arc<EnumDef>, case: CaseMode) -> Result<Self, TypeError> {
        if def.members.is_empty() {
            return Err(TypeError::EmptyEnum {
                name: def.name.clone(),
            });
        }
        Ok(Self { def, case })
    }

    fn lookup(&self, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        self.def
            .members
            .iter()
            .find(|member| match self.case {
                CaseMode::Sensitive => member.as_str() == raw,
                CaseMode::Insensitive => member.eq_ignore_ascii_case(raw),
            })
            .map(String::as_str)
    }

    fn first(&self) -> &str {
        // Non-empty, checked in `new`.
        self.def.members.first().map(String::as_str).unwrap_or_default()
    }
}

impl TypeParser for EnumParser {
    fn type_id(&self) -> TypeId {
        TypeId::Enum {
            name: self.def.name.clone(),
            case: self.case,
        }
    }

    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        if raw.trim().is_empty() {
            return Ok(self.zero());
        }
        self.lookup(raw)
            .map(|member| Value::Enum(member.to_string()))
            .ok_or_else(|| TypeError::Argument {
                value: raw.to_string(),
                choices: self.choices(),
            })
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        match value {
            Value::Enum(member) if self.def.members.contains(member) => Ok(member.clone()),
            other => Err(mismatch(&self.type_id(), other)),
        }
    }

    fn choices(&self) -> Vec<String> {
        self.def.members.clone()
    }

    fn validate(&self, raw: &str) -> Result<(), String> {
        if raw.trim().is_empty() || self.lookup(raw).is_some() {
            Ok(())
        } else {
            Err(choice_message(raw, &self.def.members))
        }
    }

    fn zero(&self) -> Value {
        Value::Enum(self.first().to_string())
    }
}
