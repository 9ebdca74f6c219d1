//! Type identifiers and the tagged value representation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// How enumeration members are matched against raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaseMode {
    /// `Debug` only matches `Debug`.
    #[default]
    Sensitive,
    /// `debug`, `DEBUG` and `Debug` all match `Debug`.
    Insensitive,
}

/// Semantic type of an option or argument.
///
/// Used as the lookup key into [`TypeRegistry`](super::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeId {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F64,
    String,
    /// A registered [`EnumDef`](super::EnumDef), by name.
    Enum { name: String, case: CaseMode },
    /// Ordered collection of an element type, fed by repeated occurrences.
    List(Box<TypeId>),
    /// `key[=bool]` entries collected into a map.
    BoolMap,
    /// A parser registered under a custom name.
    Named(String),
}

impl TypeId {
    pub fn list(element: TypeId) -> Self {
        TypeId::List(Box::new(element))
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        TypeId::Enum {
            name: name.into(),
            case: CaseMode::Sensitive,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeId::Named(name.into())
    }

    /// Switch to case-insensitive matching. No-op for non-enum types
    /// (lists apply it to their element).
    pub fn ignore_case(self) -> Self {
        match self {
            TypeId::Enum { name, .. } => TypeId::Enum {
                name,
                case: CaseMode::Insensitive,
            },
            TypeId::List(inner) => TypeId::List(Box::new(inner.ignore_case())),
            other => other,
        }
    }

    /// Whether repeated occurrences accumulate instead of overriding.
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeId::List(_) | TypeId::BoolMap)
    }

    /// Boolean options are switches: present means true, no value consumed.
    pub fn is_switch(&self) -> bool {
        matches!(self, TypeId::Bool)
    }

    pub fn case_mode(&self) -> CaseMode {
        match self {
            TypeId::Enum { case, .. } => *case,
            TypeId::List(inner) => inner.case_mode(),
            _ => CaseMode::Sensitive,
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeId::Bool => write!(f, "bool"),
            TypeId::I32 => write!(f, "i32"),
            TypeId::I64 => write!(f, "i64"),
            TypeId::U32 => write!(f, "u32"),
            TypeId::U64 => write!(f, "u64"),
            TypeId::F64 => write!(f, "f64"),
            TypeId::String => write!(f, "string"),
            TypeId::Enum { name, .. } => write!(f, "{}", name),
            TypeId::List(inner) => write!(f, "list<{}>", inner),
            TypeId::BoolMap => write!(f, "map<string, bool>"),
            TypeId::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A converted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F64(f64),
    Str(String),
    /// Canonical member name of an enumeration.
    Enum(String),
    List(Vec<Value>),
    BoolMap(BTreeMap<String, bool>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    /// Human-readable name used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::I32(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::I64(n) => Some(*n),
            Value::I32(n) => Some(i64::from(*n)),
            Value::U32(n) => Some(i64::from(*n)),
            _ => None,
        }
    }
}

impl FromValue for u32 {
    const EXPECTED: &'static str = "u32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U32(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "u64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U64(n) => Some(*n),
            Value::U32(n) => Some(u64::from(*n)),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::F64(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }
}

impl FromValue for BTreeMap<String, bool> {
    const EXPECTED: &'static str = "map<string, bool>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::BoolMap(map) => Some(map.clone()),
            _ => None,
        }
    }
}
