//! Bound values: resolved, converted field values of one invocation.

use serde::Serialize;

use crate::error::BindError;
use crate::types::{FromValue, Value};

/// Where a bound value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    CommandLine,
    Environment,
    /// Absent and optional; holds the type's zero value.
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundValue {
    pub field: String,
    pub value: Value,
    pub source: ValueSource,
}

/// Field values in declaration order: options first, then arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundValues {
    entries: Vec<BoundValue>,
}

impl BoundValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, value: Value, source: ValueSource) {
        self.entries.push(BoundValue {
            field: field.into(),
            value,
            source,
        });
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entry(field).map(|e| &e.value)
    }

    pub fn source(&self, field: &str) -> Option<ValueSource> {
        self.entry(field).map(|e| e.source)
    }

    /// Typed access, `None` when absent or of another type.
    pub fn get_as<T: FromValue>(&self, field: &str) -> Option<T> {
        self.get(field).and_then(T::from_value)
    }

    /// Typed access for command factories.
    pub fn value<T: FromValue>(&self, field: &str) -> Result<T, BindError> {
        self.get_as(field).ok_or_else(|| BindError::Field {
            field: field.to_string(),
            expected: T::EXPECTED,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{ field: value, ... }` for dumps and diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                let value = serde_json::to_value(&e.value).unwrap_or(serde_json::Value::Null);
                (e.field.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }

    fn entry(&self, field: &str) -> Option<&BoundValue> {
        self.entries.iter().find(|e| e.field == field)
    }
}
