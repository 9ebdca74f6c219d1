//! Lifts an element parser over an ordered sequence of tokens.

use std::sync::Arc;

use crate::error::TypeError;
use crate::types::{mismatch, TypeId, TypeParser, Value};

/// Separator for the single-token form (`a,b,c`), used by environment fallbacks.
pub const LIST_SEPARATOR: char = ',';

/// Splits a joined token, dropping empty pieces.
pub(crate) fn split_joined(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Clone)]
pub struct CollectionParser {
    element: Arc<dyn TypeParser>,
}

impl CollectionParser {
    pub fn new(element: Arc<dyn TypeParser>) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &dyn TypeParser {
        self.element.as_ref()
    }
}

impl TypeParser for CollectionParser {
    fn type_id(&self) -> TypeId {
        TypeId::list(self.element.type_id())
    }

    /// Parses the joined form: `"1,2,3"` → `[1, 2, 3]`.
    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        self.parse_all(&split_joined(raw))
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        Ok(self.format_all(value)?.join(&LIST_SEPARATOR.to_string()))
    }

    fn choices(&self) -> Vec<String> {
        self.element.choices()
    }

    fn validate(&self, raw: &str) -> Result<(), String> {
        self.element.validate(raw)
    }

    fn zero(&self) -> Value {
        Value::List(Vec::new())
    }

    /// One element per token, order and count preserved.
    fn parse_all(&self, raws: &[String]) -> Result<Value, TypeError> {
        raws.iter()
            .map(|raw| self.element.parse(raw))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn format_all(&self, value: &Value) -> Result<Vec<String>, TypeError> {
        match value {
            Value::List(items) => items.iter().map(|item| self.element.format(item)).collect(),
            other => Err(mismatch(&self.type_id(), other)),
        }
    }

    fn accumulates(&self) -> bool {
        true
    }
}
