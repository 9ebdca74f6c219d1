//! Type conversion layer: raw tokens ↔ typed values.
//!
//! ```text
//! TypeId ──► TypeRegistry::resolve ──► Arc<dyn TypeParser>
//!                                         ├─ validate(raw)
//!                                         ├─ parse(raw) / parse_all(raws)
//!                                         └─ format(value) / format_all(value)
//! ```
//!
//! Collections are derived from their element parser on first use and cached.

mod bool_map;
mod collection;
mod enumeration;
mod primitive;
mod registry;
mod value;

pub use bool_map::BoolMapParser;
pub use collection::{CollectionParser, LIST_SEPARATOR};
pub(crate) use collection::split_joined;
pub use enumeration::{EnumDef, EnumParser};
pub use primitive::{BoolParser, NumberParser, StringParser};
pub use registry::TypeRegistry;
pub use value::{CaseMode, FromValue, TypeId, Value};

use crate::error::TypeError;

/// Converter between raw text and one semantic type.
///
/// Implementations must be pure: `validate` and `parse` never mutate state,
/// so binding stays deterministic.
pub trait TypeParser: Send + Sync {
    fn type_id(&self) -> TypeId;

    /// Convert one raw token. Empty input yields [`zero`](Self::zero).
    fn parse(&self, raw: &str) -> Result<Value, TypeError>;

    /// Render a value back to its raw form.
    fn format(&self, value: &Value) -> Result<String, TypeError>;

    /// Allowed raw values, in declaration order. Empty means unconstrained.
    fn choices(&self) -> Vec<String> {
        Vec::new()
    }

    /// Check a raw token before conversion.
    ///
    /// The error is a user-facing message; for choice-constrained types it
    /// lists every valid choice.
    fn validate(&self, _raw: &str) -> Result<(), String> {
        Ok(())
    }

    /// Value used when an optional field is absent or empty.
    fn zero(&self) -> Value;

    /// Convert every occurrence of a field. Scalars keep the last one.
    fn parse_all(&self, raws: &[String]) -> Result<Value, TypeError> {
        match raws.last() {
            Some(raw) => self.parse(raw),
            None => Ok(self.zero()),
        }
    }

    /// Render a value as the token sequence that would reproduce it.
    fn format_all(&self, value: &Value) -> Result<Vec<String>, TypeError> {
        Ok(vec![self.format(value)?])
    }

    /// Whether repeated occurrences accumulate (collections) rather than override.
    fn accumulates(&self) -> bool {
        false
    }
}

/// Error for a value of the wrong variant handed to `format`.
pub(crate) fn mismatch(type_id: &TypeId, value: &Value) -> TypeError {
    TypeError::Mismatch {
        type_name: type_id.to_string(),
        found: format!("{:?}", value),
    }
}
