//! Scalar parsers: bool, integers, floats, strings.

use std::marker::PhantomData;
use std::str::FromStr;

use crate::error::TypeError;
use crate::types::{mismatch, TypeId, TypeParser, Value};

/// Recognized boolean spellings (case-insensitive).
pub(crate) fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn bool_choices() -> Vec<String> {
    vec!["true".to_string(), "false".to_string()]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolParser;

impl TypeParser for BoolParser {
    fn type_id(&self) -> TypeId {
        TypeId::Bool
    }

    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        if raw.trim().is_empty() {
            return Ok(self.zero());
        }
        parse_bool_token(raw)
            .map(Value::Bool)
            .ok_or_else(|| TypeError::Argument {
                value: raw.to_string(),
                choices: bool_choices(),
            })
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        match value {
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(mismatch(&self.type_id(), other)),
        }
    }

    fn validate(&self, raw: &str) -> Result<(), String> {
        if raw.trim().is_empty() || parse_bool_token(raw).is_some() {
            Ok(())
        } else {
            Err(crate::error::choice_message(raw, &bool_choices()))
        }
    }

    fn zero(&self) -> Value {
        Value::Bool(false)
    }
}

/// Numeric types the registry ships parsers for.
pub trait Numeric: FromStr + ToString + Default + Copy + Send + Sync + 'static {
    fn type_id() -> TypeId;
    fn wrap(self) -> Value;
    fn unwrap(value: &Value) -> Option<Self>;
}

macro_rules! numeric {
    ($ty:ty, $id:ident) => {
        impl Numeric for $ty {
            fn type_id() -> TypeId {
                TypeId::$id
            }

            fn wrap(self) -> Value {
                Value::$id(self)
            }

            fn unwrap(value: &Value) -> Option<Self> {
                match value {
                    Value::$id(n) => Some(*n),
                    _ => None,
                }
            }
        }
    };
}

numeric!(i32, I32);
numeric!(i64, I64);
numeric!(u32, U32);
numeric!(u64, U64);
numeric!(f64, F64);

/// Parser for any [`Numeric`] type via `FromStr`.
#[derive(Debug, Default)]
pub struct NumberParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> NumberParser<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> TypeParser for NumberParser<T>
where
    T: Numeric,
    <T as FromStr>::Err: std::fmt::Display,
{
    fn type_id(&self) -> TypeId {
        T::type_id()
    }

    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(self.zero());
        }
        trimmed
            .parse::<T>()
            .map(T::wrap)
            .map_err(|e| TypeError::Conversion {
                value: raw.to_string(),
                type_name: T::type_id().to_string(),
                reason: e.to_string(),
            })
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        T::unwrap(value)
            .map(|n| n.to_string())
            .ok_or_else(|| mismatch(&self.type_id(), value))
    }

    fn zero(&self) -> Value {
        T::default().wrap()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringParser;

impl TypeParser for StringParser {
    fn type_id(&self) -> TypeId {
        TypeId::String
    }

    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        Ok(Value::Str(raw.to_string()))
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(mismatch(&self.type_id(), other)),
        }
    }

    fn zero(&self) -> Value {
        Value::Str(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_aliases() {
        let parser = BoolParser;
        assert_eq!(parser.parse("YES").unwrap(), Value::Bool(true));
        assert_eq!(parser.parse("off").unwrap(), Value::Bool(false));
        assert_eq!(parser.parse("").unwrap(), Value::Bool(false));
    }

    #[test]
    fn bool_rejects_garbage_with_choices() {
        let parser = BoolParser;
        let message = parser.validate("maybe").unwrap_err();
        assert!(message.ends_with("Valid choices are:\ntrue\nfalse"));
        assert!(matches!(
            parser.parse("maybe"),
            Err(TypeError::Argument { .. })
        ));
    }

    #[test]
    fn integers_round_trip() {
        let parser = NumberParser::<i64>::new();
        for raw in ["0", "-17", "9223372036854775807"] {
            let value = parser.parse(raw).unwrap();
            assert_eq!(parser.format(&value).unwrap(), raw);
        }
    }

    #[test]
    fn unsigned_rejects_negative() {
        let parser = NumberParser::<u32>::new();
        let err = parser.parse("-1").unwrap_err();
        assert_eq!(err.value(), Some("-1"));
        assert!(err.to_string().starts_with("'-1' is not a valid u32"));
    }

    #[test]
    fn i32_overflow_is_conversion_error() {
        let parser = NumberParser::<i32>::new();
        assert!(matches!(
            parser.parse("2147483648"),
            Err(TypeError::Conversion { .. })
        ));
    }

    #[test]
    fn empty_number_is_zero() {
        assert_eq!(NumberParser::<u64>::new().parse("").unwrap(), Value::U64(0));
        assert_eq!(NumberParser::<i32>::new().parse("  ").unwrap(), Value::I32(0));
    }

    #[test]
    fn format_rejects_wrong_variant() {
        let parser = NumberParser::<i32>::new();
        assert!(matches!(
            parser.format(&Value::Str("1".into())),
            Err(TypeError::Mismatch { .. })
        ));
    }

    #[test]
    fn string_is_identity() {
        let parser = StringParser;
        let value = parser.parse(" spaced ").unwrap();
        assert_eq!(parser.format(&value).unwrap(), " spaced ");
    }
}
