//! Boolean-keyed map: `--feature fast --feature color=false`.
//!
//! Not a generic dictionary parser. Keys are free text, values must be booleans.

use std::collections::BTreeMap;

use crate::error::TypeError;
use crate::types::collection::split_joined;
use crate::types::primitive::{bool_choices, parse_bool_token};
use crate::types::{mismatch, TypeId, TypeParser, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolMapParser;

impl BoolMapParser {
    fn entry(raw: &str) -> Result<(String, bool), TypeError> {
        let (key, flag) = match raw.split_once('=') {
            Some((key, value)) => {
                let flag = parse_bool_token(value).ok_or_else(|| TypeError::Argument {
                    value: value.to_string(),
                    choices: bool_choices(),
                })?;
                (key.trim(), flag)
            }
            None => (raw.trim(), true),
        };
        if key.is_empty() {
            return Err(TypeError::Conversion {
                value: raw.to_string(),
                type_name: TypeId::BoolMap.to_string(),
                reason: "empty key".to_string(),
            });
        }
        Ok((key.to_string(), flag))
    }
}

impl TypeParser for BoolMapParser {
    fn type_id(&self) -> TypeId {
        TypeId::BoolMap
    }

    fn parse(&self, raw: &str) -> Result<Value, TypeError> {
        self.parse_all(&split_joined(raw))
    }

    fn format(&self, value: &Value) -> Result<String, TypeError> {
        Ok(self.format_all(value)?.join(","))
    }

    fn validate(&self, raw: &str) -> Result<(), String> {
        if raw.trim().is_empty() {
            return Ok(());
        }
        Self::entry(raw).map(|_| ()).map_err(|e| e.to_string())
    }

    fn zero(&self) -> Value {
        Value::BoolMap(BTreeMap::new())
    }

    /// Later entries for the same key win.
    fn parse_all(&self, raws: &[String]) -> Result<Value, TypeError> {
        let mut map = BTreeMap::new();
        for raw in raws.iter().filter(|raw| !raw.trim().is_empty()) {
            let (key, flag) = Self::entry(raw)?;
            map.insert(key, flag);
        }
        Ok(Value::BoolMap(map))
    }

    fn format_all(&self, value: &Value) -> Result<Vec<String>, TypeError> {
        match value {
            Value::BoolMap(map) => Ok(map
                .iter()
                .map(|(key, flag)| format!("{}={}", key, flag))
                .collect()),
            other => Err(mismatch(&self.type_id(), other)),
        }
    }

    fn accumulates(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_key_means_true() {
        let value = BoolMapParser.parse_all(&raws(&["fast", "color=off"])).unwrap();
        let Value::BoolMap(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.get("fast"), Some(&true));
        assert_eq!(map.get("color"), Some(&false));
    }

    #[test]
    fn later_entry_wins() {
        let value = BoolMapParser.parse_all(&raws(&["x=true", "x=false"])).unwrap();
        assert_eq!(BoolMapParser.format(&value).unwrap(), "x=false");
    }

    #[test]
    fn only_boolean_values_are_recognized() {
        let message = BoolMapParser.validate("level=3").unwrap_err();
        assert!(message.contains("true\nfalse"));
        assert!(BoolMapParser.validate("=true").is_err());
    }

    #[test]
    fn empty_entries_are_skipped() {
        assert!(BoolMapParser.validate("").is_ok());
        assert!(BoolMapParser.validate("  ").is_ok());
        let value = BoolMapParser.parse_all(&raws(&["", "fast"])).unwrap();
        assert_eq!(BoolMapParser.format(&value).unwrap(), "fast=true");
        assert_eq!(BoolMapParser.parse("").unwrap(), BoolMapParser.zero());
    }

    #[test]
    fn canonical_form_round_trips() {
        let value = BoolMapParser.parse("a=true,b=false").unwrap();
        assert_eq!(BoolMapParser.format(&value).unwrap(), "a=true,b=false");
    }
}
