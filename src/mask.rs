//! Experiment filter mask.
//!
//! The list endpoint receives the mask as a serialized JSON object. User input is
//! free-form text, so it is validated here and falls back to the empty mask when
//! it is not a JSON object.

use serde_json::{Map, Value};

/// Key/value criteria narrowing the experiment list. `{}` means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMask {
    criteria: Map<String, Value>,
}

/// Result of normalizing user input: the mask to use, plus a warning when the
/// input had to be replaced by the empty mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMask {
    pub mask: FilterMask,
    pub warning: Option<String>,
}

impl FilterMask {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Parses user-supplied text. Blank input is the empty mask without warning.
    pub fn parse(input: &str) -> ParsedMask {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ParsedMask {
                mask: Self::empty(),
                warning: None,
            };
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(criteria)) => ParsedMask {
                mask: Self { criteria },
                warning: None,
            },
            Ok(other) => ParsedMask {
                mask: Self::empty(),
                warning: Some(format!(
                    "Invalid experiment filter. Expected a JSON object, got {}",
                    kind_name(&other)
                )),
            },
            Err(e) => ParsedMask {
                mask: Self::empty(),
                warning: Some(format!("Invalid experiment filter. {e}")),
            },
        }
    }

    /// Compact JSON text sent as the `mask` query parameter.
    pub fn serialize(&self) -> String {
        Value::Object(self.criteria.clone()).to_string()
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_serializes_as_empty_object() {
        assert_eq!(FilterMask::empty().serialize(), "{}");
    }

    #[test]
    fn malformed_input_falls_back_to_empty() {
        let parsed = FilterMask::parse("{invalid");
        assert!(parsed.mask.is_empty());
        assert_eq!(parsed.mask.serialize(), "{}");
        let warning = parsed.warning.expect("malformed input should warn");
        assert!(warning.starts_with("Invalid experiment filter."));
    }

    #[test]
    fn blank_input_is_empty_without_warning() {
        let parsed = FilterMask::parse("   ");
        assert!(parsed.mask.is_empty());
        assert_eq!(parsed.warning, None);
    }

    #[test]
    fn object_input_is_kept() {
        let parsed = FilterMask::parse(r#"{"name": "sweep", "progress": 100}"#);
        assert_eq!(parsed.warning, None);
        assert_eq!(parsed.mask.len(), 2);
        assert_eq!(parsed.mask.serialize(), r#"{"name":"sweep","progress":100}"#);
    }

    #[test]
    fn non_object_json_is_rejected() {
        let parsed = FilterMask::parse("[1, 2]");
        assert!(parsed.mask.is_empty());
        assert!(parsed.warning.unwrap().contains("an array"));
    }

    #[test]
    fn empty_object_input() {
        let parsed = FilterMask::parse("{}");
        assert_eq!(parsed.mask, FilterMask::empty());
        assert_eq!(parsed.warning, None);
    }
}
