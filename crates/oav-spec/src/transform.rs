//! # Field Transforms
//!
//! Captured traffic carries every path, query and header value as text.
//! Operations declare a [`Transform`] per field that turns that text into the
//! JSON value the schema expects (`"42"` → `42`, `"a,b"` → `["a","b"]`).
//!
//! A transform only ever touches strings and arrays of strings. Objects,
//! numbers, booleans and `null` pass through unchanged, which also makes a
//! transform on an absent field a no-op.
//!
//! Captured headers may carry a value as a one-element array. For every
//! transform except [`Transform::Each`] such an array is read as its single
//! string, the same way `header_str` reads it.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use serde_json::{Number, Value};

/// Transforms keyed by field name.
pub type TransformMap = BTreeMap<String, Transform>;

/// A pure string-to-JSON conversion declared by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Parse as a JSON integer.
    Integer,
    /// Parse as a JSON number.
    Number,
    /// Parse `true`/`false`, case-insensitively.
    Boolean,
    /// Percent-decode.
    Decode,
    /// Split on a delimiter, optionally converting each item.
    Split {
        /// Item delimiter.
        delimiter: char,
        /// Conversion applied to every item.
        item: Option<Box<Transform>>,
    },
    /// Apply each step in order.
    Chain(Vec<Transform>),
    /// Convert every element of an array-typed field sent as repeated keys.
    /// A lone string becomes a one-element array.
    Each(Box<Transform>),
}

/// The closed set of value shapes a transform distinguishes.
#[derive(Debug, Clone, Copy)]
pub enum ValueShape<'a> {
    /// A JSON string.
    Text(&'a str),
    /// A JSON array.
    List(&'a [Value]),
    /// Anything else; never transformed.
    Other(&'a Value),
}

impl<'a> ValueShape<'a> {
    /// Classify a runtime value.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items),
            other => Self::Other(other),
        }
    }
}

impl Transform {
    /// Item delimiter of a Swagger `collectionFormat`.
    ///
    /// `multi` (repeated keys) and unknown formats have none. A missing
    /// format means `csv`.
    pub fn collection_delimiter(format: Option<&str>) -> Option<char> {
        match format.unwrap_or("csv") {
            "csv" => Some(','),
            "ssv" => Some(' '),
            "tsv" => Some('\t'),
            "pipes" => Some('|'),
            _ => None,
        }
    }

    /// Apply the transform to a runtime value.
    ///
    /// Strings are converted. A one-element string array is converted as its
    /// string; longer arrays are converted element-wise, keeping non-string
    /// elements. Every other shape is returned unchanged.
    pub fn apply(&self, value: &Value) -> Value {
        if let Self::Chain(steps) = self {
            return steps
                .iter()
                .fold(value.clone(), |acc, step| step.apply(&acc));
        }
        match ValueShape::of(value) {
            ValueShape::Text(text) => self.apply_text(text),
            ValueShape::List(items) => self.apply_list(items),
            ValueShape::Other(other) => other.clone(),
        }
    }

    fn apply_list(&self, items: &[Value]) -> Value {
        match (self, items) {
            (Self::Each(item), _) => Value::Array(items.iter().map(|i| item.apply(i)).collect()),
            (_, [Value::String(text)]) => self.apply_text(text),
            _ => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => self.apply_text(text),
                        other => other.clone(),
                    })
                    .collect(),
            ),
        }
    }

    fn apply_text(&self, text: &str) -> Value {
        match self {
            Self::Integer => {
                let trimmed = text.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Value::Number(n.into())
                } else if let Ok(n) = trimmed.parse::<u64>() {
                    Value::Number(n.into())
                } else {
                    Value::String(text.to_string())
                }
            }
            Self::Number => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(text.to_string())),
            Self::Boolean => {
                if text.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    Value::String(text.to_string())
                }
            }
            Self::Decode => {
                Value::String(percent_decode_str(text).decode_utf8_lossy().into_owned())
            }
            Self::Split { delimiter, item } => Value::Array(
                text.split(*delimiter)
                    .map(|piece| match item {
                        Some(item) => item.apply_text(piece),
                        None => Value::String(piece.to_string()),
                    })
                    .collect(),
            ),
            Self::Chain(_) => self.apply(&Value::String(text.to_string())),
            Self::Each(item) => Value::Array(vec![item.apply_text(text)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_coercions() {
        assert_eq!(Transform::Integer.apply(&json!("42")), json!(42));
        assert_eq!(Transform::Integer.apply(&json!("4.2")), json!("4.2"));
        assert_eq!(Transform::Number.apply(&json!("4.5")), json!(4.5));
        assert_eq!(Transform::Number.apply(&json!("abc")), json!("abc"));
        assert_eq!(Transform::Boolean.apply(&json!("TRUE")), json!(true));
        assert_eq!(Transform::Boolean.apply(&json!("no")), json!("no"));
    }

    #[test]
    fn non_text_shapes_pass_through() {
        let object = json!({"a": "1"});
        assert_eq!(Transform::Integer.apply(&object), object);
        assert_eq!(Transform::Integer.apply(&json!(7)), json!(7));
        assert_eq!(Transform::Boolean.apply(&json!(null)), json!(null));
    }

    #[test]
    fn arrays_convert_element_wise() {
        assert_eq!(
            Transform::Integer.apply(&json!(["1", "2", {"x": 1}])),
            json!([1, 2, {"x": 1}])
        );
    }

    #[test]
    fn single_element_arrays_read_as_their_string() {
        assert_eq!(Transform::Integer.apply(&json!(["3"])), json!(3));
        assert_eq!(Transform::Boolean.apply(&json!(["false"])), json!(false));
        let csv = Transform::Split {
            delimiter: ',',
            item: None,
        };
        assert_eq!(csv.apply(&json!(["a,b"])), json!(["a", "b"]));
        assert_eq!(Transform::Integer.apply(&json!([3])), json!([3]));
    }

    #[test]
    fn each_converts_repeated_values() {
        let each = Transform::Each(Box::new(Transform::Integer));
        assert_eq!(each.apply(&json!(["3"])), json!([3]));
        assert_eq!(each.apply(&json!(["1", "2"])), json!([1, 2]));
        assert_eq!(each.apply(&json!("7")), json!([7]));
    }

    #[test]
    fn split_with_item_conversion() {
        let csv = Transform::Split {
            delimiter: ',',
            item: Some(Box::new(Transform::Integer)),
        };
        assert_eq!(csv.apply(&json!("1,2,3")), json!([1, 2, 3]));

        let pipes = Transform::Split {
            delimiter: Transform::collection_delimiter(Some("pipes")).unwrap(),
            item: None,
        };
        assert_eq!(pipes.apply(&json!("a|b")), json!(["a", "b"]));
        assert_eq!(Transform::collection_delimiter(Some("multi")), None);
        assert_eq!(Transform::collection_delimiter(None), Some(','));
    }

    #[test]
    fn chain_decodes_then_coerces() {
        let chain = Transform::Chain(vec![Transform::Decode, Transform::Integer]);
        assert_eq!(chain.apply(&json!("%31%32")), json!(12));
        assert_eq!(
            Transform::Decode.apply(&json!("my%20vm")),
            json!("my vm")
        );
    }
}
