//! Runtime value model.
//!
//! Host values are normalized on the way in: every integer and float width
//! collapses into [`Number`] (floats via their shortest round-trip string),
//! pointer-style nulls become [`Value::Null`]. Inside the language values are
//! immutable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::date::ZonedTime;
use crate::functions::NativeFunction;

mod number;

pub use number::Number;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Number),
    Str(String),
    Time(ZonedTime),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    NativeFn(Arc<NativeFunction>),
}

impl Value {
    /// `typeof` name. Everything that is not a boolean, string or number
    /// reports `object`, including `null` and functions.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Num(_) => "number",
            _ => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness: false for `null`, `false`, empty strings, zero and NaN;
    /// true for everything else.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => !n.is_zero() && !n.is_nan(),
            _ => true,
        }
    }

    /// Numeric coercion: strings parse leniently (NaN on failure), booleans
    /// become 1/0, null becomes 0, anything else is NaN.
    pub fn coerce_to_number(&self) -> Number {
        match self {
            Value::Num(n) => *n,
            Value::Str(s) => Number::parse_lenient(s),
            Value::Bool(b) => {
                if *b {
                    Number::ONE
                } else {
                    Number::ZERO
                }
            }
            Value::Null => Number::ZERO,
            _ => Number::Nan,
        }
    }

    /// Display-string coercion used by `+` concatenation, string comparison
    /// and `toString`.
    pub fn coerce_to_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Loose `==`. The left value's tag picks the comparison domain, as the
    /// language defines it: numbers and booleans compare numerically,
    /// strings compare their display forms, everything else is null-aware
    /// structural equality.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match self {
            Value::Num(_) | Value::Bool(_) => {
                self.coerce_to_number() == other.coerce_to_number()
            }
            Value::Str(s) => *s == other.coerce_to_string(),
            _ => (self.is_null() && other.is_null()) || self == other,
        }
    }

    /// Strict `===`: same tag and same value; `null === null` holds; native
    /// functions compare by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => {
                std::mem::discriminant(self) == std::mem::discriminant(other) && self == other
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            // Functions have no structure to compare; identity decides.
            (Value::NativeFn(a), Value::NativeFn(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Time(t) => write!(f, "{t}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(_) => f.write_str("[object]"),
            Value::NativeFn(function) => write!(f, "[function {}]", function.name),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Num(Number::from_i64(i64::from(value)))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Num(Number::from_i64(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        // Through f32's own shortest string, not a widening to f64, so
        // `0.1f32` stays `0.1`.
        Value::Num(Number::parse_lenient(&value.to_string()))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(Number::from_f64(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Num(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ZonedTime> for Value {
    fn from(value: ZonedTime) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(value: HashMap<String, Value>) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typeof_names() {
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::from(1i64).type_name(), "number");
        assert_eq!(Value::Null.type_name(), "object");
        assert_eq!(Value::Array(vec![]).type_name(), "object");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("0").truthy());
        assert!(!Value::from(0i64).truthy());
        assert!(!Value::Num(Number::Nan).truthy());
        assert!(Value::Array(vec![]).truthy());
    }

    #[test]
    fn loose_equality_is_left_biased() {
        assert!(Value::from(true).loose_equals(&Value::from(1i64)));
        assert!(Value::from(1i64).loose_equals(&Value::from("1")));
        assert!(Value::from("1").loose_equals(&Value::from(1i64)));
        assert!(Value::Null.loose_equals(&Value::Null));
        assert!(!Value::Null.loose_equals(&Value::from("")));
        assert!(!Value::Null.loose_equals(&Value::from(0i64)));
    }

    #[test]
    fn strict_equality_requires_same_tag() {
        assert!(!Value::from(true).strict_equals(&Value::from(1i64)));
        assert!(Value::Null.strict_equals(&Value::Null));
        assert!(Value::from("染色").strict_equals(&Value::from("染色")));
        assert!(!Value::from("1").strict_equals(&Value::from(1i64)));
        assert!(Value::from(1i64).strict_equals(&Value::Num(Number::from_literal("1.0").unwrap())));
    }

    #[test]
    fn host_floats_normalize_via_strings() {
        let Value::Num(n) = Value::from(1.1f64) else {
            panic!();
        };
        assert_eq!(n.to_string(), "1.1");
        let Value::Num(n) = Value::from(0.1f32) else {
            panic!();
        };
        assert_eq!(n.to_string(), "0.1");
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(
            Value::Array(vec![Value::from(1i64), Value::from("a")]).to_string(),
            "[1, a]"
        );
    }
}
