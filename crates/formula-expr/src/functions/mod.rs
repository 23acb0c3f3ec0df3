//! Native function descriptors and the builtin registry.
//!
//! Every function callable from a formula carries a declarative signature:
//! name, whether it wants the evaluation context, fixed parameter types, an
//! optional variadic tail type, and its return type. The evaluator validates
//! and converts arguments against that descriptor before invoking the
//! implementation, so implementations see exactly the declared shapes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::Utc;

use crate::date::{Zone, ZonedTime};
use crate::error::EvalError;
use crate::value::{Number, Value};

mod builtins_collection;
mod builtins_conversion;
mod builtins_date_time;
mod builtins_math;
mod builtins_text;

/// Declared parameter / return type of a native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Passed through untouched.
    Any,
    Number,
    /// 64-bit integer part of the numeric coercion.
    Int,
    Bool,
    /// Display-string coercion; null becomes the empty string.
    Text,
    Time,
    /// Array whose elements are coerced to text.
    TextList,
    /// Array of objects, matched exactly element-wise.
    ObjectList,
}

/// Evaluation context handed to native functions that want it: the time zone
/// the runner evaluates in, and the clock.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub zone: Zone,
}

impl CallContext {
    pub fn new(zone: Zone) -> Self {
        Self { zone }
    }

    /// Current instant, viewed in the context's zone.
    pub fn now(&self) -> ZonedTime {
        ZonedTime::new(Utc::now(), self.zone)
    }
}

type NativeImpl = Box<dyn Fn(&CallContext, &[Value]) -> Result<Value, String> + Send + Sync>;

/// A host function exposed to the formula language.
pub struct NativeFunction {
    pub name: String,
    /// Whether the implementation reads the evaluation context (clock, zone).
    pub wants_context: bool,
    /// Fixed parameter types, excluding any variadic tail.
    pub params: Vec<ParamType>,
    /// Element type of the variadic tail, when the function accepts one.
    pub variadic: Option<ParamType>,
    pub return_type: ParamType,
    implementation: NativeImpl,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        wants_context: bool,
        params: Vec<ParamType>,
        variadic: Option<ParamType>,
        return_type: ParamType,
        implementation: impl Fn(&CallContext, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            wants_context,
            params,
            variadic,
            return_type,
            implementation: Box::new(implementation),
        })
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("wants_context", &self.wants_context)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Process-wide immutable builtin table, built once on first use. Host
/// extensions go through the runner's `this` map, never through this table.
pub fn builtins() -> &'static HashMap<&'static str, Arc<NativeFunction>> {
    static REGISTRY: OnceLock<HashMap<&'static str, Arc<NativeFunction>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        builtins_date_time::register(&mut map);
        builtins_math::register(&mut map);
        builtins_text::register(&mut map);
        builtins_collection::register(&mut map);
        builtins_conversion::register(&mut map);
        map
    })
}

pub fn lookup_builtin(name: &str) -> Option<Arc<NativeFunction>> {
    builtins().get(name).cloned()
}

/// Validate, convert and dispatch a call. `name` is the dotted callee path
/// used in error messages; `spread_last` marks a `...` on the final argument.
pub fn call(
    name: &str,
    function: &NativeFunction,
    ctx: &CallContext,
    mut args: Vec<Value>,
    spread_last: bool,
) -> Result<Value, EvalError> {
    let prefix = function.params.len();

    if spread_last && !function.is_variadic() {
        return Err(EvalError::NotVariadic {
            name: name.to_string(),
        });
    }

    // Count validation happens before spread expansion: a spread call names
    // every declared slot exactly once.
    if !function.is_variadic() || spread_last {
        let expected = prefix + usize::from(function.is_variadic());
        if args.len() != expected {
            return Err(EvalError::Arity {
                name: name.to_string(),
                expected,
                got: args.len(),
            });
        }
    } else if args.len() < prefix {
        return Err(EvalError::ArityAtLeast {
            name: name.to_string(),
            expected: prefix,
            got: args.len(),
        });
    }

    if spread_last {
        let last = args.pop().unwrap_or(Value::Null);
        match last {
            Value::Array(items) => args.extend(items),
            other => {
                return Err(EvalError::Builtin {
                    name: name.to_string(),
                    message: format!("can't expand {}", debug_type_name(&other)),
                });
            }
        }
    }

    let mut converted = Vec::with_capacity(args.len());
    for (index, arg) in args.into_iter().enumerate() {
        let target = if index < prefix {
            function.params[index]
        } else {
            // Beyond the fixed prefix only a variadic tail can accept values.
            function.variadic.unwrap_or(ParamType::Any)
        };
        let value = coerce_arg(arg, target).map_err(|message| EvalError::ArgConversion {
            name: name.to_string(),
            index: index + 1,
            message,
        })?;
        converted.push(value);
    }

    (function.implementation)(ctx, &converted).map_err(|message| EvalError::Builtin {
        name: name.to_string(),
        message,
    })
}

/// Runtime type name used in conversion errors. More specific than the
/// `typeof` projection, which folds most of these into `object`.
pub(crate) fn debug_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Num(_) => "number",
        Value::Str(_) => "string",
        Value::Time(_) => "time",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::NativeFn(_) => "function",
    }
}

/// Convert a supplied argument to its declared parameter type. Null becomes
/// the target type's zero value.
pub(crate) fn coerce_arg(value: Value, target: ParamType) -> Result<Value, String> {
    match target {
        ParamType::Any => Ok(value),
        ParamType::Number => match &value {
            Value::Num(_) | Value::Str(_) | Value::Bool(_) | Value::Null => {
                Ok(Value::Num(value.coerce_to_number()))
            }
            other => Err(format!("can't convert {} to number", debug_type_name(other))),
        },
        ParamType::Int => match &value {
            Value::Num(_) | Value::Str(_) | Value::Bool(_) | Value::Null => Ok(Value::Num(
                Number::from_i64(value.coerce_to_number().to_i64()),
            )),
            other => Err(format!("can't convert {} to int", debug_type_name(other))),
        },
        ParamType::Bool => match value {
            Value::Bool(_) => Ok(value),
            Value::Null => Ok(Value::Bool(false)),
            other => Err(format!("can't convert {} to boolean", debug_type_name(&other))),
        },
        ParamType::Text => match value {
            Value::Null => Ok(Value::Str(String::new())),
            other => Ok(Value::Str(other.coerce_to_string())),
        },
        ParamType::Time => match value {
            Value::Time(_) => Ok(value),
            // Zero value: the Unix epoch, in the default zone.
            Value::Null => Ok(Value::Time(ZonedTime::new(
                chrono::DateTime::<Utc>::UNIX_EPOCH,
                Zone::Local,
            ))),
            other => Err(format!("can't convert {} to time", debug_type_name(&other))),
        },
        ParamType::TextList => match value {
            Value::Array(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    match coerce_arg(item, ParamType::Text)? {
                        Value::Str(s) => result.push(Value::Str(s)),
                        other => result.push(other),
                    }
                }
                Ok(Value::Array(result))
            }
            Value::Null => Ok(Value::Array(Vec::new())),
            other => Err(format!(
                "can't convert {} to string array",
                debug_type_name(&other)
            )),
        },
        ParamType::ObjectList => match value {
            Value::Array(items) => {
                for item in &items {
                    if !matches!(item, Value::Object(_) | Value::Null) {
                        return Err(format!(
                            "can't convert {} to object array element",
                            debug_type_name(item)
                        ));
                    }
                }
                Ok(Value::Array(items))
            }
            Value::Null => Ok(Value::Array(Vec::new())),
            other => Err(format!(
                "can't convert {} to object array",
                debug_type_name(&other)
            )),
        },
    }
}

// Post-coercion argument accessors for builtin implementations. Conversion
// has already enforced the declared types; the fallbacks only keep these
// total.

pub(crate) fn num_arg(args: &[Value], index: usize) -> Number {
    match args.get(index) {
        Some(Value::Num(n)) => *n,
        _ => Number::ZERO,
    }
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> i64 {
    num_arg(args, index).to_i64()
}

pub(crate) fn text_arg(args: &[Value], index: usize) -> &str {
    match args.get(index) {
        Some(Value::Str(s)) => s,
        _ => "",
    }
}

pub(crate) fn time_arg(args: &[Value], index: usize) -> ZonedTime {
    match args.get(index) {
        Some(Value::Time(t)) => *t,
        _ => ZonedTime::new(chrono::DateTime::<Utc>::UNIX_EPOCH, Zone::Local),
    }
}

pub(crate) fn list_arg(args: &[Value], index: usize) -> &[Value] {
    match args.get(index) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_the_full_pack() {
        for name in [
            "now", "toDay", "date", "addDate", "year", "month", "day", "hour", "minute",
            "second", "millSecond", "weekDay", "timeFormat", "useTimezone", "abs", "ceil",
            "floor", "exp", "ln", "log", "max", "min", "round", "roundBank", "roundCash",
            "sqrt", "finite", "startWith", "endWith", "contains", "find", "includes", "left",
            "right", "len", "lower", "upper", "lpad", "rpad", "mid", "replace", "trim",
            "regexp", "mapToArr", "join", "toString", "toInt", "toFloat",
        ] {
            assert!(lookup_builtin(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn arity_validation_exact_and_at_least() {
        let ctx = CallContext::new(Zone::Local);
        let abs = lookup_builtin("abs").unwrap();
        let err = call("abs", &abs, &ctx, vec![], false).unwrap_err();
        assert!(matches!(err, EvalError::Arity { expected: 1, got: 0, .. }));

        let max = lookup_builtin("max").unwrap();
        assert!(call("max", &max, &ctx, vec![Value::from(1i64)], false).is_ok());
    }

    #[test]
    fn spread_requires_variadic_function() {
        let ctx = CallContext::new(Zone::Local);
        let abs = lookup_builtin("abs").unwrap();
        let err = call(
            "abs",
            &abs,
            &ctx,
            vec![Value::Array(vec![Value::from(1i64)])],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::NotVariadic { .. }));
    }

    #[test]
    fn spread_expands_arrays() {
        let ctx = CallContext::new(Zone::Local);
        let max = lookup_builtin("max").unwrap();
        let result = call(
            "max",
            &max,
            &ctx,
            vec![Value::Array(vec![
                Value::from(3i64),
                Value::from(9i64),
                Value::from(4i64),
            ])],
            true,
        )
        .unwrap();
        assert_eq!(result, Value::from(9i64));
    }

    #[test]
    fn null_becomes_zero_value_of_the_target() {
        assert_eq!(
            coerce_arg(Value::Null, ParamType::Number).unwrap(),
            Value::from(0i64)
        );
        assert_eq!(
            coerce_arg(Value::Null, ParamType::Text).unwrap(),
            Value::from("")
        );
        assert_eq!(
            coerce_arg(Value::Null, ParamType::TextList).unwrap(),
            Value::Array(vec![])
        );
    }

    #[test]
    fn conversion_errors_carry_one_based_index() {
        let ctx = CallContext::new(Zone::Local);
        let year = lookup_builtin("year").unwrap();
        let err = call("year", &year, &ctx, vec![Value::from("nope")], false).unwrap_err();
        match err {
            EvalError::ArgConversion { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
