//! Conversion builtins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{Number, Value};

use super::{CallContext, NativeFunction, ParamType};

pub(super) fn register(map: &mut HashMap<&'static str, Arc<NativeFunction>>) {
    map.insert(
        "toString",
        NativeFunction::new(
            "toString",
            false,
            vec![ParamType::Any],
            None,
            ParamType::Text,
            to_string,
        ),
    );
    map.insert(
        "toInt",
        NativeFunction::new(
            "toInt",
            false,
            vec![ParamType::Any],
            None,
            ParamType::Number,
            to_int,
        ),
    );
    map.insert(
        "toFloat",
        NativeFunction::new(
            "toFloat",
            false,
            vec![ParamType::Any],
            None,
            ParamType::Number,
            to_float,
        ),
    );
}

fn to_string(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let value = args.first().unwrap_or(&Value::Null);
    Ok(Value::Str(value.coerce_to_string()))
}

/// Numeric coercion truncated to its integer part.
fn to_int(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let number = args.first().unwrap_or(&Value::Null).coerce_to_number();
    Ok(Value::Num(Number::from_i64(number.to_i64())))
}

fn to_float(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::Num(args.first().unwrap_or(&Value::Null).coerce_to_number()))
}
