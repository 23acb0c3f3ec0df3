//! Collection builtins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

use super::{list_arg, text_arg, CallContext, NativeFunction, ParamType};

pub(super) fn register(map: &mut HashMap<&'static str, Arc<NativeFunction>>) {
    map.insert(
        "mapToArr",
        NativeFunction::new(
            "mapToArr",
            false,
            vec![ParamType::ObjectList, ParamType::Text],
            None,
            ParamType::Any,
            map_to_arr,
        ),
    );
    map.insert(
        "join",
        NativeFunction::new(
            "join",
            false,
            vec![ParamType::TextList, ParamType::Text],
            None,
            ParamType::Text,
            join,
        ),
    );
}

/// Project one key out of each object; objects without the key contribute
/// null.
fn map_to_arr(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let key = text_arg(args, 1);
    let projected = list_arg(args, 0)
        .iter()
        .map(|item| match item {
            Value::Object(fields) => fields.get(key).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        })
        .collect();
    Ok(Value::Array(projected))
}

fn join(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let separator = text_arg(args, 1);
    let joined = list_arg(args, 0)
        .iter()
        .map(|value| match value {
            Value::Str(s) => s.clone(),
            other => other.coerce_to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::Str(joined))
}
