//! String builtins.
//!
//! Indices and lengths count Unicode scalar values, never bytes, so
//! multi-byte text cannot be split through a code point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;

use crate::value::Value;

use super::{int_arg, list_arg, text_arg, CallContext, NativeFunction, ParamType};

pub(super) fn register(map: &mut HashMap<&'static str, Arc<NativeFunction>>) {
    let predicate = |name: &'static str, imp: fn(&str, &str) -> bool| {
        NativeFunction::new(
            name,
            false,
            vec![ParamType::Text, ParamType::Text],
            None,
            ParamType::Bool,
            move |_ctx: &CallContext, args: &[Value]| {
                Ok(Value::Bool(imp(text_arg(args, 0), text_arg(args, 1))))
            },
        )
    };

    map.insert("startWith", predicate("startWith", |s, sub| s.starts_with(sub)));
    map.insert("endWith", predicate("endWith", |s, sub| s.ends_with(sub)));
    map.insert("contains", predicate("contains", |s, sub| s.contains(sub)));

    map.insert(
        "find",
        NativeFunction::new(
            "find",
            false,
            vec![ParamType::Text, ParamType::Text],
            None,
            ParamType::Number,
            find,
        ),
    );
    map.insert(
        "includes",
        NativeFunction::new(
            "includes",
            false,
            vec![ParamType::TextList, ParamType::Text],
            None,
            ParamType::Bool,
            includes,
        ),
    );
    map.insert(
        "left",
        NativeFunction::new(
            "left",
            false,
            vec![ParamType::Text, ParamType::Int],
            None,
            ParamType::Text,
            left,
        ),
    );
    map.insert(
        "right",
        NativeFunction::new(
            "right",
            false,
            vec![ParamType::Text, ParamType::Int],
            None,
            ParamType::Text,
            right,
        ),
    );
    map.insert(
        "len",
        NativeFunction::new(
            "len",
            false,
            vec![ParamType::Text],
            None,
            ParamType::Number,
            len,
        ),
    );
    map.insert(
        "lower",
        NativeFunction::new(
            "lower",
            false,
            vec![ParamType::Text],
            None,
            ParamType::Text,
            |_ctx, args| Ok(Value::Str(text_arg(args, 0).to_lowercase())),
        ),
    );
    map.insert(
        "upper",
        NativeFunction::new(
            "upper",
            false,
            vec![ParamType::Text],
            None,
            ParamType::Text,
            |_ctx, args| Ok(Value::Str(text_arg(args, 0).to_uppercase())),
        ),
    );
    map.insert(
        "lpad",
        NativeFunction::new(
            "lpad",
            false,
            vec![ParamType::Text, ParamType::Text, ParamType::Int],
            None,
            ParamType::Text,
            |_ctx, args| Ok(Value::Str(pad(args, true))),
        ),
    );
    map.insert(
        "rpad",
        NativeFunction::new(
            "rpad",
            false,
            vec![ParamType::Text, ParamType::Text, ParamType::Int],
            None,
            ParamType::Text,
            |_ctx, args| Ok(Value::Str(pad(args, false))),
        ),
    );
    map.insert(
        "mid",
        NativeFunction::new(
            "mid",
            false,
            vec![ParamType::Text, ParamType::Int, ParamType::Int],
            None,
            ParamType::Text,
            mid,
        ),
    );
    map.insert(
        "replace",
        NativeFunction::new(
            "replace",
            false,
            vec![ParamType::Text, ParamType::Text, ParamType::Text],
            None,
            ParamType::Text,
            replace,
        ),
    );
    map.insert(
        "trim",
        NativeFunction::new(
            "trim",
            false,
            vec![ParamType::Text],
            None,
            ParamType::Text,
            |_ctx, args| Ok(Value::Str(text_arg(args, 0).trim().to_string())),
        ),
    );
    map.insert(
        "regexp",
        NativeFunction::new(
            "regexp",
            false,
            vec![ParamType::Text, ParamType::Text],
            None,
            ParamType::Bool,
            regexp,
        ),
    );
}

/// Char index of the first occurrence, or -1.
fn find(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let haystack = text_arg(args, 0);
    let needle = text_arg(args, 1);
    let index = match haystack.find(needle) {
        Some(byte_index) => haystack[..byte_index].chars().count() as i64,
        None => -1,
    };
    Ok(Value::from(index))
}

fn includes(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let item = text_arg(args, 1);
    let found = list_arg(args, 0)
        .iter()
        .any(|value| matches!(value, Value::Str(s) if s == item));
    Ok(Value::Bool(found))
}

fn left(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let text = text_arg(args, 0);
    let count = int_arg(args, 1).max(0) as usize;
    Ok(Value::Str(text.chars().take(count).collect()))
}

fn right(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let text = text_arg(args, 0);
    let count = int_arg(args, 1).max(0) as usize;
    let total = text.chars().count();
    Ok(Value::Str(
        text.chars().skip(total.saturating_sub(count)).collect(),
    ))
}

fn len(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(text_arg(args, 0).chars().count() as i64))
}

/// Pad toward the requested length, truncating when already longer. The pad
/// string is repeated once per missing character.
fn pad(args: &[Value], left_side: bool) -> String {
    let text = text_arg(args, 0);
    let pad = text_arg(args, 1);
    let target = int_arg(args, 2).max(0) as usize;

    let length = text.chars().count();
    if length > target {
        return text.chars().take(target).collect();
    }

    let filler = pad.repeat(target - length);
    if left_side {
        format!("{filler}{text}")
    } else {
        format!("{text}{filler}")
    }
}

/// Substring by char positions, clamped to the text bounds.
fn mid(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let text = text_arg(args, 0);
    let total = text.chars().count();
    let start = (int_arg(args, 1).max(0) as usize).min(total);
    let end = (int_arg(args, 2).max(0) as usize).min(total);
    if start >= end {
        return Ok(Value::Str(String::new()));
    }
    Ok(Value::Str(text.chars().skip(start).take(end - start).collect()))
}

fn replace(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let text = text_arg(args, 0);
    let old = text_arg(args, 1);
    let new = text_arg(args, 2);
    if old.is_empty() {
        return Ok(Value::Str(text.to_string()));
    }
    Ok(Value::Str(text.replace(old, new)))
}

/// Full match against the compiled pattern. Compiled regexes are cached
/// process-wide; the cache is mutex-guarded because registries are shared
/// across runners.
fn regexp(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();

    let text = text_arg(args, 0);
    let pattern = text_arg(args, 1);

    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(compiled) = cache.get(pattern) {
        return Ok(Value::Bool(compiled.is_match(text)));
    }

    let anchored = format!("^(?:{pattern})$");
    let compiled = Regex::new(&anchored).map_err(|e| format!("invalid pattern: {e}"))?;
    let result = compiled.is_match(text);
    cache.insert(pattern.to_string(), compiled);
    Ok(Value::Bool(result))
}
