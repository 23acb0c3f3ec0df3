//! Math builtins.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::value::{Number, Value};

use super::{int_arg, num_arg, CallContext, NativeFunction, ParamType};

pub(super) fn register(map: &mut HashMap<&'static str, Arc<NativeFunction>>) {
    let unary = |name: &'static str, imp: fn(Number) -> Number| {
        NativeFunction::new(
            name,
            false,
            vec![ParamType::Number],
            None,
            ParamType::Number,
            move |_ctx: &CallContext, args: &[Value]| Ok(Value::Num(imp(num_arg(args, 0)))),
        )
    };

    map.insert("abs", unary("abs", Number::abs));
    map.insert("ceil", unary("ceil", Number::ceil));
    map.insert("floor", unary("floor", Number::floor));
    map.insert("exp", unary("exp", Number::exp));
    map.insert("ln", unary("ln", Number::ln));
    map.insert("log", unary("log", Number::log10));
    map.insert("sqrt", unary("sqrt", Number::sqrt));
    map.insert("round", unary("round", |n| n.round_half_away(0)));
    map.insert("roundBank", unary("roundBank", |n| n.round_half_even(0)));

    map.insert(
        "roundCash",
        NativeFunction::new(
            "roundCash",
            false,
            vec![ParamType::Number, ParamType::Int],
            None,
            ParamType::Number,
            round_cash,
        ),
    );
    map.insert(
        "max",
        NativeFunction::new(
            "max",
            false,
            vec![],
            Some(ParamType::Number),
            ParamType::Number,
            max,
        ),
    );
    map.insert(
        "min",
        NativeFunction::new(
            "min",
            false,
            vec![],
            Some(ParamType::Number),
            ParamType::Number,
            min,
        ),
    );
    map.insert(
        "finite",
        NativeFunction::new(
            "finite",
            false,
            vec![ParamType::Any],
            None,
            ParamType::Number,
            finite,
        ),
    );
}

/// Swedish cash rounding: the interval selects the coin quantum, and the
/// value rounds half-up to the nearest multiple of it.
fn round_cash(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let value = num_arg(args, 0);
    let interval = int_arg(args, 1);
    let quantum = match interval {
        5 => "0.05",
        10 => "0.10",
        25 => "0.25",
        50 => "0.50",
        100 => "1.00",
        other => return Err(format!("unsupported cash rounding interval {other}")),
    };
    // The quantum literals above always parse.
    let quantum = Number::Finite(Decimal::from_str(quantum).unwrap_or(Decimal::ONE));

    if !value.is_finite() {
        return Ok(Value::Num(value));
    }
    let rounded = value.div(quantum).round_half_away(0).mul(quantum);
    Ok(Value::Num(rounded))
}

fn max(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    fold_extremum(args, true)
}

fn min(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    fold_extremum(args, false)
}

fn fold_extremum(args: &[Value], want_max: bool) -> Result<Value, String> {
    if args.is_empty() {
        return Err("please input numbers".to_string());
    }
    let mut best = num_arg(args, 0);
    for index in 1..args.len() {
        let candidate = num_arg(args, index);
        let replace = if want_max {
            candidate.cmp_total(best).is_gt()
        } else {
            candidate.cmp_total(best).is_lt()
        };
        if replace {
            best = candidate;
        }
    }
    Ok(Value::Num(best))
}

/// The value itself when it is a finite number; zero for everything else
/// (NaN, infinities, non-numbers, null).
fn finite(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Num(n)) if n.is_finite() => Ok(Value::Num(*n)),
        _ => Ok(Value::Num(Number::ZERO)),
    }
}
