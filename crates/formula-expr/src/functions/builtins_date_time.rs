//! Date and time builtins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::date::ZonedTime;
use crate::value::Value;

use super::{int_arg, text_arg, time_arg, CallContext, NativeFunction, ParamType};

pub(super) fn register(map: &mut HashMap<&'static str, Arc<NativeFunction>>) {
    map.insert(
        "now",
        NativeFunction::new("now", true, vec![], None, ParamType::Time, now),
    );
    map.insert(
        "toDay",
        NativeFunction::new("toDay", true, vec![], None, ParamType::Time, to_day),
    );
    map.insert(
        "date",
        NativeFunction::new(
            "date",
            true,
            vec![ParamType::Int, ParamType::Int, ParamType::Int],
            None,
            ParamType::Time,
            date,
        ),
    );
    map.insert(
        "addDate",
        NativeFunction::new(
            "addDate",
            false,
            vec![ParamType::Time, ParamType::Int, ParamType::Int, ParamType::Int],
            None,
            ParamType::Time,
            add_date,
        ),
    );
    map.insert(
        "year",
        NativeFunction::new("year", false, vec![ParamType::Time], None, ParamType::Number, year),
    );
    map.insert(
        "month",
        NativeFunction::new("month", false, vec![ParamType::Time], None, ParamType::Number, month),
    );
    map.insert(
        "day",
        NativeFunction::new("day", false, vec![ParamType::Time], None, ParamType::Number, day),
    );
    map.insert(
        "hour",
        NativeFunction::new("hour", false, vec![ParamType::Time], None, ParamType::Number, hour),
    );
    map.insert(
        "minute",
        NativeFunction::new(
            "minute",
            false,
            vec![ParamType::Time],
            None,
            ParamType::Number,
            minute,
        ),
    );
    map.insert(
        "second",
        NativeFunction::new(
            "second",
            false,
            vec![ParamType::Time],
            None,
            ParamType::Number,
            second,
        ),
    );
    map.insert(
        "millSecond",
        NativeFunction::new(
            "millSecond",
            false,
            vec![ParamType::Time],
            None,
            ParamType::Number,
            mill_second,
        ),
    );
    map.insert(
        "weekDay",
        NativeFunction::new(
            "weekDay",
            false,
            vec![ParamType::Time],
            None,
            ParamType::Number,
            week_day,
        ),
    );
    map.insert(
        "timeFormat",
        NativeFunction::new(
            "timeFormat",
            false,
            vec![ParamType::Time, ParamType::Text],
            None,
            ParamType::Text,
            time_format,
        ),
    );
    map.insert(
        "useTimezone",
        NativeFunction::new(
            "useTimezone",
            false,
            vec![ParamType::Time, ParamType::Text],
            None,
            ParamType::Time,
            use_timezone,
        ),
    );
}

fn now(ctx: &CallContext, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Time(ctx.now()))
}

fn to_day(ctx: &CallContext, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Time(ctx.now().start_of_day()))
}

fn date(ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let time = ZonedTime::from_ymd(
        int_arg(args, 0),
        int_arg(args, 1),
        int_arg(args, 2),
        ctx.zone,
    );
    Ok(Value::Time(time))
}

fn add_date(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let time = time_arg(args, 0);
    Ok(Value::Time(time.add_date(
        int_arg(args, 1),
        int_arg(args, 2),
        int_arg(args, 3),
    )))
}

fn year(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).year()))
}

fn month(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).month()))
}

fn day(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).day()))
}

fn hour(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).hour()))
}

fn minute(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).minute()))
}

fn second(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).second()))
}

fn mill_second(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).timestamp_millis()))
}

fn week_day(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(time_arg(args, 0).weekday_from_sunday()))
}

fn time_format(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let formatted = time_arg(args, 0).format(text_arg(args, 1))?;
    Ok(Value::Str(formatted))
}

fn use_timezone(_ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
    let shifted = time_arg(args, 0).with_timezone(text_arg(args, 1))?;
    Ok(Value::Time(shifted))
}
