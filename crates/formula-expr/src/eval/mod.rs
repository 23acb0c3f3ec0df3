//! Tree-walking evaluator.
//!
//! A [`Runner`] owns the root bindings (`this`), the `$`-prefixed
//! temporaries created by assignment (kept for the runner's lifetime), and
//! the zone its date functions evaluate in. Evaluation is strict
//! left-to-right except for `&&`, `||`, `??` and the ternary, which
//! short-circuit.

use std::collections::HashMap;

use crate::ast::{Expr, Literal, SourceCode, SyntaxKind};
use crate::date::Zone;
use crate::diagnostics::format_diagnostic;
use crate::error::EvalError;
use crate::functions::{self, CallContext};
use crate::value::{Number, Value};

pub struct Runner {
    this: HashMap<String, Value>,
    locals: HashMap<String, Value>,
    zone: Zone,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            this: HashMap::new(),
            locals: HashMap::new(),
            zone: Zone::Local,
        }
    }

    /// Replace the root bindings.
    pub fn set_this(&mut self, bindings: HashMap<String, Value>) {
        self.this = bindings;
    }

    pub fn set_this_value(&mut self, key: impl Into<String>, value: Value) {
        self.this.insert(key.into(), value);
    }

    /// Zone used by the date builtins (`now`, `toDay`, `date`).
    pub fn set_timezone(&mut self, zone: Zone) {
        self.zone = zone;
    }

    /// Evaluate a parsed formula. Sources carrying error diagnostics are
    /// rejected up front.
    pub fn resolve(&mut self, source: &SourceCode) -> Result<Value, EvalError> {
        if let Some(first) = source.diagnostics.iter().find(|d| d.is_error()) {
            return Err(EvalError::Syntax(format_diagnostic(source, first)));
        }
        self.eval(source, &source.expr)
    }

    fn eval(&mut self, source: &SourceCode, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Identifier(identifier) => Ok(self.resolve_identifier(&identifier.value)),
            Expr::Literal(literal) => self.eval_literal(literal),
            Expr::Paren(paren) => self.eval(source, &paren.inner),
            Expr::Prefix(prefix) => {
                let operand = self.eval(source, &prefix.operand)?;
                eval_prefix(prefix.op, operand)
            }
            Expr::Typeof(node) => {
                let value = self.eval(source, &node.operand)?;
                Ok(Value::Str(value.type_name().to_string()))
            }
            Expr::Binary(binary) => self.eval_binary(source, binary),
            Expr::Conditional(conditional) => {
                let condition = self.eval(source, &conditional.condition)?;
                if condition.truthy() {
                    self.eval(source, &conditional.when_true)
                } else {
                    self.eval(source, &conditional.when_false)
                }
            }
            Expr::Array(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in array.elements.iter() {
                    items.push(self.eval(source, element)?);
                }
                Ok(Value::Array(items))
            }
            Expr::Selector(selector) => {
                let base = self.eval(source, &selector.base)?;
                if base.is_null() && selector.assert {
                    return Err(EvalError::NullAccess {
                        path: selector.base.source_text(&source.text).to_string(),
                        member: selector.name.value.clone(),
                    });
                }
                Ok(select_member(&base, &selector.name.value))
            }
            Expr::Call(call) => self.eval_call(source, call),
        }
    }

    /// Builtins shadow host bindings; `$` names live only in the
    /// temporaries map.
    fn resolve_identifier(&self, name: &str) -> Value {
        if name.starts_with('$') {
            return self.locals.get(name).cloned().unwrap_or(Value::Null);
        }
        if let Some(builtin) = functions::lookup_builtin(name) {
            return Value::NativeFn(builtin);
        }
        self.this.get(name).cloned().unwrap_or(Value::Null)
    }

    fn eval_literal(&self, literal: &Literal) -> Result<Value, EvalError> {
        match literal.token {
            SyntaxKind::TrueKeyword => Ok(Value::Bool(true)),
            SyntaxKind::FalseKeyword => Ok(Value::Bool(false)),
            SyntaxKind::NullKeyword => Ok(Value::Null),
            SyntaxKind::ThisKeyword => Ok(Value::Object(self.this.clone())),
            // The host context object has no value-model counterpart.
            SyntaxKind::CtxKeyword => Ok(Value::Null),
            SyntaxKind::StringLiteral => Ok(Value::Str(literal.value.clone())),
            SyntaxKind::NumberLiteral => match Number::from_literal(&literal.value) {
                Some(number) => Ok(Value::Num(number)),
                None => Err(EvalError::type_error(format!(
                    "'{}' is not a number literal",
                    literal.value
                ))),
            },
            _ => Err(EvalError::type_error("unknown literal expression")),
        }
    }

    fn eval_binary(
        &mut self,
        source: &SourceCode,
        binary: &crate::ast::BinaryExpr,
    ) -> Result<Value, EvalError> {
        match binary.op {
            SyntaxKind::Equals => {
                return self.eval_assignment(source, binary);
            }
            // Short-circuit forms return the deciding operand unchanged.
            SyntaxKind::AmpersandAmpersand => {
                let left = self.eval(source, &binary.left)?;
                return if left.truthy() {
                    self.eval(source, &binary.right)
                } else {
                    Ok(left)
                };
            }
            SyntaxKind::BarBar => {
                let left = self.eval(source, &binary.left)?;
                return if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(source, &binary.right)
                };
            }
            SyntaxKind::QuestionQuestion => {
                let left = self.eval(source, &binary.left)?;
                return if left.is_null() {
                    self.eval(source, &binary.right)
                } else {
                    Ok(left)
                };
            }
            SyntaxKind::Comma => {
                self.eval(source, &binary.left)?;
                return self.eval(source, &binary.right);
            }
            _ => {}
        }

        let left = self.eval(source, &binary.left)?;
        let right = self.eval(source, &binary.right)?;
        eval_binary_operator(binary.op, left, right)
    }

    fn eval_assignment(
        &mut self,
        source: &SourceCode,
        binary: &crate::ast::BinaryExpr,
    ) -> Result<Value, EvalError> {
        let Expr::Identifier(target) = &binary.left else {
            return Err(EvalError::type_error(
                "assignment target must be an identifier",
            ));
        };
        if !target.value.starts_with('$') {
            return Err(EvalError::type_error(format!(
                "assignment target must start with '$' but is '{}'",
                target.value
            )));
        }

        let value = self.eval(source, &binary.right)?;
        self.locals.insert(target.value.clone(), value.clone());
        Ok(value)
    }

    fn eval_call(
        &mut self,
        source: &SourceCode,
        call: &crate::ast::CallExpr,
    ) -> Result<Value, EvalError> {
        let callee = self.eval(source, &call.callee)?;
        let name = callee_path(&call.callee).unwrap_or_else(|| {
            call.callee.source_text(&source.text).to_string()
        });

        let Value::NativeFn(function) = callee else {
            return Err(EvalError::NotCallable { name });
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in call.args.iter() {
            args.push(self.eval(source, arg)?);
        }

        let ctx = CallContext::new(self.zone);
        functions::call(&name, &function, &ctx, args, call.spread_last)
    }
}

/// Dotted path of a callee expression, used for error messages.
fn callee_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(identifier) => Some(identifier.value.clone()),
        Expr::Selector(selector) => {
            let base = callee_path(&selector.base)?;
            Some(format!("{base}.{}", selector.name.value))
        }
        _ => None,
    }
}

/// Member lookup: objects by key, anything else (including null) yields
/// null.
fn select_member(base: &Value, name: &str) -> Value {
    match base {
        Value::Object(fields) => fields.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn eval_prefix(op: SyntaxKind, operand: Value) -> Result<Value, EvalError> {
    match op {
        SyntaxKind::Plus => numeric_sign(operand, false, "+"),
        SyntaxKind::Minus => numeric_sign(operand, true, "-"),
        SyntaxKind::Exclamation => match &operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Num(_) => Ok(Value::Bool(!operand.truthy())),
            Value::Null => Ok(Value::Bool(true)),
            other => Err(unsupported_unary("!", other)),
        },
        SyntaxKind::ExclamationExclamation => Ok(Value::Bool(operand.truthy())),
        SyntaxKind::Tilde => match operand {
            Value::Num(n) => Ok(Value::Num(Number::from_i64(!n.to_i64()))),
            other => Err(unsupported_unary("~", &other)),
        },
        _ => Err(EvalError::type_error("unknown unary expression")),
    }
}

/// Unary `+`/`-`. Strings go through an integer parse and fall back to NaN;
/// objects are NaN outright.
fn numeric_sign(operand: Value, negate: bool, op: &str) -> Result<Value, EvalError> {
    match &operand {
        Value::Num(n) => Ok(Value::Num(if negate { n.neg() } else { *n })),
        Value::Str(s) => match s.parse::<i64>() {
            Ok(parsed) => Ok(Value::Num(Number::from_i64(if negate {
                -parsed
            } else {
                parsed
            }))),
            Err(_) => Ok(Value::Num(Number::Nan)),
        },
        Value::Object(_) => Ok(Value::Num(Number::Nan)),
        other => Err(unsupported_unary(op, other)),
    }
}

fn unsupported_unary(op: &str, operand: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unary expression '{op}' does not support type {}",
        functions::debug_type_name(operand)
    ))
}

fn eval_binary_operator(op: SyntaxKind, left: Value, right: Value) -> Result<Value, EvalError> {
    use std::cmp::Ordering;

    let compare = |ordering: &[Ordering], left: &Value, right: &Value| -> Value {
        // String comparison when the left side is a string, numeric
        // otherwise; the left operand picks the domain.
        let result = match left {
            Value::Str(s) => s.as_str().cmp(right.coerce_to_string().as_str()),
            _ => left.coerce_to_number().cmp_total(right.coerce_to_number()),
        };
        Value::Bool(ordering.contains(&result))
    };

    match op {
        SyntaxKind::Plus | SyntaxKind::Minus => match &left {
            // `-` on strings concatenates, matching the reference engine's
            // observable behavior.
            Value::Str(s) => Ok(Value::Str(format!("{s}{}", right.coerce_to_string()))),
            _ => {
                let a = left.coerce_to_number();
                let b = right.coerce_to_number();
                Ok(Value::Num(if op == SyntaxKind::Plus {
                    a.add(b)
                } else {
                    a.sub(b)
                }))
            }
        },
        SyntaxKind::Asterisk => Ok(Value::Num(
            left.coerce_to_number().mul(right.coerce_to_number()),
        )),
        SyntaxKind::Slash => Ok(Value::Num(
            left.coerce_to_number().div(right.coerce_to_number()),
        )),
        SyntaxKind::Percent => Ok(Value::Num(
            left.coerce_to_number().rem(right.coerce_to_number()),
        )),
        SyntaxKind::Ampersand | SyntaxKind::Bar | SyntaxKind::Caret => {
            let a = left.coerce_to_number().to_i64();
            let b = right.coerce_to_number().to_i64();
            let result = match op {
                SyntaxKind::Ampersand => a & b,
                SyntaxKind::Bar => a | b,
                _ => a ^ b,
            };
            Ok(Value::Num(Number::from_i64(result)))
        }
        SyntaxKind::LessThan => Ok(compare(&[Ordering::Less], &left, &right)),
        SyntaxKind::GreaterThan => Ok(compare(&[Ordering::Greater], &left, &right)),
        SyntaxKind::LessThanEquals => {
            Ok(compare(&[Ordering::Less, Ordering::Equal], &left, &right))
        }
        SyntaxKind::GreaterThanEquals => {
            Ok(compare(&[Ordering::Greater, Ordering::Equal], &left, &right))
        }
        SyntaxKind::EqualsEquals => Ok(Value::Bool(left.loose_equals(&right))),
        SyntaxKind::ExclamationEquals => Ok(Value::Bool(!left.loose_equals(&right))),
        SyntaxKind::EqualsEqualsEquals => Ok(Value::Bool(left.strict_equals(&right))),
        SyntaxKind::ExclamationEqualsEquals => Ok(Value::Bool(!left.strict_equals(&right))),
        _ => Err(EvalError::type_error(format!(
            "unknown binary operator '{op}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(text: &str) -> Result<Value, EvalError> {
        let source = parse(text);
        Runner::new().resolve(&source)
    }

    fn run_with(text: &str, this: HashMap<String, Value>) -> Result<Value, EvalError> {
        let source = parse(text);
        let mut runner = Runner::new();
        runner.set_this(this);
        runner.resolve(&source)
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run("(1 + 2) * 3").unwrap(), Value::from(9i64));
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::from(7i64));
    }

    #[test]
    fn string_concatenation_when_left_is_string() {
        assert_eq!(run("'a' + 1").unwrap(), Value::from("a1"));
        assert_eq!(run("1 + '1'").unwrap(), Value::from(2i64));
        // `-` on a string left operand concatenates as well.
        assert_eq!(run("'a' - 'b'").unwrap(), Value::from("ab"));
    }

    #[test]
    fn division_produces_wide_decimals() {
        let Value::Num(n) = run("1 / 3 * 3").unwrap() else {
            panic!();
        };
        assert_eq!(n.round_half_away(10), Number::from_i64(1));
    }

    #[test]
    fn bitwise_operators_work_on_integer_parts() {
        assert_eq!(run("6 & 3").unwrap(), Value::from(2i64));
        assert_eq!(run("6 | 3").unwrap(), Value::from(7i64));
        assert_eq!(run("6 ^ 3").unwrap(), Value::from(5i64));
        assert_eq!(run("~5").unwrap(), Value::from(-6i64));
    }

    #[test]
    fn logical_operators_return_the_deciding_operand() {
        let this = HashMap::from([
            ("a".to_string(), Value::Null),
            ("b".to_string(), Value::from("hello")),
        ]);
        assert_eq!(run_with("a || b", this.clone()).unwrap(), Value::from("hello"));
        assert_eq!(run_with("a && b", this).unwrap(), Value::Null);
        assert_eq!(run("0 || 'x'").unwrap(), Value::from("x"));
        assert_eq!(run("1 && 'x'").unwrap(), Value::from("x"));
    }

    #[test]
    fn short_circuit_skips_the_untaken_side() {
        // `boom` is not callable; evaluation only fails if the side runs.
        assert_eq!(run("0 && boom()").unwrap(), Value::from(0i64));
        assert_eq!(run("1 || boom()").unwrap(), Value::from(1i64));
        assert!(run("1 && boom()").is_err());
    }

    #[test]
    fn nullish_only_null_is_nullish() {
        assert_eq!(run("0 ?? 5").unwrap(), Value::from(0i64));
        assert_eq!(run("'' ?? 'x'").unwrap(), Value::from(""));
        assert_eq!(run("null ?? 'x'").unwrap(), Value::from("x"));
    }

    #[test]
    fn ternary_is_not_strict_about_bools() {
        assert_eq!(run("1 ? 'a' : 'b'").unwrap(), Value::from("a"));
        assert_eq!(run("'' ? 'a' : 'b'").unwrap(), Value::from("b"));
    }

    #[test]
    fn assignment_binds_dollar_temporaries() {
        assert_eq!(run("$1 = 1, $2 = 2, $1 + $2").unwrap(), Value::from(3i64));
    }

    #[test]
    fn assignment_requires_dollar_identifier() {
        assert!(matches!(run("x = 1"), Err(EvalError::Type(_))));
    }

    #[test]
    fn temporaries_survive_across_resolves() {
        let mut runner = Runner::new();
        let first = parse("($x = 3, $x + 4)");
        assert_eq!(runner.resolve(&first).unwrap(), Value::from(7i64));
        let second = parse("$x");
        assert_eq!(runner.resolve(&second).unwrap(), Value::from(3i64));
    }

    #[test]
    fn dollar_names_do_not_read_from_this() {
        let this = HashMap::from([("$x".to_string(), Value::from(9i64))]);
        assert_eq!(run_with("$x", this).unwrap(), Value::Null);
    }

    #[test]
    fn selector_walks_objects_and_defaults_to_null() {
        let person = HashMap::from([("age".to_string(), Value::from(18i64))]);
        let this = HashMap::from([("person".to_string(), Value::Object(person))]);
        assert_eq!(run_with("person.age", this.clone()).unwrap(), Value::from(18i64));
        assert_eq!(run_with("person.name", this.clone()).unwrap(), Value::Null);
        assert_eq!(run_with("missing.name", this).unwrap(), Value::Null);
    }

    #[test]
    fn assert_selector_fails_on_null_base() {
        let err = run("missing!.name").unwrap_err();
        match err {
            EvalError::NullAccess { path, member } => {
                assert_eq!(path, "missing");
                assert_eq!(member, "name");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_identifier_is_null_but_calls_fail() {
        assert_eq!(run("nope").unwrap(), Value::Null);
        let err = run("nope(1)").unwrap_err();
        assert!(matches!(err, EvalError::NotCallable { name } if name == "nope"));
    }

    #[test]
    fn typeof_projections() {
        assert_eq!(run("typeof null").unwrap(), Value::from("object"));
        assert_eq!(run("typeof 1").unwrap(), Value::from("number"));
        assert_eq!(run("typeof 'x'").unwrap(), Value::from("string"));
        assert_eq!(run("typeof true").unwrap(), Value::from("boolean"));
        assert_eq!(run("typeof abs").unwrap(), Value::from("object"));
    }

    #[test]
    fn unary_plus_minus_string_parsing() {
        assert_eq!(run("+'12'").unwrap(), Value::from(12i64));
        assert_eq!(run("-'12'").unwrap(), Value::from(-12i64));
        let Value::Num(n) = run("+'x'").unwrap() else {
            panic!();
        };
        assert!(n.is_nan());
    }

    #[test]
    fn unary_not_rejects_strings() {
        assert!(matches!(run("!'a'"), Err(EvalError::Type(_))));
        assert_eq!(run("!null").unwrap(), Value::from(true));
        assert_eq!(run("!!'a'").unwrap(), Value::from(true));
    }

    #[test]
    fn this_literal_exposes_the_root_bindings() {
        let this = HashMap::from([("a".to_string(), Value::from(1i64))]);
        assert_eq!(run_with("this.a", this).unwrap(), Value::from(1i64));
    }

    #[test]
    fn syntax_errors_block_evaluation() {
        let source = parse("1 +");
        let err = Runner::new().resolve(&source).unwrap_err();
        assert!(matches!(err, EvalError::Syntax(_)));
    }

    #[test]
    fn comma_returns_the_right_value() {
        assert_eq!(run("1, 2, 3").unwrap(), Value::from(3i64));
    }

    #[test]
    fn comparisons_use_string_order_for_string_left() {
        assert_eq!(run("'b' > 'a'").unwrap(), Value::from(true));
        assert_eq!(run("'10' < '9'").unwrap(), Value::from(true));
        assert_eq!(run("10 > 9").unwrap(), Value::from(true));
        assert_eq!(run("10 >= '10'").unwrap(), Value::from(true));
    }

    #[test]
    fn hex_literals_evaluate_numerically() {
        assert_eq!(run("0x10 + 1").unwrap(), Value::from(17i64));
    }
}
