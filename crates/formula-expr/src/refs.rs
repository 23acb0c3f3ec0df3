//! Static reference extraction.
//!
//! Lists every identifier and dotted selector path a formula reads so the
//! host can prefetch data before evaluating. Call callee names are not
//! references (only their arguments are walked), and the `not_local` variant
//! drops `$`-prefixed temporaries.

use crate::ast::{Expr, SourceCode};
use crate::error::EvalError;

/// All referenced names, deduplicated, in first-seen order.
pub fn resolve_reference_fields(source: &SourceCode) -> Result<Vec<String>, EvalError> {
    let mut collector = ReferenceCollector::default();
    collector.walk(&source.expr)?;
    Ok(collector.fields)
}

/// [`resolve_reference_fields`] without `$`-prefixed temporaries.
pub fn resolve_reference_fields_not_local(source: &SourceCode) -> Result<Vec<String>, EvalError> {
    let fields = resolve_reference_fields(source)?;
    Ok(fields
        .into_iter()
        .filter(|field| !field.starts_with('$'))
        .collect())
}

#[derive(Default)]
struct ReferenceCollector {
    fields: Vec<String>,
}

impl ReferenceCollector {
    fn push(&mut self, field: String) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    fn walk(&mut self, expr: &Expr) -> Result<(), EvalError> {
        match expr {
            Expr::Identifier(identifier) => {
                self.push(identifier.value.clone());
                Ok(())
            }
            Expr::Literal(_) => Ok(()),
            Expr::Prefix(prefix) => self.walk(&prefix.operand),
            Expr::Typeof(node) => self.walk(&node.operand),
            Expr::Paren(paren) => self.walk(&paren.inner),
            Expr::Binary(binary) => {
                self.walk(&binary.left)?;
                self.walk(&binary.right)
            }
            Expr::Conditional(conditional) => {
                self.walk(&conditional.condition)?;
                self.walk(&conditional.when_true)?;
                self.walk(&conditional.when_false)
            }
            Expr::Array(array) => {
                for element in array.elements.iter() {
                    self.walk(element)?;
                }
                Ok(())
            }
            Expr::Selector(_) => {
                let path = selector_path(expr)?;
                self.push(path);
                Ok(())
            }
            // The callee name is not a data reference; its arguments are.
            Expr::Call(call) => {
                for arg in call.args.iter() {
                    self.walk(arg)?;
                }
                Ok(())
            }
        }
    }
}

/// Dotted path of a selector chain rooted at an identifier. Chains rooted
/// anywhere else (a call result, a literal) have no static path.
fn selector_path(expr: &Expr) -> Result<String, EvalError> {
    match expr {
        Expr::Identifier(identifier) => Ok(identifier.value.clone()),
        Expr::Selector(selector) => {
            let base = selector_path(&selector.base)?;
            Ok(format!("{base}.{}", selector.name.value))
        }
        other => Err(EvalError::type_error(format!(
            "selector base does not form a static path: {}",
            name_of(other)
        ))),
    }
}

fn name_of(expr: &Expr) -> &'static str {
    match expr {
        Expr::Identifier(_) => "identifier",
        Expr::Literal(_) => "literal",
        Expr::Prefix(_) => "unary expression",
        Expr::Binary(_) => "binary expression",
        Expr::Conditional(_) => "conditional expression",
        Expr::Array(_) => "array literal",
        Expr::Paren(_) => "parenthesized expression",
        Expr::Selector(_) => "selector expression",
        Expr::Call(_) => "call expression",
        Expr::Typeof(_) => "typeof expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn fields(text: &str) -> Vec<String> {
        resolve_reference_fields(&parse(text)).expect("reference extraction")
    }

    #[test]
    fn identifiers_and_dotted_paths() {
        assert_eq!(
            fields("person.name + person.age + lala + run(a, b.c)"),
            vec!["person.name", "person.age", "lala", "a", "b.c"]
        );
    }

    #[test]
    fn callee_names_are_excluded() {
        assert_eq!(fields("join(mapToArr(value, 'name'), ',')"), vec!["value"]);
    }

    #[test]
    fn duplicates_are_removed() {
        assert_eq!(fields("a + a * a"), vec!["a"]);
    }

    #[test]
    fn walks_every_expression_form() {
        assert_eq!(
            fields("c ? [x, -y] : typeof (z)"),
            vec!["c", "x", "y", "z"]
        );
    }

    #[test]
    fn not_local_filters_dollar_names() {
        let source = parse("$t = a, $t + b");
        assert_eq!(
            resolve_reference_fields(&source).unwrap(),
            vec!["$t", "a", "b"]
        );
        assert_eq!(
            resolve_reference_fields_not_local(&source).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn selector_off_a_call_is_not_a_static_path() {
        let source = parse("f(x).y");
        assert!(resolve_reference_fields(&source).is_err());
    }
}
