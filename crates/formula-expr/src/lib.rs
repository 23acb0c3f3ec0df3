#![forbid(unsafe_code)]

//! Embeddable formula-expression language.
//!
//! A formula is a single expression in a C-family scripting syntax:
//! arithmetic, comparisons, logical operators, ternary, member access, calls
//! into host-provided native functions, array literals, `typeof`,
//! assignment to `$`-prefixed temporaries and comma sequencing. The host
//! supplies a root object of bindings; [`parse`] turns source text into an
//! AST with diagnostics, and a [`Runner`] evaluates the AST against those
//! bindings:
//!
//! ```
//! use formula_expr::{parse, Runner, Value};
//!
//! let source = parse("(1 + 2) * 3");
//! assert!(source.diagnostics.is_empty());
//! let value = Runner::new().resolve(&source).unwrap();
//! assert_eq!(value, Value::from(9i64));
//! ```
//!
//! A second, evaluation-free pass lists every identifier and dotted path a
//! formula reads, so hosts can prefetch data:
//! [`resolve_reference_fields`].

pub mod ast;
pub mod date;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod refs;
pub mod value;

pub use ast::{Expr, SourceCode, Span, SyntaxKind};
pub use date::{Zone, ZonedTime};
pub use diagnostics::{format_diagnostic, Diagnostic, DiagnosticCategory};
pub use error::EvalError;
pub use eval::Runner;
pub use functions::{CallContext, NativeFunction, ParamType};
pub use parser::parse;
pub use refs::{resolve_reference_fields, resolve_reference_fields_not_local};
pub use value::{Number, Value};
