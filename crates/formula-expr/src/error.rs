//! Evaluation-time errors.
//!
//! Parse problems are [`Diagnostic`](crate::diagnostics::Diagnostic)s and
//! never surface here; everything below aborts an evaluation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The source carries error-category parse diagnostics and must not be
    /// evaluated. The payload is the first diagnostic, stringified.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Operator or coercion applied to an unsupported runtime type.
    #[error("{0}")]
    Type(String),

    #[error("expression '{name}' is not a function")]
    NotCallable { name: String },

    #[error("call function '{name}' error: function has no variadic parameter")]
    NotVariadic { name: String },

    #[error("call function '{name}' error: argument count expected {expected} but got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error(
        "call function '{name}' error: argument count expected at least {expected} but got {got}"
    )]
    ArityAtLeast {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A supplied argument could not be converted to the declared parameter
    /// type. `index` is 1-based, matching the error text.
    #[error("call function '{name}' conv arg#{index} error: {message}")]
    ArgConversion {
        name: String,
        index: usize,
        message: String,
    },

    /// `!.` on a null base.
    #[error("expression '{path}' value is null, can't access attribute '{member}'")]
    NullAccess { path: String, member: String },

    /// A native function reported an error; wrapped with the callee's dotted
    /// name.
    #[error("call function '{name}' error: {message}")]
    Builtin { name: String, message: String },
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}
