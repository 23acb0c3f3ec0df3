//! Expression tree produced by the parser.
//!
//! Every node carries a byte-offset [`Span`] into the source buffer. The tree
//! is pure: children are owned by their parent and nothing points back up.

use std::fmt;
use std::sync::OnceLock;

use crate::diagnostics::{compute_line_starts, Diagnostic};

/// Token kinds produced by the scanner.
///
/// The set is closed: the scanner never emits anything outside this enum, and
/// the parser drives entirely off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Unknown,
    EndOfFile,

    NumberLiteral,
    StringLiteral,

    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Dot,
    DotDotDot,
    Comma,

    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    EqualsEquals,
    EqualsEqualsEquals,
    ExclamationEquals,
    ExclamationEqualsEquals,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Ampersand,
    Bar,
    Caret,
    AmpersandAmpersand,
    BarBar,
    QuestionQuestion,
    Exclamation,
    ExclamationDot,
    ExclamationExclamation,
    Tilde,
    Question,
    Colon,

    Equals,

    Identifier,

    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    ThisKeyword,
    CtxKeyword,
    TypeofKeyword,
}

impl SyntaxKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::NullKeyword
                | SyntaxKind::ThisKeyword
                | SyntaxKind::CtxKeyword
                | SyntaxKind::TypeofKeyword
        )
    }

    /// Identifier position: a bare identifier or any keyword (keywords are
    /// valid member names after `.`).
    pub fn is_identifier_or_keyword(self) -> bool {
        self == SyntaxKind::Identifier || self.is_keyword()
    }

    pub fn is_assignment_operator(self) -> bool {
        self == SyntaxKind::Equals
    }

    /// Fixed source text for punctuation and keywords.
    pub fn text(self) -> &'static str {
        match self {
            SyntaxKind::OpenParen => "(",
            SyntaxKind::CloseParen => ")",
            SyntaxKind::OpenBracket => "[",
            SyntaxKind::CloseBracket => "]",
            SyntaxKind::Dot => ".",
            SyntaxKind::DotDotDot => "...",
            SyntaxKind::Comma => ",",
            SyntaxKind::LessThan => "<",
            SyntaxKind::GreaterThan => ">",
            SyntaxKind::LessThanEquals => "<=",
            SyntaxKind::GreaterThanEquals => ">=",
            SyntaxKind::EqualsEquals => "==",
            SyntaxKind::EqualsEqualsEquals => "===",
            SyntaxKind::ExclamationEquals => "!=",
            SyntaxKind::ExclamationEqualsEquals => "!==",
            SyntaxKind::Plus => "+",
            SyntaxKind::Minus => "-",
            SyntaxKind::Asterisk => "*",
            SyntaxKind::Slash => "/",
            SyntaxKind::Percent => "%",
            SyntaxKind::Ampersand => "&",
            SyntaxKind::Bar => "|",
            SyntaxKind::Caret => "^",
            SyntaxKind::AmpersandAmpersand => "&&",
            SyntaxKind::BarBar => "||",
            SyntaxKind::QuestionQuestion => "??",
            SyntaxKind::Exclamation => "!",
            SyntaxKind::ExclamationDot => "!.",
            SyntaxKind::ExclamationExclamation => "!!",
            SyntaxKind::Tilde => "~",
            SyntaxKind::Question => "?",
            SyntaxKind::Colon => ":",
            SyntaxKind::Equals => "=",
            SyntaxKind::TrueKeyword => "true",
            SyntaxKind::FalseKeyword => "false",
            SyntaxKind::NullKeyword => "null",
            SyntaxKind::ThisKeyword => "this",
            SyntaxKind::CtxKeyword => "ctx",
            SyntaxKind::TypeofKeyword => "typeof",
            _ => "",
        }
    }

    pub fn keyword_from_str(text: &str) -> Option<SyntaxKind> {
        match text {
            "true" => Some(SyntaxKind::TrueKeyword),
            "false" => Some(SyntaxKind::FalseKeyword),
            "null" => Some(SyntaxKind::NullKeyword),
            "this" => Some(SyntaxKind::ThisKeyword),
            "ctx" => Some(SyntaxKind::CtxKeyword),
            "typeof" => Some(SyntaxKind::TypeofKeyword),
            _ => None,
        }
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Half-open byte range `[pos, end)` into the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub pos: usize,
    pub end: usize,
}

impl Span {
    pub fn new(pos: usize, end: usize) -> Self {
        Self { pos, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.pos
    }

    pub fn contains(&self, other: Span) -> bool {
        self.pos <= other.pos && other.end <= self.end
    }
}

/// Ordered child list with its own source range (argument lists, array
/// elements).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeList {
    pub nodes: Vec<Expr>,
    pub span: Span,
}

impl NodeList {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.nodes.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub value: String,
    /// Token the name was scanned as. Keywords are legal identifier names on
    /// the right side of `.`.
    pub original_token: SyntaxKind,
    pub span: Span,
}

impl Identifier {
    /// Placeholder identifier inserted during error recovery.
    pub fn missing(pos: usize) -> Self {
        Self {
            value: String::new(),
            original_token: SyntaxKind::Unknown,
            span: Span::new(pos, pos),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_empty() && self.span.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// One of `NumberLiteral`, `StringLiteral`, `TrueKeyword`, `FalseKeyword`,
    /// `NullKeyword`, `ThisKeyword`, `CtxKeyword`.
    pub token: SyntaxKind,
    /// Cooked token value: digits with separators removed, string contents
    /// with escapes applied.
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixExpr {
    pub op: SyntaxKind,
    pub op_span: Span,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: SyntaxKind,
    pub op_span: Span,
    pub right: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpr {
    pub condition: Expr,
    pub when_true: Expr,
    pub when_false: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLit {
    pub elements: NodeList,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    pub inner: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorExpr {
    pub base: Expr,
    pub name: Identifier,
    /// `!.` instead of `.`: fail evaluation when the base is null.
    pub assert: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: NodeList,
    /// A trailing `...` marks the last argument for spread-apply.
    pub spread_last: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeofExpr {
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    Prefix(Box<PrefixExpr>),
    Binary(Box<BinaryExpr>),
    Conditional(Box<ConditionalExpr>),
    Array(Box<ArrayLit>),
    Paren(Box<ParenExpr>),
    Selector(Box<SelectorExpr>),
    Call(Box<CallExpr>),
    Typeof(Box<TypeofExpr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(n) => n.span,
            Expr::Literal(n) => n.span,
            Expr::Prefix(n) => n.span,
            Expr::Binary(n) => n.span,
            Expr::Conditional(n) => n.span,
            Expr::Array(n) => n.span,
            Expr::Paren(n) => n.span,
            Expr::Selector(n) => n.span,
            Expr::Call(n) => n.span,
            Expr::Typeof(n) => n.span,
        }
    }

    /// Source text for the node, used when errors name a subexpression.
    pub fn source_text<'a>(&self, source: &'a str) -> &'a str {
        let span = self.span();
        source.get(span.pos..span.end).unwrap_or("")
    }
}

/// Result of a parse: the source buffer, the root expression, every
/// diagnostic produced along the way, and a lazily computed line-start table.
#[derive(Debug)]
pub struct SourceCode {
    pub text: String,
    pub expr: Expr,
    pub diagnostics: Vec<Diagnostic>,
    line_starts: OnceLock<Vec<usize>>,
}

impl SourceCode {
    pub fn new(text: String, expr: Expr, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            text,
            expr,
            diagnostics,
            line_starts: OnceLock::new(),
        }
    }

    /// Byte offsets of line starts, computed on first use.
    pub fn line_starts(&self) -> &[usize] {
        self.line_starts
            .get_or_init(|| compute_line_starts(&self.text))
    }

    /// True when any error-category diagnostic was recorded; such a source
    /// must not be evaluated.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }
}
