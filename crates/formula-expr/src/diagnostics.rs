//! Parse diagnostics: message catalog with stable codes, accumulation
//! values, and line/column mapping over a cached line-start table.

use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Information,
}

impl DiagnosticCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Information => "info",
        }
    }
}

/// A message template with its stable code. The codes are part of the
/// public interface; tooling matches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

macro_rules! message {
    ($name:ident, $code:expr, $text:expr) => {
        pub const $name: &DiagnosticMessage = &DiagnosticMessage {
            code: $code,
            category: DiagnosticCategory::Error,
            message: $text,
        };
    };
}

message!(M_UNTERMINATED_STRING_LITERAL, 1002, "unterminated string literal");
message!(M_IDENTIFIER_EXPECTED, 1003, "identifier expected");
message!(M_0_EXPECTED, 1005, "{0} expected");
message!(M_TRAILING_COMMA_NOT_ALLOWED, 1009, "trailing comma not allowed");
message!(M_EXPRESSION_EXPECTED, 1109, "expression expected");
message!(M_DIGIT_EXPECTED, 1124, "digit expected");
message!(M_HEX_DIGIT_EXPECTED, 1125, "hexadecimal digit expected");
message!(M_UNEXPECTED_END_OF_TEXT, 1126, "unexpected end of text");
message!(M_INVALID_CHARACTER, 1127, "invalid character");
message!(M_ARGUMENT_EXPRESSION_EXPECTED, 1135, "argument expression expected");
message!(M_EXPRESSION_OR_COMMA_EXPECTED, 1137, "expression or comma expected");
message!(
    M_MULTIPLE_CONSECUTIVE_NUMERIC_SEPARATORS,
    1301,
    "multiple consecutive numeric separators are not permitted"
);
message!(
    M_NUMERIC_SEPARATOR_NOT_ALLOWED,
    1302,
    "numeric separators are not allowed here"
);
message!(
    M_IDENTIFIER_AFTER_NUMERIC_LITERAL,
    1302,
    "an identifier or keyword cannot immediately follow a numeric literal"
);

/// A single formatted diagnostic anchored to a source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub start: usize,
    pub length: usize,
    pub category: DiagnosticCategory,
    pub code: u32,
    pub text: String,
}

impl Diagnostic {
    pub fn new(message: &DiagnosticMessage, start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            category: message.category,
            code: message.code,
            text: message.message.to_string(),
        }
    }

    /// Build a diagnostic from a template with `{0}`, `{1}`, … placeholders.
    pub fn with_args(
        message: &DiagnosticMessage,
        start: usize,
        length: usize,
        args: &[&str],
    ) -> Self {
        let mut text = message.message.to_string();
        for (i, arg) in args.iter().enumerate() {
            text = text.replace(&format!("{{{i}}}"), arg);
        }
        Self {
            start,
            length,
            category: message.category,
            code: message.code,
            text,
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

/// Zero-based line/column position. Columns count bytes from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Byte offsets at which each line starts. `\r\n` counts as one terminator;
/// U+2028, U+2029 and U+0085 also end lines.
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut result = Vec::new();
    let mut line_start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((pos, ch)) = iter.next() {
        let next = pos + ch.len_utf8();
        match ch {
            '\r' => {
                let after = if matches!(iter.peek(), Some((_, '\n'))) {
                    iter.next();
                    next + 1
                } else {
                    next
                };
                result.push(line_start);
                line_start = after;
            }
            '\n' | '\u{2028}' | '\u{2029}' | '\u{0085}' => {
                result.push(line_start);
                line_start = next;
            }
            _ => {}
        }
    }
    result.push(line_start);
    result
}

/// Map a byte offset to its line/column against a precomputed line-start
/// table.
pub fn position_of_offset(line_starts: &[usize], offset: usize) -> Position {
    let line = match line_starts.binary_search(&offset) {
        Ok(line) => line,
        Err(insert) => insert.saturating_sub(1),
    };
    Position {
        line,
        column: offset - line_starts[line],
    }
}

/// Inverse of [`position_of_offset`]: the byte offset of a line/column pair.
/// Columns past the end of the text clamp to the text length.
pub fn offset_of_position(text: &str, line_starts: &[usize], position: Position) -> usize {
    let Some(&start) = line_starts.get(position.line) else {
        return text.len();
    };
    (start + position.column).min(text.len())
}

/// Stable stringified form: `pos({line},{col}) {category}({code}) {message}`.
pub fn format_diagnostic(source: &crate::SourceCode, diagnostic: &Diagnostic) -> String {
    let position = position_of_offset(source.line_starts(), diagnostic.start);
    format!(
        "pos({},{}) {}({}) {}",
        position.line,
        position.column,
        diagnostic.category.as_str(),
        diagnostic.code,
        diagnostic.text
    )
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {}",
            self.category.as_str(),
            self.code,
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_handle_crlf_as_one_break() {
        assert_eq!(compute_line_starts("a\r\nb\nc"), vec![0, 3, 5]);
    }

    #[test]
    fn position_mapping_is_zero_based() {
        let starts = compute_line_starts("ab\ncd");
        assert_eq!(
            position_of_offset(&starts, 4),
            Position { line: 1, column: 1 }
        );
        assert_eq!(
            position_of_offset(&starts, 0),
            Position { line: 0, column: 0 }
        );
    }

    #[test]
    fn offset_of_position_round_trips() {
        let text = "ab\ncd";
        let starts = compute_line_starts(text);
        let position = Position { line: 1, column: 2 };
        assert_eq!(offset_of_position(text, &starts, position), 5);
    }

    #[test]
    fn message_args_substitute_in_order() {
        let d = Diagnostic::with_args(M_0_EXPECTED, 3, 1, &[")"]);
        assert_eq!(d.text, ") expected");
        assert_eq!(d.code, 1005);
    }
}
