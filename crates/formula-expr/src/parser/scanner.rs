//! Lexical scanner.
//!
//! Yields one token per [`Scanner::scan`] call until [`SyntaxKind::EndOfFile`].
//! Lexical problems never abort scanning: they are queued as pending
//! diagnostics which the parser drains after each scan, and the scanner
//! resumes at the next character.

use crate::ast::SyntaxKind;
use crate::diagnostics::{
    DiagnosticMessage, M_DIGIT_EXPECTED, M_HEX_DIGIT_EXPECTED, M_IDENTIFIER_AFTER_NUMERIC_LITERAL,
    M_INVALID_CHARACTER, M_MULTIPLE_CONSECUTIVE_NUMERIC_SEPARATORS,
    M_NUMERIC_SEPARATOR_NOT_ALLOWED, M_UNEXPECTED_END_OF_TEXT, M_UNTERMINATED_STRING_LITERAL,
};

use super::unicode::{is_digit, is_identifier_part, is_identifier_start, is_line_break, is_whitespace};

/// Bit flags describing the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFlags(u16);

impl TokenFlags {
    pub const NONE: TokenFlags = TokenFlags(0);
    /// A line break occurred between the previous token and this one.
    pub const PRECEDING_LINE_BREAK: TokenFlags = TokenFlags(1 << 1);
    /// `10e2`
    pub const SCIENTIFIC: TokenFlags = TokenFlags(1 << 2);
    /// `0.123`
    pub const DECIMAL: TokenFlags = TokenFlags(1 << 3);
    /// `0x00ff`
    pub const HEX_SPECIFIER: TokenFlags = TokenFlags(1 << 4);
    /// `1_000_000`
    pub const CONTAINS_SEPARATOR: TokenFlags = TokenFlags(1 << 5);
    /// `\u0041`-style escape inside a string or identifier
    pub const UNICODE_ESCAPE: TokenFlags = TokenFlags(1 << 6);

    pub fn contains(self, other: TokenFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: TokenFlags) {
        self.0 |= other.0;
    }
}

/// A lexical diagnostic waiting to be collected by the parser.
#[derive(Debug, Clone)]
pub struct PendingError {
    pub message: &'static DiagnosticMessage,
    pub pos: usize,
    pub length: usize,
}

/// Snapshot of everything [`Scanner::scan`] mutates, used for speculative
/// parsing. Restoring rewinds the scanner exactly.
#[derive(Debug, Clone)]
pub struct ScannerState {
    pos: usize,
    start_pos: usize,
    token_pos: usize,
    token: SyntaxKind,
    token_value: String,
    token_flags: TokenFlags,
}

pub struct Scanner<'a> {
    text: &'a str,
    /// Current position: the end of the current token's text.
    pos: usize,
    end: usize,
    /// Start of whitespace preceding the current token.
    start_pos: usize,
    /// Start of the current token's text.
    token_pos: usize,
    token: SyntaxKind,
    token_value: String,
    token_flags: TokenFlags,
    pending_errors: Vec<PendingError>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            end: text.len(),
            start_pos: 0,
            token_pos: 0,
            token: SyntaxKind::Unknown,
            token_value: String::new(),
            token_flags: TokenFlags::NONE,
            pending_errors: Vec::new(),
        }
    }

    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    /// Start of whitespace preceding the current token (= end of the
    /// previous token's text).
    pub fn start_pos(&self) -> usize {
        self.start_pos
    }

    pub fn token_pos(&self) -> usize {
        self.token_pos
    }

    pub fn text_pos(&self) -> usize {
        self.pos
    }

    pub fn token_text(&self) -> &str {
        &self.text[self.token_pos..self.pos]
    }

    pub fn has_preceding_line_break(&self) -> bool {
        self.token_flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    /// Diagnostics queued since the last drain. The parser collects these
    /// after every scan.
    pub fn take_errors(&mut self) -> Vec<PendingError> {
        std::mem::take(&mut self.pending_errors)
    }

    pub fn snapshot(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            start_pos: self.start_pos,
            token_pos: self.token_pos,
            token: self.token,
            token_value: self.token_value.clone(),
            token_flags: self.token_flags,
        }
    }

    pub fn restore(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.start_pos = state.start_pos;
        self.token_pos = state.token_pos;
        self.token = state.token;
        self.token_value = state.token_value;
        self.token_flags = state.token_flags;
        self.pending_errors.clear();
    }

    fn error(&mut self, message: &'static DiagnosticMessage) {
        let pos = self.pos;
        self.error_at(message, pos, 0);
    }

    fn error_at(&mut self, message: &'static DiagnosticMessage, pos: usize, length: usize) {
        self.pending_errors.push(PendingError {
            message,
            pos,
            length,
        });
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..).and_then(|s| s.chars().next())
    }

    /// Rune `n` positions ahead of the cursor. When it equals `ch`, returns
    /// the byte position just past it.
    fn peek_equal(&self, n: usize, ch: char) -> Option<usize> {
        self.peek_check(n, |c| c == ch)
    }

    /// Rune `n` positions ahead of the cursor. When `pred` accepts it,
    /// returns the byte position just past it.
    fn peek_check(&self, n: usize, pred: impl Fn(char) -> bool) -> Option<usize> {
        let mut chars = self.text.get(self.pos..)?.char_indices();
        let mut remaining = n;
        for (offset, ch) in &mut chars {
            if remaining == 0 {
                return if pred(ch) {
                    Some(self.pos + offset + ch.len_utf8())
                } else {
                    None
                };
            }
            remaining -= 1;
        }
        None
    }

    /// Digit run with `_` separator validation. Separators are removed from
    /// the returned fragment; misplaced ones produce diagnostics and are
    /// skipped.
    fn scan_number_fragment(&mut self) -> String {
        let mut start = self.pos;
        let mut allow_separator = false;
        let mut previous_was_separator = false;
        let mut separator_start = 0;
        let mut result = String::new();

        while let Some(ch) = self.char_at(self.pos) {
            if ch == '_' {
                self.token_flags.insert(TokenFlags::CONTAINS_SEPARATOR);
                if allow_separator {
                    allow_separator = false;
                    previous_was_separator = true;
                    result.push_str(&self.text[start..self.pos]);
                } else if previous_was_separator {
                    self.error_at(M_MULTIPLE_CONSECUTIVE_NUMERIC_SEPARATORS, self.pos, 1);
                } else {
                    self.error_at(M_NUMERIC_SEPARATOR_NOT_ALLOWED, self.pos, 1);
                }
                separator_start = self.pos;
                self.pos += 1;
                start = self.pos;
                continue;
            }
            if is_digit(ch) {
                allow_separator = true;
                previous_was_separator = false;
                self.pos += 1;
                continue;
            }
            break;
        }

        if previous_was_separator {
            self.error_at(M_NUMERIC_SEPARATOR_NOT_ALLOWED, separator_start, 1);
        }

        result.push_str(&self.text[start..self.pos]);
        result
    }

    fn scan_number(&mut self) -> (SyntaxKind, String) {
        let start = self.pos;
        let main_fragment = self.scan_number_fragment();

        let mut decimal_fragment = String::new();
        if let Some(after_dot) = self.peek_equal(0, '.') {
            self.token_flags.insert(TokenFlags::DECIMAL);
            self.pos = after_dot;
            decimal_fragment = self.scan_number_fragment();
        }

        let mut end = self.pos;
        let mut scientific_fragment = String::new();
        if let Some(after_e) = self.peek_check(0, |c| c == 'e' || c == 'E') {
            self.pos = after_e;
            self.token_flags.insert(TokenFlags::SCIENTIFIC);
            if let Some(after_sign) = self.peek_check(0, |c| c == '+' || c == '-') {
                self.pos = after_sign;
            }

            let pre_numeric = self.pos;
            let final_fragment = self.scan_number_fragment();
            if final_fragment.is_empty() {
                self.error(M_DIGIT_EXPECTED);
            } else {
                scientific_fragment = format!("{}{}", &self.text[end..pre_numeric], final_fragment);
                end = self.pos;
            }
        }

        let result = if self.token_flags.contains(TokenFlags::CONTAINS_SEPARATOR) {
            let mut value = main_fragment;
            if !decimal_fragment.is_empty() {
                value.push('.');
                value.push_str(&decimal_fragment);
            }
            value.push_str(&scientific_fragment);
            value
        } else {
            // No separators removed, so the raw slice is already the value.
            self.text[start..end].to_string()
        };

        self.token_value = result.clone();
        self.check_for_identifier_after_numeric_literal();
        (SyntaxKind::NumberLiteral, result)
    }

    fn check_for_identifier_after_numeric_literal(&mut self) {
        let Some(ch) = self.char_at(self.pos) else {
            return;
        };
        if !is_identifier_start(ch) {
            return;
        }

        let identifier_start = self.pos;
        let length = self.scan_identifier_parts().len();
        self.error_at(M_IDENTIFIER_AFTER_NUMERIC_LITERAL, identifier_start, length);
        self.pos = identifier_start;
    }

    /// Scan hex digits: exactly `count` when `scan_as_many_as_possible` is
    /// false, at least `count` otherwise. Returns the collected digits
    /// (lowercased), or an empty string when too few were available.
    fn scan_hex_digits(
        &mut self,
        count: usize,
        scan_as_many_as_possible: bool,
        can_have_separators: bool,
    ) -> String {
        let mut digits = String::new();
        let mut allow_separator = false;
        let mut previous_was_separator = false;
        let mut separator_start = 0;

        while digits.len() < count || scan_as_many_as_possible {
            let Some(ch) = self.char_at(self.pos) else {
                break;
            };
            if can_have_separators && ch == '_' {
                self.token_flags.insert(TokenFlags::CONTAINS_SEPARATOR);
                if allow_separator {
                    allow_separator = false;
                    previous_was_separator = true;
                } else if previous_was_separator {
                    self.error_at(M_MULTIPLE_CONSECUTIVE_NUMERIC_SEPARATORS, self.pos, 1);
                } else {
                    self.error_at(M_NUMERIC_SEPARATOR_NOT_ALLOWED, self.pos, 1);
                }
                separator_start = self.pos;
                self.pos += 1;
                continue;
            }
            allow_separator = can_have_separators;
            if !ch.is_ascii_hexdigit() {
                break;
            }
            digits.push(ch.to_ascii_lowercase());
            self.pos += 1;
            previous_was_separator = false;
        }

        if digits.len() < count {
            digits.clear();
        }
        if previous_was_separator {
            self.error_at(M_NUMERIC_SEPARATOR_NOT_ALLOWED, separator_start, 1);
        }
        digits
    }

    /// Exactly `count` hex digits as a code unit value, or `None`.
    fn scan_exact_hex_digits(&mut self, count: usize, can_have_separators: bool) -> Option<u32> {
        let digits = self.scan_hex_digits(count, false, can_have_separators);
        if digits.is_empty() {
            return None;
        }
        u32::from_str_radix(&digits, 16).ok()
    }

    fn scan_string(&mut self) -> String {
        let quote = match self.char_at(self.pos) {
            Some(ch) => ch,
            None => return String::new(),
        };
        self.pos += quote.len_utf8();

        let mut contents = String::new();
        let mut start = self.pos;
        loop {
            let Some(ch) = self.char_at(self.pos) else {
                contents.push_str(&self.text[start..self.pos]);
                self.error(M_UNEXPECTED_END_OF_TEXT);
                break;
            };
            if ch == quote {
                contents.push_str(&self.text[start..self.pos]);
                self.pos += ch.len_utf8();
                break;
            }
            if ch == '\\' {
                contents.push_str(&self.text[start..self.pos]);
                let escaped = self.scan_escape_sequence();
                contents.push_str(&escaped);
                start = self.pos;
                continue;
            }
            if is_line_break(ch) {
                contents.push_str(&self.text[start..self.pos]);
                self.error(M_UNTERMINATED_STRING_LITERAL);
                break;
            }
            self.pos += ch.len_utf8();
        }
        contents
    }

    fn scan_escape_sequence(&mut self) -> String {
        self.pos += 1; // backslash
        let Some(ch) = self.char_at(self.pos) else {
            self.error(M_UNEXPECTED_END_OF_TEXT);
            return String::new();
        };
        self.pos += ch.len_utf8();
        match ch {
            '0' => "\0".to_string(),
            'b' => "\u{0008}".to_string(),
            't' => "\t".to_string(),
            'n' => "\n".to_string(),
            'v' => "\u{000B}".to_string(),
            'f' => "\u{000C}".to_string(),
            'r' => "\r".to_string(),
            '\'' => "'".to_string(),
            '"' => "\"".to_string(),
            'u' => {
                self.token_flags.insert(TokenFlags::UNICODE_ESCAPE);
                self.scan_hexadecimal_escape(4)
            }
            'x' => self.scan_hexadecimal_escape(2),
            '\r' => {
                // Line continuation; swallow a following `\n` as well.
                if let Some(after) = self.peek_equal(0, '\n') {
                    self.pos = after;
                }
                String::new()
            }
            '\n' | '\u{2028}' | '\u{2029}' => String::new(),
            other => other.to_string(),
        }
    }

    fn scan_hexadecimal_escape(&mut self, num_digits: usize) -> String {
        match self.scan_exact_hex_digits(num_digits, false) {
            // Unpaired surrogates cannot be materialized; substitute U+FFFD.
            Some(value) => char::from_u32(value).unwrap_or('\u{FFFD}').to_string(),
            None => {
                self.error(M_HEX_DIGIT_EXPECTED);
                String::new()
            }
        }
    }

    /// At a backslash: code point of a valid `\uXXXX` escape without moving
    /// the cursor.
    fn peek_unicode_escape(&mut self) -> Option<char> {
        if self.pos + 5 >= self.end {
            return None;
        }
        self.peek_equal(1, 'u')?;
        let start = self.pos;
        self.pos += 2; // backslash + 'u'
        let value = self.scan_exact_hex_digits(4, true);
        self.pos = start;
        value.and_then(char::from_u32)
    }

    fn scan_identifier_parts(&mut self) -> String {
        let mut result = String::new();
        let mut start = self.pos;
        while let Some(ch) = self.char_at(self.pos) {
            if is_identifier_part(ch) {
                self.pos += ch.len_utf8();
            } else if ch == '\\' {
                let Some(escaped) = self.peek_unicode_escape() else {
                    break;
                };
                if !is_identifier_part(escaped) {
                    break;
                }
                self.token_flags.insert(TokenFlags::UNICODE_ESCAPE);
                result.push_str(&self.text[start..self.pos]);
                result.push(escaped);
                // A valid unicode escape is always six characters.
                self.pos += 6;
                start = self.pos;
            } else {
                break;
            }
        }
        result.push_str(&self.text[start..self.pos]);
        result
    }

    fn identifier_token(&mut self) -> SyntaxKind {
        self.token = SyntaxKind::keyword_from_str(&self.token_value).unwrap_or(SyntaxKind::Identifier);
        self.token
    }

    pub fn scan(&mut self) -> SyntaxKind {
        self.start_pos = self.pos;
        self.token_flags = TokenFlags::NONE;
        loop {
            self.token_pos = self.pos;
            let Some(ch) = self.char_at(self.pos) else {
                self.token = SyntaxKind::EndOfFile;
                return self.token;
            };

            match ch {
                '\n' | '\r' => {
                    self.token_flags.insert(TokenFlags::PRECEDING_LINE_BREAK);
                    self.pos += 1;
                    continue;
                }
                '\t' | '\u{000B}' | '\u{000C}' | ' ' => {
                    self.pos += 1;
                    continue;
                }
                '!' => {
                    if let Some(after) = self.peek_equal(1, '=') {
                        if let Some(after) = self.peek_equal(2, '=') {
                            self.pos = after;
                            return self.set_token(SyntaxKind::ExclamationEqualsEquals);
                        }
                        self.pos = after;
                        return self.set_token(SyntaxKind::ExclamationEquals);
                    }
                    if let Some(after) = self.peek_equal(1, '!') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::ExclamationExclamation);
                    }
                    if let Some(after) = self.peek_equal(1, '.') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::ExclamationDot);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Exclamation);
                }
                '"' | '\'' => {
                    self.token_value = self.scan_string();
                    return self.set_token(SyntaxKind::StringLiteral);
                }
                '&' => {
                    if let Some(after) = self.peek_equal(1, '&') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::AmpersandAmpersand);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Ampersand);
                }
                '(' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::OpenParen);
                }
                ')' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::CloseParen);
                }
                '%' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Percent);
                }
                '*' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Asterisk);
                }
                '+' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Plus);
                }
                ',' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Comma);
                }
                '-' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Minus);
                }
                '.' => {
                    if self.peek_check(1, is_digit).is_some() {
                        let (token, _) = self.scan_number();
                        return self.set_token(token);
                    }
                    if self.peek_equal(1, '.').is_some() {
                        if let Some(after) = self.peek_equal(2, '.') {
                            self.pos = after;
                            return self.set_token(SyntaxKind::DotDotDot);
                        }
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Dot);
                }
                '/' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Slash);
                }
                '0' => {
                    if let Some(after_x) = self.peek_check(1, |c| c == 'x' || c == 'X') {
                        self.pos = after_x;
                        let digits = self.scan_hex_digits(1, true, false);
                        if digits.is_empty() {
                            self.error(M_HEX_DIGIT_EXPECTED);
                            self.token_value = "0x0".to_string();
                        } else {
                            self.token_value = format!("0x{digits}");
                        }
                        self.token_flags.insert(TokenFlags::HEX_SPECIFIER);
                        return self.set_token(SyntaxKind::NumberLiteral);
                    }
                    // Permissive decimal scan for 08… / 09… style literals.
                    let (token, _) = self.scan_number();
                    return self.set_token(token);
                }
                '1'..='9' => {
                    let (token, _) = self.scan_number();
                    return self.set_token(token);
                }
                ':' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Colon);
                }
                '<' => {
                    if let Some(after) = self.peek_equal(1, '=') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::LessThanEquals);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::LessThan);
                }
                '=' => {
                    if let Some(after) = self.peek_equal(1, '=') {
                        if let Some(after) = self.peek_equal(2, '=') {
                            self.pos = after;
                            return self.set_token(SyntaxKind::EqualsEqualsEquals);
                        }
                        self.pos = after;
                        return self.set_token(SyntaxKind::EqualsEquals);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Equals);
                }
                '>' => {
                    if let Some(after) = self.peek_equal(1, '=') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::GreaterThanEquals);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::GreaterThan);
                }
                '?' => {
                    if let Some(after) = self.peek_equal(1, '?') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::QuestionQuestion);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Question);
                }
                '[' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::OpenBracket);
                }
                ']' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::CloseBracket);
                }
                '^' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Caret);
                }
                '|' => {
                    if let Some(after) = self.peek_equal(1, '|') {
                        self.pos = after;
                        return self.set_token(SyntaxKind::BarBar);
                    }
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Bar);
                }
                '~' => {
                    self.pos += 1;
                    return self.set_token(SyntaxKind::Tilde);
                }
                _ => {
                    if is_identifier_start(ch) {
                        self.pos += ch.len_utf8();
                        while let Some(after) = self.peek_check(0, is_identifier_part) {
                            self.pos = after;
                        }
                        self.token_value = self.text[self.token_pos..self.pos].to_string();
                        if self.peek_equal(0, '\\').is_some() {
                            let rest = self.scan_identifier_parts();
                            self.token_value.push_str(&rest);
                        }
                        return self.identifier_token();
                    }
                    if is_whitespace(ch) {
                        self.pos += ch.len_utf8();
                        continue;
                    }
                    if is_line_break(ch) {
                        self.token_flags.insert(TokenFlags::PRECEDING_LINE_BREAK);
                        self.pos += ch.len_utf8();
                        continue;
                    }
                    self.error(M_INVALID_CHARACTER);
                    self.pos += ch.len_utf8();
                    return self.set_token(SyntaxKind::Unknown);
                }
            }
        }
    }

    fn set_token(&mut self, token: SyntaxKind) -> SyntaxKind {
        self.token = token;
        token
    }
}
