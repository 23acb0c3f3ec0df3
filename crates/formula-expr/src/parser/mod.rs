//! Recursive-descent parser.
//!
//! Every production either consumes tokens and returns a real node, or emits
//! a diagnostic and returns a placeholder so parsing can continue. The entry
//! point is total: any input produces a [`SourceCode`], never a panic.

pub mod scanner;
pub mod unicode;

use crate::ast::{
    ArrayLit, BinaryExpr, CallExpr, ConditionalExpr, Expr, Identifier, Literal, NodeList,
    ParenExpr, PrefixExpr, SelectorExpr, SourceCode, Span, SyntaxKind, TypeofExpr,
};
use crate::diagnostics::{
    Diagnostic, DiagnosticMessage, M_0_EXPECTED, M_ARGUMENT_EXPRESSION_EXPECTED,
    M_EXPRESSION_EXPECTED, M_EXPRESSION_OR_COMMA_EXPECTED, M_IDENTIFIER_EXPECTED,
    M_TRAILING_COMMA_NOT_ALLOWED,
};

use scanner::{Scanner, ScannerState};

/// Parse a formula into an AST plus its accumulated diagnostics.
pub fn parse(text: &str) -> SourceCode {
    let mut parser = Parser::new(text);
    parser.next_token();
    let expr = parser.parse_expression();

    // Anything left over is an error, reported once; the rest of the input
    // is consumed without further noise.
    if parser.token() != SyntaxKind::EndOfFile {
        parser.error_at_current_token(M_0_EXPECTED, &[","]);
        while parser.token() != SyntaxKind::EndOfFile {
            parser.next_token();
        }
    }

    SourceCode::new(text.to_string(), expr, parser.diagnostics)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListContext {
    ArgumentExpressions,
    ArrayLiteralMembers,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            diagnostics: Vec::new(),
        }
    }

    fn token(&self) -> SyntaxKind {
        self.scanner.token()
    }

    fn next_token(&mut self) -> SyntaxKind {
        let token = self.scanner.scan();
        for err in self.scanner.take_errors() {
            self.error_at_position(err.pos, err.length, err.message, &[]);
        }
        token
    }

    /// Node positions include the whitespace that preceded the first token,
    /// and node ends stop at the last token's text.
    fn node_pos(&self) -> usize {
        self.scanner.start_pos()
    }

    fn finish_span(&self, pos: usize) -> Span {
        Span::new(pos, self.scanner.start_pos())
    }

    fn token_span(&self) -> Span {
        Span::new(self.scanner.token_pos(), self.scanner.text_pos())
    }

    fn error_at_position(
        &mut self,
        start: usize,
        length: usize,
        message: &'static DiagnosticMessage,
        args: &[&str],
    ) {
        // Consecutive errors at one position are noise; keep the first.
        if let Some(last) = self.diagnostics.last() {
            if last.start == start {
                return;
            }
        }
        self.diagnostics
            .push(Diagnostic::with_args(message, start, length, args));
    }

    fn error_at_current_token(&mut self, message: &'static DiagnosticMessage, args: &[&str]) {
        let start = self.scanner.token_pos();
        let length = self.scanner.text_pos() - start;
        self.error_at_position(start, length, message, args);
    }

    fn speculate<T>(
        &mut self,
        is_lookahead: bool,
        callback: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        let state: ScannerState = self.scanner.snapshot();
        let diagnostics_len = self.diagnostics.len();
        let result = callback(self);
        if result.is_none() || is_lookahead {
            self.scanner.restore(state);
            self.diagnostics.truncate(diagnostics_len);
        }
        result
    }

    /// Run `callback` and unconditionally rewind.
    fn look_ahead<T>(&mut self, callback: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.speculate(true, callback)
    }

    fn parse_expected(&mut self, kind: SyntaxKind) -> bool {
        if self.token() == kind {
            self.next_token();
            return true;
        }
        self.error_at_current_token(M_0_EXPECTED, &[kind.text()]);
        false
    }

    fn got(&mut self, kind: SyntaxKind) -> bool {
        if self.token() == kind {
            self.next_token();
            return true;
        }
        false
    }

    /// Consume the token and return its exact source span when it matches.
    fn got_token(&mut self, kind: SyntaxKind) -> Option<Span> {
        if self.token() == kind {
            let span = self.token_span();
            self.next_token();
            return Some(span);
        }
        None
    }

    // IDENTIFIERS

    fn parse_identifier(&mut self, message: Option<&'static DiagnosticMessage>) -> Identifier {
        if self.token().is_identifier_or_keyword() {
            let pos = self.node_pos();
            let original_token = self.token();
            let value = self.scanner.token_value().to_string();
            self.next_token();
            return Identifier {
                value,
                original_token,
                span: self.finish_span(pos),
            };
        }

        self.error_at_current_token(message.unwrap_or(M_IDENTIFIER_EXPECTED), &[]);
        Identifier::missing(self.node_pos())
    }

    /// Keywords are valid names after `.`, except when a line break makes the
    /// name look like the start of the next construct; then the error points
    /// at the dot, where it reads best.
    fn parse_right_side_of_dot(&mut self) -> Identifier {
        if self.scanner.has_preceding_line_break() && self.token().is_identifier_or_keyword() {
            let matches_pattern = self
                .look_ahead(|p| {
                    p.next_token();
                    let on_same_line = p.token().is_identifier_or_keyword()
                        && !p.scanner.has_preceding_line_break();
                    on_same_line.then_some(())
                })
                .is_some();
            if matches_pattern {
                let pos = self.node_pos();
                self.error_at_position(pos, 0, M_IDENTIFIER_EXPECTED, &[]);
                return Identifier::missing(pos);
            }
        }

        self.parse_identifier(None)
    }

    // EXPRESSIONS

    fn is_start_of_left_hand_side_expression(&self) -> bool {
        matches!(
            self.token(),
            SyntaxKind::NumberLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::OpenParen
                | SyntaxKind::OpenBracket
                | SyntaxKind::Identifier
        ) || self.token().is_keyword()
    }

    fn is_start_of_expression(&self) -> bool {
        if self.is_start_of_left_hand_side_expression() {
            return true;
        }
        match self.token() {
            SyntaxKind::Plus
            | SyntaxKind::Minus
            | SyntaxKind::Tilde
            | SyntaxKind::Exclamation
            | SyntaxKind::ExclamationExclamation
            | SyntaxKind::LessThan => true,
            // Error tolerance: a stray binary operator still means an
            // expression was intended; a missing-operand diagnostic reads
            // better than skipping the token.
            token => binary_operator_precedence(token).is_some(),
        }
    }

    fn parse_expression(&mut self) -> Expr {
        let mut expr = self.parse_assignment_expression_or_higher();
        // Comma sequencing lives only at this level; inside delimited lists
        // the comma is the separator.
        while let Some(op_span) = self.got_token(SyntaxKind::Comma) {
            let right = self.parse_assignment_expression_or_higher();
            expr = self.make_binary(expr, SyntaxKind::Comma, op_span, right);
        }
        expr
    }

    fn parse_assignment_expression_or_higher(&mut self) -> Expr {
        let expr = self.parse_binary_expression(0);
        if self.token().is_assignment_operator() {
            let op = self.token();
            let op_span = self.token_span();
            self.next_token();
            let right = self.parse_assignment_expression_or_higher();
            return self.make_binary(expr, op, op_span, right);
        }
        self.parse_conditional_expression_rest(expr)
    }

    fn parse_conditional_expression_rest(&mut self, condition: Expr) -> Expr {
        if self.got_token(SyntaxKind::Question).is_none() {
            return condition;
        }

        let pos = condition.span().pos;
        let when_true = self.parse_assignment_expression_or_higher();
        self.parse_expected(SyntaxKind::Colon);
        let when_false = self.parse_assignment_expression_or_higher();
        Expr::Conditional(Box::new(ConditionalExpr {
            condition,
            when_true,
            when_false,
            span: self.finish_span(pos),
        }))
    }

    fn parse_binary_expression(&mut self, precedence: u8) -> Expr {
        let left = self.parse_unary_expression();
        self.parse_binary_expression_rest(precedence, left)
    }

    fn parse_binary_expression_rest(&mut self, precedence: u8, mut left: Expr) -> Expr {
        loop {
            let Some(new_precedence) = binary_operator_precedence(self.token()) else {
                break;
            };
            // Left associative: only bind tighter operators to the right.
            if new_precedence <= precedence {
                break;
            }

            let op = self.token();
            let op_span = self.token_span();
            self.next_token();
            let right = self.parse_binary_expression(new_precedence);
            left = self.make_binary(left, op, op_span, right);
        }
        left
    }

    fn make_binary(&self, left: Expr, op: SyntaxKind, op_span: Span, right: Expr) -> Expr {
        let pos = left.span().pos;
        Expr::Binary(Box::new(BinaryExpr {
            left,
            op,
            op_span,
            right,
            span: self.finish_span(pos),
        }))
    }

    fn parse_unary_expression(&mut self) -> Expr {
        match self.token() {
            SyntaxKind::Plus
            | SyntaxKind::Minus
            | SyntaxKind::Tilde
            | SyntaxKind::Exclamation
            | SyntaxKind::ExclamationExclamation => {
                let pos = self.node_pos();
                let op = self.token();
                let op_span = self.token_span();
                self.next_token();
                let operand = self.parse_unary_expression();
                Expr::Prefix(Box::new(PrefixExpr {
                    op,
                    op_span,
                    operand,
                    span: self.finish_span(pos),
                }))
            }
            SyntaxKind::TypeofKeyword => {
                let pos = self.node_pos();
                self.next_token();
                let operand = self.parse_unary_expression();
                Expr::Typeof(Box::new(TypeofExpr {
                    operand,
                    span: self.finish_span(pos),
                }))
            }
            _ => self.parse_left_hand_side_expression_or_higher(),
        }
    }

    fn parse_left_hand_side_expression_or_higher(&mut self) -> Expr {
        let expr = self.parse_primary_expression();
        let expr = self.parse_member_expression_rest(expr);
        self.parse_call_expression_rest(expr)
    }

    /// `.name` / `!.name` chain. A preceding line break ends the chain.
    fn parse_member_expression_rest(&mut self, mut expr: Expr) -> Expr {
        loop {
            if self.scanner.has_preceding_line_break() {
                break;
            }

            let assert = match self.token() {
                SyntaxKind::Dot => false,
                SyntaxKind::ExclamationDot => true,
                _ => break,
            };
            self.next_token();

            let pos = expr.span().pos;
            let name = self.parse_right_side_of_dot();
            expr = Expr::Selector(Box::new(SelectorExpr {
                base: expr,
                name,
                assert,
                span: self.finish_span(pos),
            }));
        }
        expr
    }

    fn parse_call_expression_rest(&mut self, mut expr: Expr) -> Expr {
        loop {
            if self.scanner.has_preceding_line_break() {
                break;
            }

            expr = self.parse_member_expression_rest(expr);
            if self.token() == SyntaxKind::OpenParen {
                let pos = expr.span().pos;
                let (args, spread_last) = self.parse_argument_list();
                expr = Expr::Call(Box::new(CallExpr {
                    callee: expr,
                    args,
                    spread_last,
                    span: self.finish_span(pos),
                }));
                continue;
            }
            break;
        }
        expr
    }

    fn parse_argument_list(&mut self) -> (NodeList, bool) {
        self.parse_expected(SyntaxKind::OpenParen);
        let list = self.parse_delimited_list(ListContext::ArgumentExpressions, false);
        let spread_last = self.got(SyntaxKind::DotDotDot);
        self.parse_expected(SyntaxKind::CloseParen);
        (list, spread_last)
    }

    fn parse_primary_expression(&mut self) -> Expr {
        match self.token() {
            SyntaxKind::NumberLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::NullKeyword
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::ThisKeyword
            | SyntaxKind::CtxKeyword => {
                let pos = self.node_pos();
                let token = self.token();
                let value = self.scanner.token_value().to_string();
                self.next_token();
                Expr::Literal(Literal {
                    token,
                    value,
                    span: self.finish_span(pos),
                })
            }
            SyntaxKind::OpenParen => self.parse_parenthesized_expression(),
            SyntaxKind::OpenBracket => self.parse_array_literal_expression(),
            _ => Expr::Identifier(self.parse_identifier(Some(M_EXPRESSION_EXPECTED))),
        }
    }

    fn parse_parenthesized_expression(&mut self) -> Expr {
        let pos = self.node_pos();
        self.parse_expected(SyntaxKind::OpenParen);
        let inner = self.parse_expression();
        self.parse_expected(SyntaxKind::CloseParen);
        Expr::Paren(Box::new(ParenExpr {
            inner,
            span: self.finish_span(pos),
        }))
    }

    fn parse_array_literal_expression(&mut self) -> Expr {
        let pos = self.node_pos();
        self.parse_expected(SyntaxKind::OpenBracket);
        let elements = self.parse_delimited_list(ListContext::ArrayLiteralMembers, false);
        self.parse_expected(SyntaxKind::CloseBracket);
        Expr::Array(Box::new(ArrayLit {
            elements,
            span: self.finish_span(pos),
        }))
    }

    fn is_list_element(&self, context: ListContext) -> bool {
        match context {
            ListContext::ArgumentExpressions => self.is_start_of_expression(),
            ListContext::ArrayLiteralMembers => {
                self.token() == SyntaxKind::Comma || self.is_start_of_expression()
            }
        }
    }

    fn is_list_terminator(&self, context: ListContext) -> bool {
        if self.token() == SyntaxKind::EndOfFile {
            return true;
        }
        match context {
            ListContext::ArgumentExpressions => {
                // `...` terminates the element run so the spread marker can
                // be consumed by the argument-list production.
                matches!(
                    self.token(),
                    SyntaxKind::CloseParen | SyntaxKind::DotDotDot
                )
            }
            ListContext::ArrayLiteralMembers => self.token() == SyntaxKind::CloseBracket,
        }
    }

    fn list_context_error(context: ListContext) -> &'static DiagnosticMessage {
        match context {
            ListContext::ArgumentExpressions => M_ARGUMENT_EXPRESSION_EXPECTED,
            ListContext::ArrayLiteralMembers => M_EXPRESSION_OR_COMMA_EXPECTED,
        }
    }

    fn parse_delimited_list(&mut self, context: ListContext, allow_trailing_comma: bool) -> NodeList {
        let pos = self.node_pos();
        let mut nodes = Vec::new();
        let mut last_was_comma = false;

        loop {
            if self.is_list_element(context) {
                nodes.push(self.parse_assignment_expression_or_higher());
                last_was_comma = false;
                if self.got(SyntaxKind::Comma) {
                    last_was_comma = true;
                    continue;
                }
                if self.is_list_terminator(context) {
                    break;
                }
                // No comma and no terminator: demand a comma so the message
                // names the missing delimiter, then retry the element.
                self.parse_expected(SyntaxKind::Comma);
                continue;
            }

            if self.is_list_terminator(context) {
                break;
            }

            // Recovery: report, skip the offending token, retry.
            self.error_at_current_token(Self::list_context_error(context), &[]);
            self.next_token();
            last_was_comma = false;
        }

        if last_was_comma && !allow_trailing_comma {
            self.error_at_current_token(M_TRAILING_COMMA_NOT_ALLOWED, &[]);
        }

        NodeList {
            nodes,
            span: self.finish_span(pos),
        }
    }
}

/// Binary operator precedence; higher binds tighter. `None` stops binary
/// parsing.
fn binary_operator_precedence(token: SyntaxKind) -> Option<u8> {
    match token {
        SyntaxKind::BarBar | SyntaxKind::QuestionQuestion => Some(1),
        SyntaxKind::AmpersandAmpersand => Some(2),
        SyntaxKind::Bar => Some(3),
        SyntaxKind::Caret => Some(4),
        SyntaxKind::Ampersand => Some(5),
        SyntaxKind::EqualsEquals
        | SyntaxKind::EqualsEqualsEquals
        | SyntaxKind::ExclamationEquals
        | SyntaxKind::ExclamationEqualsEquals => Some(6),
        SyntaxKind::LessThan
        | SyntaxKind::GreaterThan
        | SyntaxKind::LessThanEquals
        | SyntaxKind::GreaterThanEquals => Some(7),
        SyntaxKind::Plus | SyntaxKind::Minus => Some(9),
        SyntaxKind::Asterisk | SyntaxKind::Slash | SyntaxKind::Percent => Some(10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> SourceCode {
        let source = parse(text);
        assert!(
            source.diagnostics.is_empty(),
            "unexpected diagnostics for {text:?}: {:?}",
            source.diagnostics
        );
        source
    }

    fn spans_contained(expr: &Expr, parent: Span, len: usize) {
        let span = expr.span();
        assert!(span.pos <= span.end && span.end <= len, "bad span {span:?}");
        assert!(parent.contains(span), "{span:?} outside {parent:?}");
        match expr {
            Expr::Prefix(n) => spans_contained(&n.operand, span, len),
            Expr::Binary(n) => {
                spans_contained(&n.left, span, len);
                spans_contained(&n.right, span, len);
            }
            Expr::Conditional(n) => {
                spans_contained(&n.condition, span, len);
                spans_contained(&n.when_true, span, len);
                spans_contained(&n.when_false, span, len);
            }
            Expr::Array(n) => {
                for element in n.elements.iter() {
                    spans_contained(element, span, len);
                }
            }
            Expr::Paren(n) => spans_contained(&n.inner, span, len),
            Expr::Selector(n) => spans_contained(&n.base, span, len),
            Expr::Call(n) => {
                spans_contained(&n.callee, span, len);
                for arg in n.args.iter() {
                    spans_contained(arg, span, len);
                }
            }
            Expr::Typeof(n) => spans_contained(&n.operand, span, len),
            Expr::Identifier(_) | Expr::Literal(_) => {}
        }
    }

    #[test]
    fn precedence_shapes_the_tree() {
        let source = parse_ok("1 + 2 * 3");
        let Expr::Binary(add) = &source.expr else {
            panic!("expected binary root");
        };
        assert_eq!(add.op, SyntaxKind::Plus);
        let Expr::Binary(mul) = &add.right else {
            panic!("expected * on the right");
        };
        assert_eq!(mul.op, SyntaxKind::Asterisk);
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let source = parse_ok("a + 1 < b * 2");
        let Expr::Binary(cmp) = &source.expr else {
            panic!();
        };
        assert_eq!(cmp.op, SyntaxKind::LessThan);
    }

    #[test]
    fn comma_sequencing_is_left_associative() {
        let source = parse_ok("$1 = 1, $2 = 2, $1 + $2");
        let Expr::Binary(outer) = &source.expr else {
            panic!();
        };
        assert_eq!(outer.op, SyntaxKind::Comma);
        let Expr::Binary(inner) = &outer.left else {
            panic!();
        };
        assert_eq!(inner.op, SyntaxKind::Comma);
    }

    #[test]
    fn conditional_parses_both_arms() {
        let source = parse_ok("a ? b : c ? d : e");
        let Expr::Conditional(cond) = &source.expr else {
            panic!();
        };
        // `?:` nests on the false arm through the assignment-or-higher climb.
        assert!(matches!(cond.when_false, Expr::Conditional(_)));
    }

    #[test]
    fn selector_chain_and_call() {
        let source = parse_ok("obj.fn(a, b.c)!.d");
        let Expr::Selector(sel) = &source.expr else {
            panic!();
        };
        assert!(sel.assert);
        assert_eq!(sel.name.value, "d");
        let Expr::Call(call) = &sel.base else {
            panic!();
        };
        assert_eq!(call.args.len(), 2);
        assert!(!call.spread_last);
    }

    #[test]
    fn keywords_are_valid_member_names() {
        let source = parse_ok("data.null.typeof");
        let Expr::Selector(sel) = &source.expr else {
            panic!();
        };
        assert_eq!(sel.name.value, "typeof");
    }

    #[test]
    fn spread_marker_on_last_argument() {
        let source = parse_ok("max(a, rest...)");
        let Expr::Call(call) = &source.expr else {
            panic!();
        };
        assert!(call.spread_last);
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn member_chain_breaks_at_newline() {
        let source = parse("a\n.b");
        // The chain ends at the line break, leaving `.b` as trailing input.
        assert!(!source.diagnostics.is_empty());
        assert!(matches!(source.expr, Expr::Identifier(_)));
    }

    #[test]
    fn trailing_comma_in_arguments_is_an_error() {
        let source = parse("f(a, b,)");
        assert_eq!(source.diagnostics.len(), 1);
        assert_eq!(source.diagnostics[0].code, 1009);
    }

    #[test]
    fn trailing_comma_in_array_is_an_error() {
        let source = parse("[1, 2,]");
        assert_eq!(source.diagnostics.len(), 1);
        assert_eq!(source.diagnostics[0].code, 1009);
    }

    #[test]
    fn missing_close_paren_reports_1005() {
        let source = parse("(1 + 2");
        assert!(source.diagnostics.iter().any(|d| d.code == 1005));
    }

    #[test]
    fn garbage_produces_placeholder_not_panic() {
        let source = parse("+");
        assert!(source.diagnostics.iter().any(|d| d.code == 1109));
        let Expr::Prefix(prefix) = &source.expr else {
            panic!();
        };
        let Expr::Identifier(placeholder) = &prefix.operand else {
            panic!();
        };
        assert!(placeholder.is_missing());
    }

    #[test]
    fn empty_input_reports_expression_expected() {
        let source = parse("");
        assert_eq!(source.diagnostics.len(), 1);
        assert_eq!(source.diagnostics[0].code, 1109);
    }

    #[test]
    fn every_span_is_contained_in_its_parent() {
        for text in [
            "(1 + 2) * 3",
            "person.age",
            "f(a, b, c...)",
            "[1, 'x', null]",
            "a ? b.c : -d",
            "typeof !x && y",
            "$v = 1, $v + 2",
        ] {
            let source = parse_ok(text);
            let len = text.len();
            spans_contained(&source.expr, Span::new(0, len), len);
        }
    }

    #[test]
    fn argument_list_rejects_interior_spread() {
        // `...` only marks the final argument; anywhere else ends the list.
        let source = parse("f(...xs, a)");
        assert!(!source.diagnostics.is_empty());
    }

    #[test]
    fn assignment_parses_right_associative() {
        let source = parse_ok("$a = $b = 1");
        let Expr::Binary(outer) = &source.expr else {
            panic!();
        };
        assert_eq!(outer.op, SyntaxKind::Equals);
        assert!(matches!(&outer.right, Expr::Binary(b) if b.op == SyntaxKind::Equals));
    }
}
