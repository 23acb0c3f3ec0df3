use formula_expr::diagnostics::{position_of_offset, Position};
use formula_expr::{format_diagnostic, parse, Expr};
use pretty_assertions::assert_eq;

#[test]
fn parse_never_fails_and_always_returns_diagnostics() {
    for text in [
        "",
        "+",
        "(((",
        ")))",
        "1 +",
        "'unterminated",
        "a..b",
        "f(,)",
        "[1,,2]",
        "0x",
        "1__2",
        "#$%&",
        "\u{0}\u{1}\u{2}",
    ] {
        let source = parse(text);
        assert!(
            !source.diagnostics.is_empty(),
            "expected diagnostics for {text:?}"
        );
    }
}

#[test]
fn clean_formulas_have_no_diagnostics() {
    for text in [
        "a.b.c(1, 'x', [true, null])",
        "-1.5e3 % 7",
        "$a = 1, $a ?? 2",
        "a!.b !== c ? 'x' : 'y'",
        "typeof this.kind",
    ] {
        let source = parse(text);
        assert_eq!(source.diagnostics, vec![], "for {text:?}");
    }
}

#[test]
fn stable_diagnostic_codes() {
    let cases = [
        ("'abc\n'", 1002),
        ("a.", 1003),
        ("(1", 1005),
        ("f(a,)", 1009),
        ("", 1109),
        ("1e", 1124),
        ("0x", 1125),
        ("'abc", 1126),
        ("a # b", 1127),
        ("1__2", 1301),
        ("12_", 1302),
        ("3px", 1302),
    ];
    for (text, code) in cases {
        let source = parse(text);
        assert!(
            source.diagnostics.iter().any(|d| d.code == code),
            "expected code {code} for {text:?}, got {:?}",
            source.diagnostics
        );
    }
}

#[test]
fn diagnostic_format_is_stable() {
    let source = parse("1 +");
    let first = &source.diagnostics[0];
    assert_eq!(
        format_diagnostic(&source, first),
        "pos(0,3) error(1109) expression expected"
    );
}

#[test]
fn diagnostic_positions_are_zero_based_lines_and_byte_columns() {
    let source = parse("[1,\n2,]");
    assert_eq!(source.diagnostics.len(), 1);
    let diagnostic = &source.diagnostics[0];
    assert_eq!(diagnostic.code, 1009);
    let position = position_of_offset(source.line_starts(), diagnostic.start);
    assert_eq!(position, Position { line: 1, column: 2 });
}

#[test]
fn expected_token_messages_name_the_token() {
    let source = parse("(1");
    assert_eq!(source.diagnostics[0].text, ") expected");

    let source = parse("a ? b");
    assert_eq!(source.diagnostics[0].text, ": expected");
}

#[test]
fn recovery_keeps_parsing_after_bad_arguments() {
    // The stray `)` in the array is reported and skipped; the rest of the
    // formula still parses into a call with two arguments.
    let source = parse("f([1, ) ], 2)");
    assert!(source.diagnostics.iter().any(|d| d.code == 1137));
    let Expr::Call(call) = &source.expr else {
        panic!("expected call root, got {:?}", source.expr);
    };
    assert_eq!(call.args.len(), 2);
}

#[test]
fn dot_before_line_break_reports_at_the_dot() {
    let source = parse("name.\nfoo bar");
    let identifier_expected = source
        .diagnostics
        .iter()
        .find(|d| d.code == 1003)
        .expect("identifier expected diagnostic");
    // Reported right after the dot, not at the next token.
    assert_eq!(identifier_expected.start, 5);
}

#[test]
fn errors_accumulate_across_the_whole_input() {
    let source = parse("f(a,) + 1e + 'x");
    let codes: Vec<u32> = source.diagnostics.iter().map(|d| d.code).collect();
    assert!(codes.contains(&1009));
    assert!(codes.contains(&1124));
    assert!(codes.contains(&1126));
}
