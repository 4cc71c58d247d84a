use crate::{Scanner, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(source);
    let mut out = Vec::new();
    loop {
        let token = scanner.scan_token();
        let done = token.kind == TokenKind::Eof;
        out.push(token.kind);
        if done {
            break;
        }
    }
    out
}

#[test]
fn scans_arithmetic_expression() {
    use TokenKind::{Eof, Number, Plus, Semicolon, Star};
    assert_eq!(kinds("1 + 2 * 3;"), vec![Number, Plus, Number, Star, Number, Semicolon, Eof]);
}

#[test]
fn distinguishes_keywords_from_identifiers() {
    use TokenKind::{Class, For, Fun, Identifier, True};
    assert_eq!(kinds("class fun for true"), vec![Class, Fun, For, True, TokenKind::Eof]);
    assert_eq!(kinds("classy funny foreach truely"), vec![
        Identifier,
        Identifier,
        Identifier,
        Identifier,
        TokenKind::Eof
    ]);
}

#[test]
fn two_char_operators_are_greedy() {
    use TokenKind::{BangEqual, EqualEqual, GreaterEqual, LessEqual};
    assert_eq!(kinds("!= == <= >="), vec![
        BangEqual,
        EqualEqual,
        LessEqual,
        GreaterEqual,
        TokenKind::Eof
    ]);
}

#[test]
fn unterminated_string_is_an_error_token() {
    let mut scanner = Scanner::new("\"abc");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Unterminated string.");
}

#[test]
fn string_spanning_multiple_lines_tracks_line_number() {
    let mut scanner = Scanner::new("\"a\nb\"\nvar");
    let string_tok = scanner.scan_token();
    assert_eq!(string_tok.kind, TokenKind::String);
    let var_tok = scanner.scan_token();
    assert_eq!(var_tok.line, 3);
}

#[test]
fn line_comment_consumes_to_end_of_line() {
    use TokenKind::{Eof, Number};
    assert_eq!(kinds("1 // a comment\n2"), vec![Number, Number, Eof]);
}

#[test]
fn eof_repeats_after_end_of_source() {
    let mut scanner = Scanner::new("");
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
}
