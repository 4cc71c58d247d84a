// SPDX-License-Identifier: GPL-3.0-or-later

//! The Pratt parse-rule table: one `{prefix, infix, precedence}` triple per
//! token kind, looked up by [`get_rule`]. `Parser::parse_precedence` (in
//! `lib.rs`) drives the climb; the functions here only emit bytecode for
//! their own syntactic form, calling back into `Parser`'s private methods
//! since this module is a descendant of the crate root.

use crate::Parser;
use vela_object::{OpCode, Value};
use vela_scanner::TokenKind;

/// Precedence levels, ascending binding power. `binary()` parses its right
/// operand at `self.next()` to keep `+`/`-`/`*`/`/` left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    pub(crate) const fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

pub type ParseFn = fn(&mut Parser, bool);

pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

const fn rule(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> ParseRule {
    ParseRule { prefix, infix, precedence }
}

/// Looks up the parse rule for `kind`. Token kinds with no expression role
/// (braces, keywords that start statements, `;`, `,`, `Eof`, `Error`, ...)
/// get the empty rule: no prefix parser, no infix parser, lowest precedence.
#[must_use]
pub fn get_rule(kind: TokenKind) -> ParseRule {
    match kind {
        TokenKind::LeftParen => rule(Some(grouping), Some(call), Precedence::Call),
        TokenKind::Dot => rule(None, Some(dot), Precedence::Call),
        TokenKind::Minus => rule(Some(unary), Some(binary), Precedence::Term),
        TokenKind::Plus => rule(None, Some(binary), Precedence::Term),
        TokenKind::Slash => rule(None, Some(binary), Precedence::Factor),
        TokenKind::Star => rule(None, Some(binary), Precedence::Factor),
        TokenKind::Bang => rule(Some(unary), None, Precedence::None),
        TokenKind::BangEqual | TokenKind::EqualEqual => rule(None, Some(binary), Precedence::Equality),
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            rule(None, Some(binary), Precedence::Comparison)
        }
        TokenKind::Identifier => rule(Some(variable), None, Precedence::None),
        TokenKind::String => rule(Some(string), None, Precedence::None),
        TokenKind::Number => rule(Some(number), None, Precedence::None),
        TokenKind::And => rule(None, Some(and_), Precedence::And),
        TokenKind::Or => rule(None, Some(or_), Precedence::Or),
        TokenKind::False | TokenKind::True | TokenKind::Nil => rule(Some(literal), None, Precedence::None),
        TokenKind::This => rule(Some(this), None, Precedence::None),
        TokenKind::Super => rule(Some(super_), None, Precedence::None),
        _ => rule(None, None, Precedence::None),
    }
}

fn number(parser: &mut Parser, _can_assign: bool) {
    let value: f64 =
        parser.previous.lexeme.parse().expect("scanner only emits well-formed numeric lexemes");
    parser.emit_constant(Value::Number(value));
}

/// Strips the surrounding quotes and interns the contents. No escape
/// processing: source bytes pass through verbatim per the scanner contract.
fn string(parser: &mut Parser, _can_assign: bool) {
    let lexeme = parser.previous.lexeme;
    let contents = &lexeme[1..lexeme.len() - 1];
    let interned = parser.heap.intern_str(contents);
    parser.emit_constant(Value::Object(interned));
}

fn literal(parser: &mut Parser, _can_assign: bool) {
    match parser.previous.kind {
        TokenKind::False => parser.emit_op(OpCode::False),
        TokenKind::True => parser.emit_op(OpCode::True),
        TokenKind::Nil => parser.emit_op(OpCode::Nil),
        _ => unreachable!("literal() invoked for a non-literal token"),
    }
}

fn grouping(parser: &mut Parser, _can_assign: bool) {
    parser.expression();
    parser.consume(TokenKind::RightParen, "Expect ')' after expression.");
}

fn unary(parser: &mut Parser, _can_assign: bool) {
    let operator_kind = parser.previous.kind;
    // Intentionally loose: the operand parses at `Assignment` precedence,
    // not `Unary`, so `-a = 1` and `!a()` parse the same generous way the
    // reference grammar does, rather than tightening the binding power.
    parser.parse_precedence(Precedence::Assignment);
    match operator_kind {
        TokenKind::Bang => parser.emit_op(OpCode::Not),
        TokenKind::Minus => parser.emit_op(OpCode::Negate),
        _ => unreachable!("unary() invoked for a non-unary token"),
    }
}

fn binary(parser: &mut Parser, _can_assign: bool) {
    let operator_kind = parser.previous.kind;
    let precedence = get_rule(operator_kind).precedence;
    parser.parse_precedence(precedence.next());
    match operator_kind {
        TokenKind::BangEqual => {
            parser.emit_op(OpCode::Equal);
            parser.emit_op(OpCode::Not);
        }
        TokenKind::EqualEqual => parser.emit_op(OpCode::Equal),
        TokenKind::Greater => parser.emit_op(OpCode::Greater),
        TokenKind::GreaterEqual => {
            parser.emit_op(OpCode::Less);
            parser.emit_op(OpCode::Not);
        }
        TokenKind::Less => parser.emit_op(OpCode::Less),
        TokenKind::LessEqual => {
            parser.emit_op(OpCode::Greater);
            parser.emit_op(OpCode::Not);
        }
        TokenKind::Plus => parser.emit_op(OpCode::Add),
        TokenKind::Minus => parser.emit_op(OpCode::Subtract),
        TokenKind::Star => parser.emit_op(OpCode::Multiply),
        TokenKind::Slash => parser.emit_op(OpCode::Divide),
        _ => unreachable!("binary() invoked for a non-binary token"),
    }
}

fn and_(parser: &mut Parser, _can_assign: bool) {
    let end_jump = parser.emit_jump(OpCode::JumpIfFalse);
    parser.emit_op(OpCode::Pop);
    parser.parse_precedence(Precedence::And);
    parser.patch_jump(end_jump);
}

fn or_(parser: &mut Parser, _can_assign: bool) {
    let else_jump = parser.emit_jump(OpCode::JumpIfFalse);
    let end_jump = parser.emit_jump(OpCode::Jump);
    parser.patch_jump(else_jump);
    parser.emit_op(OpCode::Pop);
    parser.parse_precedence(Precedence::Or);
    parser.patch_jump(end_jump);
}

fn call(parser: &mut Parser, _can_assign: bool) {
    let arg_count = parser.argument_list();
    parser.emit_bytes(OpCode::Call, arg_count);
}

/// `receiver.name` — plain property get/set, or, when immediately followed
/// by `(`, fused into a single `INVOKE` rather than `GET_PROPERTY` + `CALL`.
fn dot(parser: &mut Parser, can_assign: bool) {
    parser.consume(TokenKind::Identifier, "Expect property name after '.'.");
    let name = parser.previous.lexeme;
    let name_constant = parser.identifier_constant(name);

    if can_assign && parser.match_token(TokenKind::Equal) {
        parser.expression();
        parser.emit_bytes(OpCode::SetProperty, name_constant);
    } else if parser.match_token(TokenKind::LeftParen) {
        let arg_count = parser.argument_list();
        parser.emit_bytes(OpCode::Invoke, name_constant);
        parser.emit_byte(arg_count);
    } else {
        parser.emit_bytes(OpCode::GetProperty, name_constant);
    }
}

fn variable(parser: &mut Parser, can_assign: bool) {
    let name = parser.previous.lexeme;
    parser.named_variable(name, can_assign);
}

/// `this` resolves as an ordinary read of the reserved slot-0 local that
/// every method/initializer frame binds to the receiver.
fn this(parser: &mut Parser, _can_assign: bool) {
    if parser.classes.is_empty() {
        parser.error("Can't use 'this' outside of a class.");
        return;
    }
    variable(parser, false);
}

/// `super.name` / `super.name(args)` — resolves lexically to the enclosing
/// class's statically-known superclass, fusing the call form into a single
/// `SUPER_INVOKE` the same way `dot` fuses plain invocations.
fn super_(parser: &mut Parser, _can_assign: bool) {
    if parser.classes.is_empty() {
        parser.error("Can't use 'super' outside of a class.");
    } else if !parser.classes.last().expect("checked non-empty above").has_superclass {
        parser.error("Can't use 'super' in a class with no superclass.");
    }

    parser.consume(TokenKind::Dot, "Expect '.' after 'super'.");
    parser.consume(TokenKind::Identifier, "Expect superclass method name.");
    let name = parser.previous.lexeme;
    let name_constant = parser.identifier_constant(name);

    parser.named_variable("this", false);
    if parser.match_token(TokenKind::LeftParen) {
        let arg_count = parser.argument_list();
        parser.named_variable("super", false);
        parser.emit_bytes(OpCode::SuperInvoke, name_constant);
        parser.emit_byte(arg_count);
    } else {
        parser.named_variable("super", false);
        parser.emit_bytes(OpCode::GetSuper, name_constant);
    }
}
