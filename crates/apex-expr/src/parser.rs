// apex-expr/src/parser.rs
// ============================================================================
// Module: Parser
// Description: Recursive-descent parser building an `Ast` from a token
//              stream, by precedence (elvis > ternary > || > && > equality >
//              relational/instanceof > additive > multiplicative > unary >
//              postfix > primary).
// Purpose: Turn source text into the typed tree the compiler/evaluator walk.
// Dependencies: crate::{ast, error, lexer}
// ============================================================================

use bigdecimal::BigDecimal;
use smallvec::SmallVec;
use smallvec::smallvec;

use crate::ast::Ast;
use crate::ast::BinaryOp;
use crate::error::EvalError;
use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::lexer::lex;

/// Parses `source` into an `Ast`.
///
/// # Errors
/// Returns `EvalError::ParseError` for any syntactically invalid input,
/// including trailing tokens after a complete expression.
pub fn parse(source: &str) -> Result<Ast, EvalError> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_elvis()?;
    parser.expect_eof()?;
    Ok(ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn expect_eof(&self) -> Result<(), EvalError> {
        if *self.peek() == TokenKind::Eof {
            Ok(())
        } else {
            Err(EvalError::ParseError {
                position: self.position(),
                message: format!("unexpected trailing token {:?}", self.peek()),
            })
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<(), EvalError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(EvalError::ParseError {
                position: self.position(),
                message: format!("expected {expected:?}, found {:?}", self.peek()),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, EvalError> {
        match self.advance() {
            TokenKind::Ident(name) => Ok(name),
            other => Err(EvalError::ParseError {
                position: self.position(),
                message: format!("expected identifier, found {other:?}"),
            }),
        }
    }

    fn parse_elvis(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_ternary()?;
        while *self.peek() == TokenKind::Elvis {
            self.advance();
            let right = self.parse_ternary()?;
            left = Ast::Elvis { left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_ternary(&mut self) -> Result<Ast, EvalError> {
        let cond = self.parse_or()?;
        if *self.peek() == TokenKind::Question {
            self.advance();
            let then_branch = self.parse_elvis()?;
            self.expect(&TokenKind::Colon)?;
            let else_branch = self.parse_elvis()?;
            Ok(Ast::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_and()?;
        while *self.peek() == TokenKind::OrOr {
            self.advance();
            let right = self.parse_and()?;
            left = Ast::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_equality()?;
        while *self.peek() == TokenKind::AndAnd {
            self.advance();
            let right = self.parse_equality()?;
            left = Ast::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Ast, EvalError> {
        let left = self.parse_additive()?;
        if *self.peek() == TokenKind::Instanceof {
            self.advance();
            let target_marker = self.expect_ident()?;
            if target_marker != "T" {
                return Err(EvalError::ParseError {
                    position: self.position(),
                    message: "expected 'T(TypeName)' after instanceof".to_string(),
                });
            }
            self.expect(&TokenKind::LParen)?;
            let type_name = self.expect_ident()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Ast::InstanceOf { target: Box::new(left), type_name });
        }

        let mut left = left;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Ast, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Ast, EvalError> {
        match self.peek() {
            TokenKind::Bang => {
                self.advance();
                Ok(Ast::Not(Box::new(self.parse_unary()?)))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(Ast::Neg(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Ast, EvalError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_ident()?;
                    if *self.peek() == TokenKind::LParen {
                        self.advance();
                        let args = self.parse_call_args()?;
                        node = Ast::MethodCall { target: Box::new(node), name: field, args, safe: false };
                    } else {
                        node = Ast::Member { target: Box::new(node), field, safe: false };
                    }
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    if *self.peek() == TokenKind::LBracket {
                        self.advance();
                        let index = self.parse_elvis()?;
                        self.expect(&TokenKind::RBracket)?;
                        node = Ast::Index { target: Box::new(node), index: Box::new(index), safe: true };
                    } else {
                        let field = self.expect_ident()?;
                        if *self.peek() == TokenKind::LParen {
                            self.advance();
                            let args = self.parse_call_args()?;
                            node = Ast::MethodCall { target: Box::new(node), name: field, args, safe: true };
                        } else {
                            node = Ast::Member { target: Box::new(node), field, safe: true };
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::Index { target: Box::new(node), index: Box::new(index), safe: false };
                }
                TokenKind::QuestionLBracket => {
                    self.advance();
                    self.expect(&TokenKind::LBracket)?;
                    let index = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::Index { target: Box::new(node), index: Box::new(index), safe: true };
                }
                TokenKind::DotBang => {
                    self.advance();
                    self.expect(&TokenKind::LBracket)?;
                    let body = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::Project { target: Box::new(node), body: Box::new(body) };
                }
                TokenKind::DotQuestion => {
                    self.advance();
                    self.expect(&TokenKind::LBracket)?;
                    let body = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::Select { target: Box::new(node), body: Box::new(body) };
                }
                TokenKind::DotCaret => {
                    self.advance();
                    self.expect(&TokenKind::LBracket)?;
                    let body = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::First { target: Box::new(node), body: Box::new(body) };
                }
                TokenKind::DotDollar => {
                    self.advance();
                    self.expect(&TokenKind::LBracket)?;
                    let body = self.parse_elvis()?;
                    self.expect(&TokenKind::RBracket)?;
                    node = Ast::Last { target: Box::new(node), body: Box::new(body) };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Ast, EvalError> {
        match self.advance() {
            TokenKind::Null => Ok(Ast::Null),
            TokenKind::True => Ok(Ast::Bool(true)),
            TokenKind::False => Ok(Ast::Bool(false)),
            TokenKind::Int(n) => Ok(Ast::Int(n)),
            TokenKind::Decimal(text) => {
                let parsed: BigDecimal = text.parse().map_err(|_| EvalError::ParseError {
                    position: self.position(),
                    message: format!("invalid decimal literal '{text}'"),
                })?;
                Ok(Ast::Decimal(parsed))
            }
            TokenKind::Str(s) => Ok(Ast::Str(s)),
            TokenKind::Variable(name) => Ok(Ast::Variable(name)),
            TokenKind::This => Ok(Ast::This),
            TokenKind::Ident(name) => {
                if *self.peek() == TokenKind::LParen {
                    self.advance();
                    let args = self.parse_call_args()?;
                    Ok(Ast::Call { name, args })
                } else {
                    Ok(Ast::RootField(name))
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_elvis()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(EvalError::ParseError {
                position: self.position(),
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn parse_call_args(&mut self) -> Result<SmallVec<[Ast; 4]>, EvalError> {
        let mut args: SmallVec<[Ast; 4]> = smallvec![];
        if *self.peek() == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_elvis()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(EvalError::ParseError {
                        position: self.position(),
                        message: format!("expected ',' or ')', found {other:?}"),
                    });
                }
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_member_chain_and_comparison() {
        let ast = parse("trade.otcTrade.otcLeg[0]?.stbRuleName != null").expect("parse");
        assert!(matches!(ast, Ast::Binary { op: BinaryOp::NotEq, .. }));
    }

    #[test]
    fn parses_function_call_with_args() {
        let ast = parse("coalesce(#a, #b, 0)").expect("parse");
        match ast {
            Ast::Call { name, args } => {
                assert_eq!(name, "coalesce");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parses_projection_and_selection() {
        let ast = parse("items.?[#this.active].![#this.price]").expect("parse");
        assert!(matches!(ast, Ast::Project { .. }));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse("1 + 1 2").is_err());
    }

    #[test]
    fn parses_instanceof() {
        let ast = parse("x instanceof T(String)").expect("parse");
        assert!(matches!(ast, Ast::InstanceOf { .. }));
    }
}
