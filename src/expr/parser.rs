//! Recursive-descent parser for derived-column expressions
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or         := and ( "or" and )*
//! and        := not ( "and" not )*
//! not        := "not" not | comparison
//! comparison := additive ( cmp_op additive )?
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/") unary )*
//! unary      := ("-" | "+") unary | primary
//! primary    := number | string | true | false | null
//!             | column | `quoted column` | function "(" args ")" | "(" or ")"
//! ```

use crate::model::Value;

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use super::error::ExpressionError;
use super::lexer::{tokenize, Spanned, Token};

/// Longest expression source accepted
pub const MAX_EXPRESSION_LEN: usize = 1000;

/// Deepest nesting of sub-expressions accepted
pub const MAX_DEPTH: usize = 64;

/// Parse an expression into a tree.
///
/// This checks syntax and the function whitelist only; column names are
/// resolved against a table by the caller.
pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    if source.chars().count() > MAX_EXPRESSION_LEN {
        return Err(ExpressionError::new(
            format!("expression is longer than {} characters", MAX_EXPRESSION_LEN),
            MAX_EXPRESSION_LEN,
        ));
    }

    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExpressionError::new("expression is empty", 0));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: source.len(),
    };
    let expr = parser.or()?;
    if let Some(extra) = parser.peek() {
        return Err(ExpressionError::new(
            format!("unexpected '{}'", extra.token),
            extra.pos,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    /// Offset reported for errors at end of input
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_token() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_pos(&self) -> usize {
        self.peek().map_or(self.end, |s| s.pos)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        if self.eat(expected) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map_or("end of expression".to_string(), |s| format!("'{}'", s.token));
            Err(ExpressionError::new(
                format!("expected '{}' but found {}", expected, found),
                self.current_pos(),
            ))
        }
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::new(
                format!("expression is nested deeper than {} levels", MAX_DEPTH),
                self.current_pos(),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            let right = self.not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Not) {
            self.enter()?;
            let operand = self.not()?;
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.additive()?;
        let Some(op) = self.peek_token().and_then(comparison_op) else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.additive()?;

        if self.peek_token().and_then(comparison_op).is_some() {
            return Err(ExpressionError::new(
                "chained comparisons are not supported; combine them with 'and'",
                self.current_pos(),
            ));
        }
        Ok(binary(op, left, right))
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek_token() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => None,
            _ => return self.primary(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.leave();

        Ok(match op {
            // Fold negative literals so `-5` stays a literal
            Some(UnaryOp::Neg) => match operand {
                Expr::Literal(Value::Int(i)) if i != i64::MIN => Expr::Literal(Value::Int(-i)),
                Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
                operand => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
            },
            _ => operand,
        })
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let Some(Spanned { token, pos }) = self.advance() else {
            return Err(ExpressionError::new("unexpected end of expression", self.end));
        };

        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::QuotedIdent(name) => Ok(Expr::Column(name)),
            Token::Ident(name) => {
                if self.peek_token() == Some(&Token::LParen) {
                    self.call(&name, pos)
                } else {
                    Ok(Expr::Column(name))
                }
            }
            Token::LParen => {
                self.enter()?;
                let inner = self.or()?;
                self.leave();
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(ExpressionError::new(format!("unexpected '{}'", other), pos)),
        }
    }

    fn call(&mut self, name: &str, pos: usize) -> Result<Expr, ExpressionError> {
        let function = Function::from_name(name).ok_or_else(|| {
            ExpressionError::new(format!("function '{}' is not allowed", name), pos)
        })?;
        self.expect(&Token::LParen)?;
        self.enter()?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.or()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen)?;
                break;
            }
        }
        self.leave();

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            let expected = match max {
                Some(max) if max == min => format!("{}", min),
                Some(max) => format!("{} to {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(ExpressionError::new(
                format!(
                    "{}() takes {} argument(s) but {} were given",
                    function.name(),
                    expected,
                    args.len()
                ),
                pos,
            ));
        }

        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn comparison_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::EqEq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::Ne),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Le => Some(BinaryOp::Le),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Ge => Some(BinaryOp::Ge),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Box<Expr> {
        Box::new(Expr::Column(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: col("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: col("b"),
                    right: Box::new(Expr::Literal(Value::Int(2))),
                }),
            }
        );
    }

    #[test]
    fn test_logical_binds_looser_than_comparison() {
        let expr = parse("a > 1 and not b == 2").unwrap();
        let Expr::Binary { op: BinaryOp::And, right, .. } = expr else {
            panic!("expected 'and' at the root");
        };
        assert!(matches!(*right, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_negative_literal_folded() {
        assert_eq!(parse("-5").unwrap(), Expr::Literal(Value::Int(-5)));
        assert!(matches!(parse("-x").unwrap(), Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_function_whitelist() {
        assert!(parse("round(price * 1.2, 2)").is_ok());
        let err = parse("__import__('os')").unwrap_err();
        assert_eq!(err.message, "function '__import__' is not allowed");
        assert!(parse("eval('1')").is_err());
    }

    #[test]
    fn test_function_arity() {
        let err = parse("sqrt(1, 2)").unwrap_err();
        assert!(err.message.contains("sqrt() takes 1 argument(s)"));
        assert!(parse("min()").is_err());
        assert!(parse("max(a, b, c)").is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("(a + b").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("1 < a < 3").is_err());
    }

    #[test]
    fn test_limits() {
        let long = "1+".repeat(MAX_EXPRESSION_LEN) + "1";
        assert!(parse(&long).is_err());
        let deep = "(".repeat(MAX_DEPTH + 1) + "1" + &")".repeat(MAX_DEPTH + 1);
        assert!(parse(&deep).is_err());
        let ok = "(".repeat(10) + "1" + &")".repeat(10);
        assert!(parse(&ok).is_ok());
        // The limit counts characters, not UTF-8 bytes
        let accented = format!("'{}'", "é".repeat(MAX_EXPRESSION_LEN - 2));
        assert!(accented.len() > MAX_EXPRESSION_LEN);
        assert!(parse(&accented).is_ok());
        let too_long = format!("'{}'", "é".repeat(MAX_EXPRESSION_LEN - 1));
        assert!(parse(&too_long).is_err());
    }

    #[test]
    fn test_columns_collected_once() {
        let expr = parse("a + `b c` * a").unwrap();
        assert_eq!(expr.columns(), vec!["a", "b c"]);
    }
}
