//! Tokenizer for derived-column expressions

use super::error::ExpressionError;

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// Bare identifier: a column name or a function name
    Ident(String),
    /// Back-tick quoted column name, may contain spaces
    QuotedIdent(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{}", i),
            Token::Float(x) => write!(f, "{}", x),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::QuotedIdent(s) => write!(f, "`{}`", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Split an expression into tokens
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExpressionError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>, ExpressionError> {
        while let Some(&(pos, c)) = self.chars.peek() {
            let token = match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '0'..='9' => self.number(pos)?,
                '.' if self.next_is_digit(pos) => self.number(pos)?,
                '.' => return Err(ExpressionError::new("attribute access is not allowed", pos)),
                '\'' | '"' => self.string(pos, c)?,
                '`' => self.quoted_ident(pos)?,
                c if c.is_alphabetic() || c == '_' => self.word(pos),
                _ => self.operator(pos, c)?,
            };
            self.tokens.push(Spanned { token, pos });
        }
        Ok(self.tokens)
    }

    fn next_is_digit(&self, pos: usize) -> bool {
        self.source[pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    /// Consume characters while `pred` holds and return the end offset
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            self.chars.next();
        }
        self.chars.peek().map_or(self.source.len(), |&(p, _)| p)
    }

    fn number(&mut self, start: usize) -> Result<Token, ExpressionError> {
        let mut end = self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.chars.peek().is_some_and(|&(_, c)| c == '.') {
            is_float = true;
            self.chars.next();
            end = self.take_while(|c| c.is_ascii_digit());
        }

        if self.chars.peek().is_some_and(|&(_, c)| c == 'e' || c == 'E') {
            let rest = &self.source[end + 1..];
            let signed = rest.starts_with(|c: char| c == '+' || c == '-');
            let digits = if signed { &rest[1..] } else { rest };
            if digits.starts_with(|c: char| c.is_ascii_digit()) {
                is_float = true;
                self.chars.next();
                if signed {
                    self.chars.next();
                }
                end = self.take_while(|c| c.is_ascii_digit());
            }
        }

        let text = &self.source[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExpressionError::new(format!("invalid number '{}'", text), start))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .or_else(|_| text.parse::<f64>().map(Token::Float))
                .map_err(|_| ExpressionError::new(format!("invalid number '{}'", text), start))
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, ExpressionError> {
        self.chars.next();
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(Token::Str(value)),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(ExpressionError::new("unterminated string literal", start))
    }

    fn quoted_ident(&mut self, start: usize) -> Result<Token, ExpressionError> {
        self.chars.next();
        let mut name = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == '`' {
                if name.is_empty() {
                    return Err(ExpressionError::new("empty column name", start));
                }
                return Ok(Token::QuotedIdent(name));
            }
            name.push(c);
        }
        Err(ExpressionError::new("unterminated quoted column name", start))
    }

    fn word(&mut self, start: usize) -> Token {
        let end = self.take_while(|c| c.is_alphanumeric() || c == '_');
        let word = &self.source[start..end];
        match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            "null" | "none" => Token::Null,
            _ => Token::Ident(word.to_string()),
        }
    }

    fn operator(&mut self, pos: usize, c: char) -> Result<Token, ExpressionError> {
        self.chars.next();
        let next = self.chars.peek().map(|&(_, n)| n);
        let (token, two_chars) = match (c, next) {
            ('=', Some('=')) => (Token::EqEq, true),
            ('!', Some('=')) => (Token::NotEq, true),
            ('<', Some('=')) => (Token::Le, true),
            ('>', Some('=')) => (Token::Ge, true),
            ('&', Some('&')) => (Token::And, true),
            ('|', Some('|')) => (Token::Or, true),
            ('<', _) => (Token::Lt, false),
            ('>', _) => (Token::Gt, false),
            ('!', _) => (Token::Not, false),
            ('+', _) => (Token::Plus, false),
            ('-', _) => (Token::Minus, false),
            ('*', Some('*')) => {
                return Err(ExpressionError::new("use pow(x, y) for exponentiation", pos))
            }
            ('*', _) => (Token::Star, false),
            ('/', _) => (Token::Slash, false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            (',', _) => (Token::Comma, false),
            ('=', _) => return Err(ExpressionError::new("use '==' for comparison", pos)),
            ('[', _) | (']', _) => {
                return Err(ExpressionError::new("indexing is not allowed", pos))
            }
            _ => {
                return Err(ExpressionError::new(
                    format!("unexpected character '{}'", c),
                    pos,
                ))
            }
        };
        if two_chars {
            self.chars.next();
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            tokens("a + 2.5 * (b - 1)"),
            vec![
                Token::Ident("a".into()),
                Token::Plus,
                Token::Float(2.5),
                Token::Star,
                Token::LParen,
                Token::Ident("b".into()),
                Token::Minus,
                Token::Int(1),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_keywords_and_comparisons() {
        assert_eq!(
            tokens("not x >= 3 and y != 'a b' or True"),
            vec![
                Token::Not,
                Token::Ident("x".into()),
                Token::Ge,
                Token::Int(3),
                Token::And,
                Token::Ident("y".into()),
                Token::NotEq,
                Token::Str("a b".into()),
                Token::Or,
                Token::True,
            ]
        );
    }

    #[test]
    fn test_quoted_identifier_and_exponent() {
        assert_eq!(
            tokens("`Unit Price` * 1e3"),
            vec![
                Token::QuotedIdent("Unit Price".into()),
                Token::Star,
                Token::Float(1000.0),
            ]
        );
    }

    #[test]
    fn test_rejects_attribute_access() {
        let err = tokenize("a.__class__").unwrap_err();
        assert_eq!(err.position, 1);
        assert!(err.message.contains("attribute access"));
    }

    #[test]
    fn test_rejects_indexing_and_assignment() {
        assert!(tokenize("a[0]").is_err());
        assert!(tokenize("a = 1").is_err());
        assert!(tokenize("'open").is_err());
    }
}
