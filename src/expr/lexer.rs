//! Tokenizer for counter expressions.

use crate::expr::ExprError;

/// A token with its 1-based column.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub col: usize,
}

/// Token variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    True,
    False,
    Ident(String),

    // Boolean connectives (`&&`/`and`, `||`/`or`, `!`/`not`)
    And,
    Or,
    Not,

    // Comparisons
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    /// `//` floor division
    SlashSlash,
    Percent,

    LParen,
    RParen,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Integer(v) => write!(f, "{}", v),
            TokenKind::Float(v) => write!(f, "{}", v),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::And => f.write_str("&&"),
            TokenKind::Or => f.write_str("||"),
            TokenKind::Not => f.write_str("!"),
            TokenKind::Eq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Le => f.write_str("<="),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::Ge => f.write_str(">="),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::SlashSlash => f.write_str("//"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Eof => f.write_str("end of expression"),
        }
    }
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" | "True" => TokenKind::True,
        "false" | "False" => TokenKind::False,
        _ => TokenKind::Ident(word.to_string()),
    }
}

/// Tokenize an expression. The result always ends with `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        let col = pos + 1;

        // Two-character operators first
        let pair = |second: char| source[pos + ch.len_utf8()..].starts_with(second);
        let (kind, width) = match ch {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
                continue;
            }
            '&' if pair('&') => (TokenKind::And, 2),
            '|' if pair('|') => (TokenKind::Or, 2),
            '=' if pair('=') => (TokenKind::Eq, 2),
            '!' if pair('=') => (TokenKind::Ne, 2),
            '<' if pair('=') => (TokenKind::Le, 2),
            '>' if pair('=') => (TokenKind::Ge, 2),
            '/' if pair('/') => (TokenKind::SlashSlash, 2),
            '!' => (TokenKind::Not, 1),
            '<' => (TokenKind::Lt, 1),
            '>' => (TokenKind::Gt, 1),
            '+' => (TokenKind::Plus, 1),
            '-' => (TokenKind::Minus, 1),
            '*' => (TokenKind::Star, 1),
            '/' => (TokenKind::Slash, 1),
            '%' => (TokenKind::Percent, 1),
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),

            '0'..='9' | '.' => {
                let start = pos;
                let mut end = pos;
                let mut is_float = false;
                while let Some(&(p, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '_' {
                        end = p + 1;
                        chars.next();
                    } else if c == '.' || c == 'e' || c == 'E' {
                        is_float = true;
                        end = p + 1;
                        chars.next();
                        // exponent sign
                        if matches!(c, 'e' | 'E') {
                            if let Some(&(p2, '+' | '-')) = chars.peek() {
                                end = p2 + 1;
                                chars.next();
                            }
                        }
                    } else {
                        break;
                    }
                }
                let text = source[start..end].replace('_', "");
                let kind = if is_float {
                    text.parse::<f64>().map(TokenKind::Float).ok()
                } else {
                    text.parse::<i64>().map(TokenKind::Integer).ok()
                };
                match kind {
                    Some(kind) => tokens.push(Token { kind, col }),
                    None => {
                        return Err(ExprError::InvalidNumber {
                            col,
                            text: source[start..end].to_string(),
                        })
                    }
                }
                continue;
            }

            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                let mut end = pos;
                while let Some(&(p, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = p + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: keyword_or_ident(&source[start..end]),
                    col,
                });
                continue;
            }

            other => return Err(ExprError::UnexpectedChar { col, ch: other }),
        };

        for _ in 0..width {
            chars.next();
        }
        tokens.push(Token { kind, col });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        col: source.len() + 1,
    });
    Ok(tokens)
}
