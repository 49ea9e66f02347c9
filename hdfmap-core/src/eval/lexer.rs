//! Tokenizer for namespace expressions.

use crate::error::EvalError;

/// Token types for the expression parser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
}

/// A token and the byte offset it starts at.
pub(crate) type Spanned = (usize, Token);

/// Lexer: convert an expression string into tokens.
pub(crate) fn lex(input: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => tokens.push((pos, lex_number(input, &mut chars)?)),
            '.' if input[pos + 1..].starts_with(|c: char| c.is_ascii_digit()) => {
                tokens.push((pos, lex_number(input, &mut chars)?));
            }
            c if c == '_' || c.is_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c == '_' || c.is_alphanumeric() {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((pos, Token::Name(name)));
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                text.push(match escaped {
                                    'n' => '\n',
                                    't' => '\t',
                                    other => other,
                                });
                            }
                        }
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => text.push(c),
                    }
                }
                if !closed {
                    return Err(syntax(pos, "unterminated string literal"));
                }
                tokens.push((pos, Token::Str(text)));
            }
            _ => {
                chars.next();
                let next = chars.peek().map(|&(_, c)| c);
                let (token, double) = match (ch, next) {
                    ('*', Some('*')) => (Token::StarStar, true),
                    ('/', Some('/')) => (Token::SlashSlash, true),
                    ('<', Some('=')) => (Token::Le, true),
                    ('>', Some('=')) => (Token::Ge, true),
                    ('=', Some('=')) => (Token::EqEq, true),
                    ('!', Some('=')) => (Token::NotEq, true),
                    ('+', _) => (Token::Plus, false),
                    ('-', _) => (Token::Minus, false),
                    ('*', _) => (Token::Star, false),
                    ('/', _) => (Token::Slash, false),
                    ('%', _) => (Token::Percent, false),
                    ('(', _) => (Token::LParen, false),
                    (')', _) => (Token::RParen, false),
                    ('[', _) => (Token::LBracket, false),
                    (']', _) => (Token::RBracket, false),
                    (',', _) => (Token::Comma, false),
                    (':', _) => (Token::Colon, false),
                    ('.', _) => (Token::Dot, false),
                    ('<', _) => (Token::Lt, false),
                    ('>', _) => (Token::Gt, false),
                    _ => return Err(syntax(pos, &format!("unexpected character '{ch}'"))),
                };
                if double {
                    chars.next();
                }
                tokens.push((pos, token));
            }
        }
    }

    Ok(tokens)
}

fn lex_number<I>(input: &str, chars: &mut std::iter::Peekable<I>) -> Result<Token, EvalError>
where
    I: Iterator<Item = (usize, char)>,
{
    let start = chars.peek().map_or(input.len(), |&(p, _)| p);
    let mut end = start;
    let mut is_float = false;
    let mut prev = ' ';
    while let Some(&(p, c)) = chars.peek() {
        let accept = match c {
            '0'..='9' | '_' => true,
            '.' if !is_float => {
                is_float = true;
                true
            }
            'e' | 'E' => {
                is_float = true;
                true
            }
            '+' | '-' => matches!(prev, 'e' | 'E'),
            _ => false,
        };
        if !accept {
            break;
        }
        prev = c;
        end = p + c.len_utf8();
        chars.next();
    }
    let text: String = input[start..end].chars().filter(|c| *c != '_').collect();
    if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| syntax(start, &format!("invalid number '{text}'")))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .or_else(|_| text.parse::<f64>().map(Token::Float))
            .map_err(|_| syntax(start, &format!("invalid number '{text}'")))
    }
}

pub(crate) fn syntax(position: usize, message: &str) -> EvalError {
    EvalError::Syntax {
        position,
        message: message.to_string(),
    }
}
