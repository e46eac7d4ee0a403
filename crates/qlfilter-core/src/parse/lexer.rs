use crate::parse::{ParseError, is_reserved};
use std::{iter::Peekable, str::CharIndices};

///
/// Token
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum Token {
    LParen,
    RParen,
    Semicolon,
    Comma,
    Operator(String),
    Word(String),
    Quoted(String),
}

impl Token {
    pub(super) fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Semicolon => "';'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Operator(op) => format!("operator '{op}'"),
            Self::Word(word) => format!("'{word}'"),
            Self::Quoted(text) => format!("quoted value '{text}'"),
        }
    }
}

///
/// Spanned
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct Spanned {
    pub(super) token: Token,
    pub(super) position: usize,
}

/// Split filter text into tokens.
pub(super) fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut chars = input.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some(&(position, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            ';' => {
                chars.next();
                Token::Semicolon
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '\'' | '"' => {
                chars.next();
                Token::Quoted(lex_quoted(&mut chars, ch, position)?)
            }
            '=' | '!' | '<' | '>' | '~' => Token::Operator(lex_operator(&mut chars, position)?),
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_reserved(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                Token::Word(word)
            }
        };

        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

// Quoted literals: a backslash escapes the quote character and itself; any
// other escape sequence (notably `\*`) is kept verbatim for the compiler.
fn lex_quoted(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ParseError> {
    let mut text = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&(_, next)) if next == quote || next == '\\' => {
                    text.push(next);
                    chars.next();
                }
                _ => text.push('\\'),
            },
            c if c == quote => return Ok(text),
            c => text.push(c),
        }
    }

    Err(ParseError::new(start, "unterminated quoted value"))
}

fn lex_operator(chars: &mut Peekable<CharIndices<'_>>, start: usize) -> Result<String, ParseError> {
    let Some((_, first)) = chars.next() else {
        return Err(ParseError::new(start, "expected an operator"));
    };
    let mut op = String::from(first);

    match first {
        '!' | '<' | '>' => {
            if let Some(&(_, '=')) = chars.peek() {
                op.push('=');
                chars.next();
            } else if first == '!' {
                return Err(ParseError::new(start, "expected '!='"));
            }
        }
        '=' => {
            if let Some(&(_, '=')) = chars.peek() {
                op.push('=');
                chars.next();
            } else {
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    op.push(c.to_ascii_lowercase());
                    chars.next();
                }
                match chars.next() {
                    Some((_, '=')) if op.len() > 1 => op.push('='),
                    _ => return Err(ParseError::new(start, format!("malformed operator '{op}'"))),
                }
            }
        }
        _ => return Err(ParseError::new(start, format!("unsupported operator '{first}'"))),
    }

    Ok(op)
}
