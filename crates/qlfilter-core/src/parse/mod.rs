//! Module: parse
//! Responsibility: filter text to `FilterNode` trees.
//! Does not own: selector or literal meaning; every word is kept as text.
//! Boundary: syntax failures surface as `FilterError::Syntax`.

mod lexer;


use crate::{
    ast::{ComparisonOperator, FilterNode},
    error::FilterError,
    normalize::NULL_LITERAL,
};
use lexer::{Spanned, Token, tokenize};
use thiserror::Error as ThisError;

///
/// ParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl From<ParseError> for FilterError {
    fn from(err: ParseError) -> Self {
        Self::syntax(err.to_string())
    }
}

/// Characters that end an unquoted word.
#[must_use]
pub fn is_reserved(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\'' | '"' | '(' | ')' | ';' | ',' | '=' | '<' | '>' | '!' | '~'
        )
}

/// Parse filter text into a tree.
///
/// `and`/`;` binds tighter than `or`/`,`; keywords are case-insensitive.
pub fn parse(input: &str) -> Result<FilterNode, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty filter"));
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: input.len(),
    };
    let node = parser.or_expr()?;

    match parser.peek() {
        None => Ok(node),
        Some(spanned) => Err(ParseError::new(
            spanned.position,
            format!("unexpected {}", spanned.token.describe()),
        )),
    }
}

///
/// Parser
///

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.cursor).cloned();
        if spanned.is_some() {
            self.cursor += 1;
        }
        spanned
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |spanned| spanned.position)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.peek().map(|spanned| &spanned.token),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword)
        )
    }

    fn or_expr(&mut self) -> Result<FilterNode, ParseError> {
        let mut children = vec![self.and_expr()?];
        while matches!(self.peek().map(|s| &s.token), Some(Token::Comma)) || self.at_keyword("or")
        {
            self.next();
            children.push(self.and_expr()?);
        }

        Ok(group(children, false))
    }

    fn and_expr(&mut self) -> Result<FilterNode, ParseError> {
        let mut children = vec![self.constraint()?];
        while matches!(self.peek().map(|s| &s.token), Some(Token::Semicolon))
            || self.at_keyword("and")
        {
            self.next();
            children.push(self.constraint()?);
        }

        Ok(group(children, true))
    }

    fn constraint(&mut self) -> Result<FilterNode, ParseError> {
        let position = self.position();
        match self.next() {
            Some(Spanned {
                token: Token::LParen,
                ..
            }) => {
                let node = self.or_expr()?;
                self.expect_rparen()?;
                Ok(node)
            }
            Some(Spanned {
                token: Token::Word(selector),
                ..
            }) => self.comparison(selector),
            Some(other) => Err(ParseError::new(
                position,
                format!("expected a selector, found {}", other.token.describe()),
            )),
            None => Err(ParseError::new(position, "expected a selector")),
        }
    }

    fn comparison(&mut self, selector: String) -> Result<FilterNode, ParseError> {
        let position = self.position();
        let (symbol, operator) = match self.next() {
            Some(Spanned {
                token: Token::Operator(symbol),
                ..
            }) => {
                let operator = ComparisonOperator::from_symbol(&symbol).ok_or_else(|| {
                    ParseError::new(position, format!("unknown operator '{symbol}'"))
                })?;
                (symbol, operator)
            }
            Some(other) => {
                return Err(ParseError::new(
                    position,
                    format!(
                        "expected an operator after '{selector}', found {}",
                        other.token.describe()
                    ),
                ));
            }
            None => {
                return Err(ParseError::new(
                    position,
                    format!("expected an operator after '{selector}'"),
                ));
            }
        };

        let arguments = if matches!(self.peek().map(|s| &s.token), Some(Token::LParen)) {
            self.next();
            let mut arguments = vec![self.argument()?];
            while matches!(self.peek().map(|s| &s.token), Some(Token::Comma)) {
                self.next();
                arguments.push(self.argument()?);
            }
            self.expect_rparen()?;
            arguments
        } else {
            vec![self.argument()?]
        };

        let operator = match arguments.as_slice() {
            [literal] if literal.eq_ignore_ascii_case(NULL_LITERAL) => {
                ComparisonOperator::null_aware(&symbol).unwrap_or(operator)
            }
            _ => operator,
        };

        Ok(FilterNode::Compare {
            selector,
            operator,
            arguments,
        })
    }

    fn argument(&mut self) -> Result<String, ParseError> {
        let position = self.position();
        match self.next() {
            Some(Spanned {
                token: Token::Word(word) | Token::Quoted(word),
                ..
            }) => Ok(word),
            Some(other) => Err(ParseError::new(
                position,
                format!("expected a value, found {}", other.token.describe()),
            )),
            None => Err(ParseError::new(position, "expected a value")),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        let position = self.position();
        match self.next() {
            Some(Spanned {
                token: Token::RParen,
                ..
            }) => Ok(()),
            Some(other) => Err(ParseError::new(
                position,
                format!("expected ')', found {}", other.token.describe()),
            )),
            None => Err(ParseError::new(position, "expected ')'")),
        }
    }
}

// Splice same-kind children and collapse single-child groups.
fn group(children: Vec<FilterNode>, conjunction: bool) -> FilterNode {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            FilterNode::And(inner) if conjunction => flat.extend(inner),
            FilterNode::Or(inner) if !conjunction => flat.extend(inner),
            other => flat.push(other),
        }
    }

    if flat.len() == 1
        && let Some(only) = flat.pop()
    {
        return only;
    }

    if conjunction {
        FilterNode::And(flat)
    } else {
        FilterNode::Or(flat)
    }
}
