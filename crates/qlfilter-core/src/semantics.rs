//! Module: semantics
//! Responsibility: scalar comparison rules shared by in-memory evaluators.
//! Does not own: null handling or multi-valued semantics (callers decide).
//! Boundary: memory backend and entity matcher delegate atomic compares here.

use crate::value::Value;
use std::cmp::Ordering;

///
/// MatchToken
///
/// One step of a wildcard match: any run of characters, exactly one
/// character, or a literal character.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MatchToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

/// Upper-case `text` for case-insensitive comparison.
pub(crate) fn fold(text: &str) -> String {
    text.to_uppercase()
}

/// Coerce a literal into the type of the stored value it is compared with.
pub(crate) fn coerce(stored: &Value, literal: &Value) -> Result<Value, String> {
    match (stored, literal) {
        (Value::Integer(_), Value::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("cannot convert '{text}' to an integer")),
        (Value::Text(_), Value::Text(_))
        | (Value::Integer(_), Value::Integer(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::Symbol(_), Value::Symbol(_)) => Ok(literal.clone()),
        _ => Err(format!(
            "cannot compare a {} value with a {} literal",
            stored.type_label(),
            literal.type_label()
        )),
    }
}

/// Order `stored` against `literal`; `fold` applies to text only.
pub(crate) fn compare(
    stored: &Value,
    literal: &Value,
    fold_text: bool,
) -> Result<Ordering, String> {
    let literal = coerce(stored, literal)?;

    match (stored, &literal) {
        (Value::Text(left), Value::Text(right)) => Ok(if fold_text {
            fold(left).cmp(&fold(right))
        } else {
            left.cmp(right)
        }),
        (Value::Integer(left), Value::Integer(right)) => Ok(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Ok(left.cmp(right)),
        (Value::Symbol(left), Value::Symbol(right)) => Ok(left.cmp(right)),
        _ => Err(format!(
            "cannot compare a {} value with a {} literal",
            stored.type_label(),
            literal.type_label()
        )),
    }
}

/// Text a stored value presents to pattern matching.
pub(crate) fn match_text(stored: &Value) -> String {
    match stored {
        Value::Text(text) | Value::Symbol(text) => text.clone(),
        Value::Integer(value) => value.to_string(),
        Value::Bool(value) => value.to_string(),
        Value::Null => String::new(),
    }
}

/// Tokenize a SQL LIKE pattern with an optional escape character.
pub(crate) fn like_tokens(pattern: &str, escape: Option<char>) -> Vec<MatchToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        let token = match c {
            c if Some(c) == escape => match chars.next() {
                Some(escaped) => MatchToken::Literal(escaped),
                None => MatchToken::Literal(c),
            },
            '%' => MatchToken::AnySequence,
            '_' => MatchToken::AnyChar,
            c => MatchToken::Literal(c),
        };
        tokens.push(token);
    }

    tokens
}

/// Greedy wildcard match with single-point backtracking.
pub(crate) fn wildcard_match(text: &str, tokens: &[MatchToken]) -> bool {
    let text: Vec<char> = text.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match tokens.get(p) {
            Some(MatchToken::AnyChar) => true,
            Some(MatchToken::Literal(c)) => *c == text[t],
            Some(MatchToken::AnySequence) | None => false,
        };

        if step {
            t += 1;
            p += 1;
        } else if tokens.get(p) == Some(&MatchToken::AnySequence) {
            resume = Some((p, t));
            p += 1;
        } else if let Some((star, consumed)) = resume {
            p = star + 1;
            t = consumed + 1;
            resume = Some((star, consumed + 1));
        } else {
            return false;
        }
    }

    tokens[p..]
        .iter()
        .all(|token| *token == MatchToken::AnySequence)
}
