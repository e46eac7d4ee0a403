use std::fmt;

/// Wildcard character of the filter language.
pub const WILDCARD: char = '*';

/// Escape character of the filter language and of standard LIKE patterns.
pub const ESCAPE: char = '\\';

///
/// PatternToken
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatternToken {
    Literal(String),
    AnySequence,
}

///
/// Pattern
///
/// Wildcard match over text, already separated into literal runs and
/// any-sequence wildcards. Backends render it into their own syntax.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    tokens: Vec<PatternToken>,
}

impl Pattern {
    /// Split a filter literal into a pattern, or `None` when it holds no
    /// unescaped wildcard. `\*` is a literal asterisk; any other backslash is
    /// kept as a literal character.
    #[must_use]
    pub fn from_literal(literal: &str) -> Option<Self> {
        let mut tokens = Vec::new();
        let mut literal_run = String::new();
        let mut wildcard = false;
        let mut chars = literal.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE if chars.peek() == Some(&WILDCARD) => {
                    chars.next();
                    literal_run.push(WILDCARD);
                }
                WILDCARD => {
                    wildcard = true;
                    if !literal_run.is_empty() {
                        tokens.push(PatternToken::Literal(std::mem::take(&mut literal_run)));
                    }
                    if tokens.last() != Some(&PatternToken::AnySequence) {
                        tokens.push(PatternToken::AnySequence);
                    }
                }
                c => literal_run.push(c),
            }
        }

        if !literal_run.is_empty() {
            tokens.push(PatternToken::Literal(literal_run));
        }

        wildcard.then_some(Self { tokens })
    }

    /// Text a wildcard-free literal stands for: `\*` reads as `*`.
    #[must_use]
    pub fn unescape(literal: &str) -> String {
        literal.replace("\\*", "*")
    }

    #[must_use]
    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// Render as a SQL LIKE pattern; `%` and `_` in literals are escaped
    /// according to `dialect`.
    #[must_use]
    pub fn to_like(&self, dialect: LikeDialect) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                PatternToken::AnySequence => out.push('%'),
                PatternToken::Literal(text) => {
                    for c in text.chars() {
                        dialect.push_literal(&mut out, c);
                    }
                }
            }
        }

        out
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                PatternToken::AnySequence => f.write_str("*")?,
                PatternToken::Literal(text) => f.write_str(&text.replace('*', "\\*"))?,
            }
        }

        Ok(())
    }
}

///
/// LikeDialect
///
/// Escaping convention for LIKE patterns. `Standard` uses a backslash escape
/// character; `SqlServer` wraps special characters in brackets.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LikeDialect {
    #[default]
    Standard,
    SqlServer,
}

impl LikeDialect {
    /// Escape character to declare in an `ESCAPE` clause, if any.
    #[must_use]
    pub const fn escape_char(self) -> Option<char> {
        match self {
            Self::Standard => Some(ESCAPE),
            Self::SqlServer => None,
        }
    }

    fn push_literal(self, out: &mut String, c: char) {
        match (self, c) {
            (Self::Standard, '%' | '_' | ESCAPE) => {
                out.push(ESCAPE);
                out.push(c);
            }
            (Self::SqlServer, '%' | '_' | '[') => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
}
