//! Tag expressions and tag-argument helpers.
//!
//! A tag expression is a boolean formula over tag literals (`@smoke`),
//! with `not` binding tighter than `and`, `and` tighter than `or`, and
//! parentheses for grouping. The empty expression matches everything.
//!
//! Tags are handled by their bare names everywhere inside the crate (the
//! `gherkin` parser strips the leading `@`); the `@` sigil reappears only
//! on the envelope wire.

use derive_more::{Display, Error};

/// Parsed tag expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagExpr {
    /// Empty expression; matches any tag set.
    Always,

    /// Single tag literal.
    Tag(String),

    /// Logical negation.
    Not(Box<TagExpr>),

    /// Logical conjunction.
    And(Box<TagExpr>, Box<TagExpr>),

    /// Logical disjunction.
    Or(Box<TagExpr>, Box<TagExpr>),
}

/// Error of parsing a [`TagExpr`].
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "{}", message)]
pub struct TagExprError {
    /// Parser diagnostic.
    pub message: String,
}

impl TagExprError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Open,
    Close,
    Not,
    And,
    Or,
    Tag(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, TagExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(match word.as_str() {
                    "not" => Token::Not,
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => {
                        let name = word.strip_prefix('@').ok_or_else(|| {
                            TagExprError::new(format!(
                                "expected tag starting with `@`, found `{word}`",
                            ))
                        })?;
                        if name.is_empty() {
                            return Err(TagExprError::new("empty tag name"));
                        }
                        Token::Tag(name.to_owned())
                    }
                });
            }
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token list.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // or := and ("or" and)*
    fn or(&mut self) -> Result<TagExpr, TagExprError> {
        let mut left = self.and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            _ = self.bump();
            let right = self.and()?;
            left = TagExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // and := unary ("and" unary)*
    fn and(&mut self) -> Result<TagExpr, TagExprError> {
        let mut left = self.unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            _ = self.bump();
            let right = self.unary()?;
            left = TagExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // unary := "not" unary | primary
    fn unary(&mut self) -> Result<TagExpr, TagExprError> {
        if matches!(self.peek(), Some(Token::Not)) {
            _ = self.bump();
            return Ok(TagExpr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    // primary := "(" or ")" | TAG
    fn primary(&mut self) -> Result<TagExpr, TagExprError> {
        match self.bump() {
            Some(Token::Open) => {
                let inner = self.or()?;
                match self.bump() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(TagExprError::new("unclosed `(`")),
                }
            }
            Some(Token::Tag(name)) => Ok(TagExpr::Tag(name)),
            Some(tok) => Err(TagExprError::new(format!(
                "unexpected token {tok:?}",
            ))),
            None => Err(TagExprError::new("unexpected end of expression")),
        }
    }
}

impl TagExpr {
    /// Parses a tag expression.
    ///
    /// # Errors
    ///
    /// If the expression is malformed: a non-`@` literal, an unbalanced
    /// parenthesis, or a dangling operator.
    pub fn parse(input: &str) -> Result<Self, TagExprError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Self::Always);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or()?;
        if parser.pos != parser.tokens.len() {
            return Err(TagExprError::new(format!(
                "trailing input after expression at token {}",
                parser.pos,
            )));
        }
        Ok(expr)
    }

    /// Evaluates this expression against a set of bare tag names.
    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        match self {
            Self::Always => true,
            Self::Tag(name) => {
                tags.iter().any(|t| bare_name(t) == name.as_str())
            }
            Self::Not(inner) => !inner.matches(tags),
            Self::And(l, r) => l.matches(tags) & r.matches(tags),
            Self::Or(l, r) => l.matches(tags) | r.matches(tags),
        }
    }
}

/// Strips a parenthesised argument from a tag, so `retry(3)` and `skip`
/// both evaluate by their bare names.
fn bare_name(tag: &str) -> &str {
    tag.split_once('(').map_or(tag, |(name, _)| name)
}

/// Extracts the retry count from a `retry(N)` tag, if any.
///
/// A bare `retry` tag means one retry.
pub(crate) fn retry_from_tags(tags: &[String]) -> Option<usize> {
    tags.iter().find_map(|tag| {
        let rest = tag.strip_prefix("retry")?;
        if rest.is_empty() {
            return Some(1);
        }
        let inner = rest.strip_prefix('(')?;
        let (num, _) = inner.split_once(')')?;
        num.trim().parse().ok()
    })
}

/// Matches a pickle's tags against the configured skip tags.
///
/// Returns `Some(reason)` when any tag matches; the reason is taken from a
/// `name("…")` argument when present. A reason containing spaces is split
/// across several tag tokens by the Gherkin parser, so the scan rejoins
/// the tag list before matching.
pub(crate) fn skip_reason(
    tags: &[String],
    skip_tags: &[String],
) -> Option<Option<String>> {
    let joined = tags.join(" ");
    for skip in skip_tags {
        let name = skip.strip_prefix('@').unwrap_or(skip);
        if tags.iter().any(|t| t == name) {
            return Some(None);
        }

        let needle = format!("{name}(");
        let mut base = 0;
        while let Some(pos) = joined[base..].find(&needle) {
            let absolute = base + pos;
            let at_boundary =
                absolute == 0 || joined.as_bytes()[absolute - 1] == b' ';
            if at_boundary {
                let rest = &joined[absolute + needle.len()..];
                if let Some((arg, _)) = rest.split_once(')') {
                    let reason = arg
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_owned();
                    return Some((!reason.is_empty()).then_some(reason));
                }
            }
            base = absolute + needle.len();
        }
    }
    None
}
