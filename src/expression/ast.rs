//! Cucumber Expression AST and its recursive-descent parser.
//!
//! The grammar is small: literal text with `\`-escapes for the reserved
//! characters `{`, `}`, `(`, `)`, `/` and `\`; `{name}` parameters (an
//! empty name is the anonymous parameter); `(fragment)` optionals; and
//! word-level `a/b/c` alternation over literal alternatives.

use super::ExpressionError;

/// One building block of a parsed expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Node {
    /// Literal text, escapes already resolved.
    Text(String),

    /// `(fragment)`: the whole fragment may be absent.
    Optional(String),

    /// `a/b/c`: any one of the literal alternatives.
    Alternation(Vec<String>),

    /// `{name}` parameter reference; empty name is anonymous.
    Parameter(String),
}

/// Parses an expression source into its node list.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < chars.len() {
        match chars[pos] {
            '\\' => {
                pos += 1;
                text.push(*chars.get(pos).unwrap_or(&'\\'));
                pos += 1;
            }
            '{' => {
                flush(&mut text, &mut nodes);
                let (name, next) = parse_parameter(&chars, pos)?;
                nodes.push(Node::Parameter(name));
                pos = next;
            }
            '(' => {
                flush(&mut text, &mut nodes);
                let (fragment, next) = parse_optional(&chars, pos)?;
                nodes.push(Node::Optional(fragment));
                pos = next;
            }
            '/' => {
                let first = take_trailing_word(&mut text);
                if first.is_empty() {
                    return Err(ExpressionError::EmptyAlternative(pos));
                }
                flush(&mut text, &mut nodes);
                let (alts, next) = parse_alternation(&chars, pos, first)?;
                nodes.push(Node::Alternation(alts));
                pos = next;
            }
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }

    flush(&mut text, &mut nodes);
    Ok(nodes)
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// Splits the trailing non-whitespace run off `text`.
fn take_trailing_word(text: &mut String) -> String {
    let boundary = text
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    text.split_off(boundary)
}

// `pos` points at the opening `{`; returns (name, position after `}`).
fn parse_parameter(
    chars: &[char],
    pos: usize,
) -> Result<(String, usize), ExpressionError> {
    let open = pos;
    let mut name = String::new();
    let mut pos = pos + 1;
    while pos < chars.len() {
        match chars[pos] {
            '}' => return Ok((name, pos + 1)),
            '{' => return Err(ExpressionError::NestedParameter(pos)),
            c => {
                name.push(c);
                pos += 1;
            }
        }
    }
    Err(ExpressionError::UnfinishedParameter(open))
}

// `pos` points at the opening `(`; returns (fragment, position after `)`).
fn parse_optional(
    chars: &[char],
    pos: usize,
) -> Result<(String, usize), ExpressionError> {
    let open = pos;
    let mut fragment = String::new();
    let mut pos = pos + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' => {
                pos += 1;
                fragment.push(*chars.get(pos).unwrap_or(&'\\'));
                pos += 1;
            }
            ')' => {
                if fragment.is_empty() {
                    return Err(ExpressionError::EmptyOptional(open));
                }
                return Ok((fragment, pos + 1));
            }
            c => {
                fragment.push(c);
                pos += 1;
            }
        }
    }
    Err(ExpressionError::UnfinishedOptional(open))
}

// `pos` points at the first `/`; `first` is the alternative preceding it.
// Returns (alternatives, position of the first unconsumed character).
fn parse_alternation(
    chars: &[char],
    pos: usize,
    first: String,
) -> Result<(Vec<String>, usize), ExpressionError> {
    let mut alts = vec![first];
    let mut current = String::new();
    let mut pos = pos + 1;

    loop {
        match chars.get(pos) {
            None => break,
            Some('\\') => {
                pos += 1;
                current.push(*chars.get(pos).unwrap_or(&'\\'));
                pos += 1;
            }
            Some('/') => {
                if current.is_empty() {
                    return Err(ExpressionError::EmptyAlternative(pos));
                }
                alts.push(std::mem::take(&mut current));
                pos += 1;
            }
            Some('{' | '(') => {
                return Err(ExpressionError::SpecialInAlternation(pos));
            }
            Some(c) if c.is_whitespace() => break,
            Some(c) => {
                current.push(*c);
                pos += 1;
            }
        }
    }

    if current.is_empty() {
        return Err(ExpressionError::EmptyAlternative(pos));
    }
    alts.push(current);
    Ok((alts, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(
            parse("I have cucumbers").unwrap(),
            [Node::Text("I have cucumbers".into())],
        );
    }

    #[test]
    fn parameters_split_text() {
        assert_eq!(
            parse("I have {int} cucumbers").unwrap(),
            [
                Node::Text("I have ".into()),
                Node::Parameter("int".into()),
                Node::Text(" cucumbers".into()),
            ],
        );
    }

    #[test]
    fn anonymous_parameter_has_empty_name() {
        assert_eq!(
            parse("{}").unwrap(),
            [Node::Parameter(String::new())],
        );
    }

    #[test]
    fn optionals_capture_their_fragment() {
        assert_eq!(
            parse("cucumber(s)").unwrap(),
            [Node::Text("cucumber".into()), Node::Optional("s".into())],
        );
    }

    #[test]
    fn alternation_binds_to_adjacent_words() {
        assert_eq!(
            parse("I sell cucumber/gherkin today").unwrap(),
            [
                Node::Text("I sell ".into()),
                Node::Alternation(vec!["cucumber".into(), "gherkin".into()]),
                Node::Text(" today".into()),
            ],
        );
    }

    #[test]
    fn alternation_with_three_branches() {
        assert_eq!(
            parse("a/b/c").unwrap(),
            [Node::Alternation(vec![
                "a".into(),
                "b".into(),
                "c".into(),
            ])],
        );
    }

    #[test]
    fn escapes_neutralise_reserved_characters() {
        assert_eq!(
            parse(r"I use \{braces\} and \(parens\) and a\/b").unwrap(),
            [Node::Text("I use {braces} and (parens) and a/b".into())],
        );
    }

    #[test]
    fn unfinished_parameter_is_an_error() {
        assert_eq!(
            parse("{int"),
            Err(ExpressionError::UnfinishedParameter(0)),
        );
    }

    #[test]
    fn empty_optional_is_an_error() {
        assert_eq!(parse("a()"), Err(ExpressionError::EmptyOptional(1)));
    }

    #[test]
    fn empty_alternative_is_an_error() {
        assert!(parse("a/").is_err());
        assert!(parse("/a").is_err());
        assert!(parse("a//b").is_err());
    }

    #[test]
    fn parameter_inside_alternation_is_an_error() {
        assert_eq!(
            parse("a/{int}"),
            Err(ExpressionError::SpecialInAlternation(2)),
        );
    }
}
