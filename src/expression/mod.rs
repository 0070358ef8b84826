//! Cucumber Expression compiler.
//!
//! Compiles patterns like `I have {int} cucumbers` into an anchored regex
//! plus an ordered transformer sequence, and matches step text against
//! them producing typed [`StepArg`]s.

mod ast;
pub mod param;

use derive_more::{Display, Error};
use regex::Regex;

pub use self::param::{
    ParamKind, ParamType, ParamTypeRegistry, StepArg, StepValue,
    TransformError, Transformer,
};

/// Error of parsing or compiling a Cucumber Expression.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ExpressionError {
    /// `{` without a closing `}`.
    #[display(fmt = "unfinished parameter at offset {}", _0)]
    UnfinishedParameter(#[error(not(source))] usize),

    /// `{` nested inside a parameter.
    #[display(fmt = "nested parameter at offset {}", _0)]
    NestedParameter(#[error(not(source))] usize),

    /// `(` without a closing `)`.
    #[display(fmt = "unfinished optional at offset {}", _0)]
    UnfinishedOptional(#[error(not(source))] usize),

    /// `()` with nothing inside.
    #[display(fmt = "empty optional at offset {}", _0)]
    EmptyOptional(#[error(not(source))] usize),

    /// Alternation branch with no text.
    #[display(fmt = "empty alternative at offset {}", _0)]
    EmptyAlternative(#[error(not(source))] usize),

    /// Parameter or optional inside an alternation branch.
    #[display(
        fmt = "parameter or optional inside alternation at offset {}",
        _0
    )]
    SpecialInAlternation(#[error(not(source))] usize),

    /// Pattern references a parameter type missing from the registry.
    #[display(fmt = "undefined parameter type {{{}}}", _0)]
    UndefinedParameterType(#[error(not(source))] String),

    /// The produced regex failed to build (a custom sub-pattern is
    /// invalid).
    #[display(fmt = "invalid regex produced: {}", _0)]
    InvalidRegex(#[error(not(source))] String),
}

/// A compiled Cucumber Expression.
#[derive(Clone, Debug)]
pub struct Expression {
    source: String,
    regex: Regex,
    params: Vec<ParamType>,
}

impl Expression {
    /// Compiles `source` against the given parameter-type registry.
    ///
    /// # Errors
    ///
    /// See [`ExpressionError`].
    pub fn compile(
        source: &str,
        registry: &ParamTypeRegistry,
    ) -> Result<Self, ExpressionError> {
        let nodes = ast::parse(source)?;

        let mut regex_src = String::from("^");
        let mut params = Vec::new();
        for node in nodes {
            match node {
                ast::Node::Text(text) => {
                    regex_src.push_str(&regex::escape(&text));
                }
                ast::Node::Optional(fragment) => {
                    regex_src.push_str("(?:");
                    regex_src.push_str(&regex::escape(&fragment));
                    regex_src.push_str(")?");
                }
                ast::Node::Alternation(alts) => {
                    regex_src.push_str("(?:");
                    for (i, alt) in alts.iter().enumerate() {
                        if i > 0 {
                            regex_src.push('|');
                        }
                        regex_src.push_str(&regex::escape(alt));
                    }
                    regex_src.push(')');
                }
                ast::Node::Parameter(name) => {
                    let param = registry.get(&name).ok_or_else(|| {
                        ExpressionError::UndefinedParameterType(name.clone())
                    })?;
                    regex_src.push('(');
                    for (i, pattern) in param.patterns().iter().enumerate() {
                        if i > 0 {
                            regex_src.push('|');
                        }
                        if param.patterns().len() > 1 {
                            regex_src.push_str("(?:");
                            regex_src.push_str(pattern);
                            regex_src.push(')');
                        } else {
                            regex_src.push_str(pattern);
                        }
                    }
                    regex_src.push(')');
                    params.push(param.clone());
                }
            }
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src)
            .map_err(|e| ExpressionError::InvalidRegex(e.to_string()))?;
        Ok(Self { source: source.to_owned(), regex, params })
    }

    /// Original pattern text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source of the compiled regex.
    #[must_use]
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }

    /// Parameter types matched by this expression, left to right.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Matches `text`, producing one typed argument per parameter.
    ///
    /// On transformer failure the raw captured text is boxed as a
    /// [`StepValue::String`] instead of failing the match.
    #[must_use]
    pub fn match_against(&self, text: &str) -> Option<Vec<StepArg>> {
        let caps = self.regex.captures(text)?;

        let mut args = Vec::with_capacity(self.params.len());
        let mut group_idx = 1;
        for param in &self.params {
            let count = param.group_count();
            let groups: Vec<Option<&str>> = (group_idx..group_idx + count)
                .map(|i| caps.get(i).map(|m| m.as_str()))
                .collect();
            group_idx += count;

            let raw = groups
                .first()
                .copied()
                .flatten()
                .unwrap_or_default()
                .to_owned();

            // `{string}` transformers see the content without its quotes.
            let transformed = if matches!(param.kind(), ParamKind::String) {
                let stripped = strip_quotes(&raw).to_owned();
                let mut groups = groups.clone();
                groups[0] = Some(&stripped);
                param.transform(&groups)
            } else {
                param.transform(&groups)
            };

            let value = transformed.unwrap_or_else(|e| {
                log::debug!(
                    "transformer for {{{}}} rejected `{raw}`: {e}",
                    param.name(),
                );
                StepValue::String(raw.clone())
            });
            args.push(StepArg { value, raw });
        }
        Some(args)
    }
}

fn strip_quotes(raw: &str) -> &str {
    let stripped = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\''))
        });
    stripped.unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Expression {
        Expression::compile(source, &ParamTypeRegistry::new()).unwrap()
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let expr = compile("I have cucumbers");
        assert!(expr.match_against("I have cucumbers").is_some());
        assert!(expr.match_against("I have cucumbers!").is_none());
        assert!(expr.match_against("I have").is_none());
    }

    #[test]
    fn int_parameter_produces_typed_argument() {
        let expr = compile("I have {int} cucumbers");
        let args = expr.match_against("I have 5 cucumbers").unwrap();

        assert_eq!(args.len(), 1);
        assert_eq!(args[0].raw, "5");
        assert!(matches!(args[0].value, StepValue::Int(5)));
    }

    #[test]
    fn multiple_parameters_advance_group_offsets() {
        let expr = compile("{int} plus {int} is {int}");
        let args = expr.match_against("2 plus 3 is 5").unwrap();

        let values: Vec<_> = args
            .iter()
            .map(|a| match a.value {
                StepValue::Int(v) => v,
                ref other => panic!("expected int, got {other:?}"),
            })
            .collect();
        assert_eq!(values, [2, 3, 5]);
    }

    #[test]
    fn string_parameter_strips_quotes() {
        let expr = compile("I say {string}");

        let args = expr.match_against(r#"I say "hello world""#).unwrap();
        assert!(
            matches!(&args[0].value, StepValue::String(s) if s == "hello world"),
        );
        assert_eq!(args[0].raw, r#""hello world""#);

        let args = expr.match_against("I say 'single'").unwrap();
        assert!(
            matches!(&args[0].value, StepValue::String(s) if s == "single"),
        );
    }

    #[test]
    fn string_parameter_unescapes_inner_quotes() {
        let expr = compile("I say {string}");
        let args =
            expr.match_against(r#"I say "a \"quoted\" word""#).unwrap();
        assert!(
            matches!(&args[0].value, StepValue::String(s) if s == r#"a "quoted" word"#),
        );
    }

    #[test]
    fn word_parameter_stops_at_whitespace() {
        let expr = compile("I pick {word} now");
        let args = expr.match_against("I pick this now").unwrap();
        assert!(matches!(&args[0].value, StepValue::String(s) if s == "this"));
        assert!(expr.match_against("I pick two words now").is_none());
    }

    #[test]
    fn anonymous_parameter_matches_anything() {
        let expr = compile("I see {}");
        let args = expr.match_against("I see all of it").unwrap();
        assert!(
            matches!(&args[0].value, StepValue::String(s) if s == "all of it"),
        );
    }

    #[test]
    fn optional_fragment_may_be_absent() {
        let expr = compile("I have {int} cucumber(s)");
        assert!(expr.match_against("I have 1 cucumber").is_some());
        assert!(expr.match_against("I have 3 cucumbers").is_some());
    }

    #[test]
    fn alternation_matches_any_branch() {
        let expr = compile("I eat/sell {int} items");
        assert!(expr.match_against("I eat 3 items").is_some());
        assert!(expr.match_against("I sell 3 items").is_some());
        assert!(expr.match_against("I buy 3 items").is_none());
    }

    #[test]
    fn escaped_braces_match_literally() {
        let expr = compile(r"I use \{int\} literally");
        assert!(expr.match_against("I use {int} literally").is_some());
    }

    #[test]
    fn unknown_parameter_type_is_a_compile_error() {
        let err = Expression::compile(
            "I have {cucumber}",
            &ParamTypeRegistry::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::UndefinedParameterType("cucumber".into()),
        );
    }

    #[test]
    fn transformer_failure_falls_back_to_raw_string() {
        let expr = compile("value is {byte}");
        // 4096 overflows a byte, so the transformer fails.
        let args = expr.match_against("value is 4096").unwrap();
        assert!(matches!(&args[0].value, StepValue::String(s) if s == "4096"));
    }

    #[test]
    fn custom_parameter_with_transformer() {
        let mut registry = ParamTypeRegistry::new();
        registry.register_custom(
            "color",
            vec!["red|green|blue".to_owned()],
            Some(std::rc::Rc::new(|groups: &[Option<&str>]| {
                let raw = groups[0].unwrap_or_default();
                Ok(StepValue::Custom {
                    name: "color".into(),
                    value: std::rc::Rc::new(raw.len()),
                })
            })),
        );

        let expr =
            Expression::compile("paint it {color}", &registry).unwrap();
        let args = expr.match_against("paint it green").unwrap();
        match &args[0].value {
            StepValue::Custom { value, .. } => {
                assert_eq!(*value.downcast_ref::<usize>().unwrap(), 5);
            }
            other => panic!("expected custom, got {other:?}"),
        }
    }

    #[test]
    fn custom_pattern_with_inner_groups_advances_offsets() {
        let mut registry = ParamTypeRegistry::new();
        registry.register_custom(
            "pair",
            vec![r"(\d+)-(\d+)".to_owned()],
            None,
        );

        let expr = Expression::compile(
            "range {pair} then {int}",
            &registry,
        )
        .unwrap();
        let args = expr.match_against("range 1-2 then 9").unwrap();

        assert_eq!(args.len(), 2);
        assert_eq!(args[0].raw, "1-2");
        assert!(matches!(args[1].value, StepValue::Int(9)));
    }
}
