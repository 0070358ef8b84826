//! Parameter types, their registry and the typed values they produce.

use std::{any::Any, fmt, rc::Rc, str::FromStr as _};

use bigdecimal::BigDecimal;
use derive_more::{Display, Error};
use linked_hash_map::LinkedHashMap;
use num_bigint::BigInt;

use crate::pickle::DataTable;

/// Discriminant naming a well-known parameter type, or a custom one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// `{int}`.
    Int,

    /// `{long}`.
    Long,

    /// `{byte}`.
    Byte,

    /// `{short}`.
    Short,

    /// `{biginteger}`.
    BigInteger,

    /// `{float}`.
    Float,

    /// `{double}`.
    Double,

    /// `{bigdecimal}`.
    BigDecimal,

    /// `{string}`.
    String,

    /// `{word}`.
    Word,

    /// `{}`.
    Anonymous,

    /// User-registered type.
    Custom(String),
}

/// A typed value produced by a parameter-type transformer.
///
/// Built-ins remain strongly typed variants; custom transformers return a
/// type-erased payload behind [`StepValue::Custom`].
#[derive(Clone)]
pub enum StepValue {
    /// 32-bit integer from `{int}`.
    Int(i32),

    /// 64-bit integer from `{long}`.
    Long(i64),

    /// Signed byte from `{byte}`.
    Byte(i8),

    /// 16-bit integer from `{short}`.
    Short(i16),

    /// Arbitrary-precision integer from `{biginteger}`.
    BigInteger(BigInt),

    /// Single-precision float from `{float}`.
    Float(f32),

    /// Double-precision float from `{double}`.
    Double(f64),

    /// Arbitrary-precision decimal from `{bigdecimal}`.
    BigDecimal(BigDecimal),

    /// Text from `{string}` (quotes stripped), `{word}` or `{}`.
    String(String),

    /// DocString block attached to the step.
    DocString(String),

    /// Data table attached to the step.
    DataTable(DataTable),

    /// Type-erased value from a custom transformer.
    Custom {
        /// Name of the producing parameter type.
        name: String,

        /// The erased payload.
        value: Rc<dyn Any>,
    },
}

impl fmt::Debug for StepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Long(v) => write!(f, "Long({v})"),
            Self::Byte(v) => write!(f, "Byte({v})"),
            Self::Short(v) => write!(f, "Short({v})"),
            Self::BigInteger(v) => write!(f, "BigInteger({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Double(v) => write!(f, "Double({v})"),
            Self::BigDecimal(v) => write!(f, "BigDecimal({v})"),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::DocString(v) => write!(f, "DocString({v:?})"),
            Self::DataTable(v) => write!(f, "DataTable({v:?})"),
            Self::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

/// One matched step argument: the typed value and the raw matched text.
#[derive(Clone, Debug)]
pub struct StepArg {
    /// Transformed value.
    pub value: StepValue,

    /// Raw text the capture matched.
    pub raw: String,
}

/// Error of a transformer rejecting its captured groups.
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "{}", message)]
pub struct TransformError {
    /// Transformer diagnostic.
    pub message: String,
}

impl TransformError {
    /// Creates a new [`TransformError`].
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Transformer from captured groups to a typed value.
///
/// Receives the parameter's capture groups in order; unmatched groups
/// (from untaken alternation branches) are [`None`].
pub type Transformer =
    Rc<dyn Fn(&[Option<&str>]) -> Result<StepValue, TransformError>>;

/// A registered parameter type: name, regex sub-patterns and transformer.
#[derive(Clone)]
pub struct ParamType {
    name: String,
    kind: ParamKind,
    patterns: Vec<String>,
    transformer: Transformer,
    group_count: usize,
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("patterns", &self.patterns)
            .field("group_count", &self.group_count)
            .finish_non_exhaustive()
    }
}

impl ParamType {
    /// Creates a parameter type from its sub-patterns and transformer.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ParamKind,
        patterns: Vec<String>,
        transformer: Transformer,
    ) -> Self {
        let group_count =
            1 + patterns.iter().map(|p| count_groups(p)).sum::<usize>();
        Self { name: name.into(), kind, patterns, transformer, group_count }
    }

    /// Name this type is referenced by inside `{…}`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Well-known or custom discriminant.
    #[must_use]
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Regex sub-patterns.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Capture groups this parameter occupies in a compiled expression:
    /// one for the wrapping group plus any inside the sub-patterns.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub(crate) fn transform(
        &self,
        groups: &[Option<&str>],
    ) -> Result<StepValue, TransformError> {
        (self.transformer)(groups)
    }
}

/// Counts capture groups in a pattern: unescaped `(` not starting a
/// non-capturing or look-around group.
fn count_groups(pattern: &str) -> usize {
    let bytes = pattern.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' if bytes.get(i + 1) != Some(&b'?') => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}

/// Registry of parameter types, pre-populated with the built-ins.
#[derive(Clone, Debug)]
pub struct ParamTypeRegistry {
    entries: LinkedHashMap<String, ParamType>,
}

impl Default for ParamTypeRegistry {
    fn default() -> Self {
        let mut registry = Self { entries: LinkedHashMap::new() };
        for builtin in builtins() {
            registry.register(builtin);
        }
        registry
    }
}

impl ParamTypeRegistry {
    /// Creates a registry holding the built-in parameter types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter type, replacing any previous one of the same
    /// name.
    pub fn register(&mut self, param: ParamType) {
        _ = self.entries.insert(param.name.clone(), param);
    }

    /// Registers a custom parameter type. Without a transformer, the
    /// first captured group is boxed as an opaque [`StepValue::Custom`]
    /// payload.
    pub fn register_custom(
        &mut self,
        name: impl Into<String>,
        patterns: Vec<String>,
        transformer: Option<Transformer>,
    ) {
        let name = name.into();
        let transformer = transformer.unwrap_or_else(|| {
            let name = name.clone();
            Rc::new(move |groups: &[Option<&str>]| {
                let raw = first_group(groups)?;
                Ok(StepValue::Custom {
                    name: name.clone(),
                    value: Rc::new(raw.to_owned()),
                })
            })
        });
        self.register(ParamType::new(
            name.clone(),
            ParamKind::Custom(name),
            patterns,
            transformer,
        ));
    }

    /// Returns the entry registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamType> {
        self.entries.get(name)
    }

    /// All entries, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &ParamType> + '_ {
        self.entries.values()
    }

    /// Custom entries only, in registration order.
    pub(crate) fn custom_entries(
        &self,
    ) -> impl Iterator<Item = &ParamType> + '_ {
        self.entries
            .values()
            .filter(|p| matches!(p.kind, ParamKind::Custom(_)))
    }
}

fn first_group<'a>(
    groups: &[Option<&'a str>],
) -> Result<&'a str, TransformError> {
    groups
        .iter()
        .find_map(|g| *g)
        .ok_or_else(|| TransformError::new("no capture group matched"))
}

fn parsed<T>(groups: &[Option<&str>]) -> Result<T, TransformError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let raw = first_group(groups)?;
    raw.parse().map_err(|e| {
        TransformError::new(format!("cannot transform `{raw}`: {e}"))
    })
}

const INT_PATTERN: &str = r"[+-]?\d+";
const FLOAT_PATTERN: &str = r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";

fn builtins() -> Vec<ParamType> {
    let integral = vec![INT_PATTERN.to_owned()];
    let floating = vec![FLOAT_PATTERN.to_owned()];

    vec![
        ParamType::new("int", ParamKind::Int, integral.clone(), Rc::new(
            |g: &[Option<&str>]| parsed(g).map(StepValue::Int),
        )),
        ParamType::new("long", ParamKind::Long, integral.clone(), Rc::new(
            |g: &[Option<&str>]| parsed(g).map(StepValue::Long),
        )),
        ParamType::new("byte", ParamKind::Byte, integral.clone(), Rc::new(
            |g: &[Option<&str>]| parsed(g).map(StepValue::Byte),
        )),
        ParamType::new("short", ParamKind::Short, integral.clone(), Rc::new(
            |g: &[Option<&str>]| parsed(g).map(StepValue::Short),
        )),
        ParamType::new(
            "biginteger",
            ParamKind::BigInteger,
            integral,
            Rc::new(|g: &[Option<&str>]| {
                let raw = first_group(g)?;
                BigInt::from_str(raw).map(StepValue::BigInteger).map_err(
                    |e| {
                        TransformError::new(format!(
                            "cannot transform `{raw}`: {e}",
                        ))
                    },
                )
            }),
        ),
        ParamType::new("float", ParamKind::Float, floating.clone(), Rc::new(
            |g: &[Option<&str>]| parsed(g).map(StepValue::Float),
        )),
        ParamType::new(
            "double",
            ParamKind::Double,
            floating.clone(),
            Rc::new(|g: &[Option<&str>]| parsed(g).map(StepValue::Double)),
        ),
        ParamType::new(
            "bigdecimal",
            ParamKind::BigDecimal,
            floating,
            Rc::new(|g: &[Option<&str>]| {
                let raw = first_group(g)?;
                BigDecimal::from_str(raw)
                    .map(StepValue::BigDecimal)
                    .map_err(|e| {
                        TransformError::new(format!(
                            "cannot transform `{raw}`: {e}",
                        ))
                    })
            }),
        ),
        ParamType::new(
            "string",
            ParamKind::String,
            vec![
                r#""[^"\\]*(?:\\.[^"\\]*)*""#.to_owned(),
                r"'[^'\\]*(?:\\.[^'\\]*)*'".to_owned(),
            ],
            Rc::new(|g: &[Option<&str>]| {
                // Quotes were stripped by the matcher; unescape the rest.
                let raw = first_group(g)?;
                Ok(StepValue::String(
                    raw.replace("\\\"", "\"").replace("\\'", "'"),
                ))
            }),
        ),
        ParamType::new(
            "word",
            ParamKind::Word,
            vec![r"[^\s]+".to_owned()],
            Rc::new(|g: &[Option<&str>]| {
                first_group(g).map(|s| StepValue::String(s.to_owned()))
            }),
        ),
        ParamType::new(
            "",
            ParamKind::Anonymous,
            vec![r".*".to_owned()],
            Rc::new(|g: &[Option<&str>]| {
                first_group(g).map(|s| StepValue::String(s.to_owned()))
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(name: &str, raw: &str) -> StepValue {
        let registry = ParamTypeRegistry::new();
        registry.get(name).unwrap().transform(&[Some(raw)]).unwrap()
    }

    #[test]
    fn all_builtins_are_registered() {
        let registry = ParamTypeRegistry::new();
        for name in [
            "int",
            "long",
            "byte",
            "short",
            "biginteger",
            "float",
            "double",
            "bigdecimal",
            "string",
            "word",
            "",
        ] {
            assert!(registry.get(name).is_some(), "missing {{{name}}}");
        }
    }

    #[test]
    fn integral_transformers_produce_typed_values() {
        assert!(matches!(transform("int", "-42"), StepValue::Int(-42)));
        assert!(matches!(transform("long", "+7"), StepValue::Long(7)));
        assert!(matches!(transform("byte", "-8"), StepValue::Byte(-8)));
        assert!(matches!(transform("short", "300"), StepValue::Short(300)));
        assert!(matches!(
            transform("biginteger", "123456789012345678901234567890"),
            StepValue::BigInteger(_),
        ));
    }

    #[test]
    fn floating_transformers_accept_exponents() {
        assert!(
            matches!(transform("double", "1.5e3"), StepValue::Double(v) if (v - 1500.0).abs() < f64::EPSILON),
        );
        assert!(matches!(transform("float", ".25"), StepValue::Float(_)));
        assert!(matches!(
            transform("bigdecimal", "3.14159"),
            StepValue::BigDecimal(_),
        ));
    }

    #[test]
    fn transformer_failure_is_an_error() {
        let registry = ParamTypeRegistry::new();
        let err =
            registry.get("byte").unwrap().transform(&[Some("4096")]);
        assert!(err.is_err());
    }

    #[test]
    fn custom_without_transformer_boxes_the_raw_text() {
        let mut registry = ParamTypeRegistry::new();
        registry.register_custom(
            "color",
            vec!["red|green|blue".to_owned()],
            None,
        );

        let value = registry
            .get("color")
            .unwrap()
            .transform(&[Some("green")])
            .unwrap();
        match value {
            StepValue::Custom { name, value } => {
                assert_eq!(name, "color");
                assert_eq!(
                    value.downcast_ref::<String>().unwrap(),
                    "green",
                );
            }
            other => panic!("expected custom value, got {other:?}"),
        }
    }

    #[test]
    fn custom_entries_exclude_builtins() {
        let mut registry = ParamTypeRegistry::new();
        registry.register_custom("color", vec!["red".to_owned()], None);

        let customs: Vec<_> =
            registry.custom_entries().map(ParamType::name).collect();
        assert_eq!(customs, ["color"]);
    }

    #[test]
    fn group_counting_skips_non_capturing_groups() {
        assert_eq!(count_groups(r"(a)(?:b)(\()"), 2);
        assert_eq!(count_groups(r"\(a\)"), 0);
    }
}
