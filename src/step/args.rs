//! Typed extraction of matched step arguments.

use bigdecimal::BigDecimal;
use derive_more::{Deref, Display, Error};
use num_bigint::BigInt;

use crate::{
    expression::{StepArg, StepValue},
    pickle::DataTable,
};

/// Error of converting a [`StepArg`] into a typed value.
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "{}", message)]
pub struct StepArgError {
    /// Conversion diagnostic.
    pub message: String,
}

impl StepArgError {
    /// Creates a new [`StepArgError`].
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    fn parse_failure(expected: &str, raw: &str) -> Self {
        Self::new(format!("cannot parse `{raw}` as {expected}"))
    }
}

/// A step's DocString block, extractable as a typed argument.
#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct DocString(pub String);

/// Conversion from a matched [`StepArg`] into a concrete Rust type, used
/// by the arity-suffixed [`Setup`] registration façade.
///
/// [`Setup`]: crate::setup::Setup
pub trait FromStepArg: Sized {
    /// Converts the argument.
    ///
    /// # Errors
    ///
    /// If the argument's value or raw text does not fit the target type.
    fn from_step_arg(arg: &StepArg) -> Result<Self, StepArgError>;
}

macro_rules! impl_from_step_arg_parse {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl FromStepArg for $ty {
            fn from_step_arg(arg: &StepArg) -> Result<Self, StepArgError> {
                arg.raw
                    .parse()
                    .map_err(|_| StepArgError::parse_failure($name, &arg.raw))
            }
        }
    )*};
}

impl_from_step_arg_parse! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    bool => "bool",
    BigInt => "biginteger",
    BigDecimal => "bigdecimal",
}

impl FromStepArg for String {
    fn from_step_arg(arg: &StepArg) -> Result<Self, StepArgError> {
        // Prefer the transformed value so `{string}` arrives unquoted.
        Ok(match &arg.value {
            StepValue::String(s) | StepValue::DocString(s) => s.clone(),
            _ => arg.raw.clone(),
        })
    }
}

impl FromStepArg for DataTable {
    fn from_step_arg(arg: &StepArg) -> Result<Self, StepArgError> {
        match &arg.value {
            StepValue::DataTable(table) => Ok(table.clone()),
            _ => Err(StepArgError::new("step has no data table argument")),
        }
    }
}

impl FromStepArg for DocString {
    fn from_step_arg(arg: &StepArg) -> Result<Self, StepArgError> {
        match &arg.value {
            StepValue::DocString(content) => Ok(Self(content.clone())),
            _ => Err(StepArgError::new("step has no DocString argument")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(value: StepValue, raw: &str) -> StepArg {
        StepArg { value, raw: raw.to_owned() }
    }

    #[test]
    fn numeric_conversions_parse_the_raw_text() {
        let a = arg(StepValue::Int(5), "5");
        assert_eq!(i32::from_step_arg(&a).unwrap(), 5);
        assert_eq!(u64::from_step_arg(&a).unwrap(), 5);
        assert_eq!(f64::from_step_arg(&a).unwrap(), 5.0);
    }

    #[test]
    fn numeric_overflow_is_an_error() {
        let a = arg(StepValue::Int(4096), "4096");
        assert!(i8::from_step_arg(&a).is_err());
    }

    #[test]
    fn string_conversion_prefers_the_transformed_value() {
        let a = arg(
            StepValue::String("hello".to_owned()),
            "\"hello\"",
        );
        assert_eq!(String::from_step_arg(&a).unwrap(), "hello");
    }

    #[test]
    fn table_and_docstring_require_matching_values() {
        let table = arg(
            StepValue::DataTable(DataTable::from(vec![vec!["a"]])),
            "",
        );
        assert!(DataTable::from_step_arg(&table).is_ok());
        assert!(DocString::from_step_arg(&table).is_err());

        let doc = arg(StepValue::DocString("body".to_owned()), "");
        assert_eq!(DocString::from_step_arg(&doc).unwrap().0, "body");
        assert!(DataTable::from_step_arg(&doc).is_err());
    }

    #[test]
    fn bignum_conversions() {
        let a = arg(
            StepValue::String("123456789012345678901234567890".into()),
            "123456789012345678901234567890",
        );
        assert!(BigInt::from_step_arg(&a).is_ok());
        let d = arg(StepValue::String("1.5".into()), "1.5");
        assert!(BigDecimal::from_step_arg(&d).is_ok());
    }
}
