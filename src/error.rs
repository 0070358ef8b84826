//! Error taxonomy of the crate.
//!
//! Only a [`ConfigurationError`] ever escapes [`run()`]: step and hook
//! failures are trapped at the executor boundary and surface as statuses
//! and envelopes instead.
//!
//! [`run()`]: crate::run

use derive_more::{Display, Error, From};

use crate::result::RunResult;

/// Error of invalid [`RunOptions`] or glue registration, reported
/// synchronously when [`run()`] is called.
///
/// [`RunOptions`]: crate::RunOptions
/// [`run()`]: crate::run
#[derive(Clone, Debug, Display, Error)]
pub enum ConfigurationError {
    /// Tag expression failed to parse.
    #[display(fmt = "invalid tag expression `{}`: {}", expression, message)]
    InvalidTagExpression {
        /// Original expression text.
        expression: String,

        /// Parser diagnostic.
        message: String,
    },

    /// Cucumber Expression pattern failed to compile.
    #[display(fmt = "invalid step pattern `{}`: {}", pattern, message)]
    InvalidStepPattern {
        /// Original pattern text.
        pattern: String,

        /// Compiler diagnostic.
        message: String,
    },

    /// Pattern references a parameter type absent from the registry.
    #[display(
        fmt = "unknown parameter type {{{}}} in pattern `{}`",
        name,
        pattern
    )]
    UnknownParameterType {
        /// Name of the missing parameter type.
        name: String,

        /// Pattern referencing it.
        pattern: String,
    },

    /// Parallel mode was requested with a zero concurrency bound.
    #[display(fmt = "`max_concurrent` must be positive in parallel mode")]
    ZeroConcurrency,

    /// Unrecognised world mode value in a [`MoonspecConfig`].
    ///
    /// [`MoonspecConfig`]: crate::config::MoonspecConfig
    #[display(fmt = "unknown world mode `{}`", _0)]
    UnknownMode(#[error(not(source))] String),
}

/// Error returned by [`run_or_fail()`] for callers preferring
/// abort-on-failure semantics.
///
/// [`run_or_fail()`]: crate::run_or_fail
#[derive(Debug, Display, Error, From)]
pub enum RunError {
    /// Invalid options or glue registration.
    #[display(fmt = "{}", _0)]
    Configuration(ConfigurationError),

    /// The run completed, but with failed, undefined or pending scenarios,
    /// or with parse errors.
    #[display(fmt = "test run failed: {}", "_0.summary")]
    Failed(#[error(not(source))] RunResult),
}

impl RunError {
    /// Returns the [`RunResult`], if the run got far enough to produce one.
    #[must_use]
    pub fn into_result(self) -> Option<RunResult> {
        match self {
            Self::Configuration(_) => None,
            Self::Failed(res) => Some(res),
        }
    }
}
