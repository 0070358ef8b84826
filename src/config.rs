//! Runner configuration record.
//!
//! The core receives this as already-parsed data; reading and parsing a
//! config file (JSON5 or otherwise) is a collaborator concern.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigurationError;

/// World construction mode.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum WorldMode {
    /// A fresh world per scenario (the default).
    #[default]
    PerScenario,

    /// One world per feature.
    PerFeature,

    /// Explicit mode per feature file.
    PerFile(HashMap<String, String>),
}

impl WorldMode {
    /// Parses the string form of a mode.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnknownMode`] for anything but
    /// `per-scenario` and `per-feature`.
    pub fn parse(mode: &str) -> Result<Self, ConfigurationError> {
        match mode {
            "per-scenario" => Ok(Self::PerScenario),
            "per-feature" => Ok(Self::PerFeature),
            other => Err(ConfigurationError::UnknownMode(other.to_owned())),
        }
    }
}

/// Step-definition related configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct StepsConfig {
    /// Where generated step skeletons go.
    pub output: Option<String>,

    /// Glob patterns of sources to exclude from scanning.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// One configured formatter.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct FormatterConfig {
    /// Formatter kind (`pretty`, `junit`, `messages`, …).
    #[serde(rename = "type")]
    pub ty: String,

    /// Output path; stdout when absent.
    pub output: Option<String>,

    /// Disables ANSI colouring for formatters that support it.
    pub no_color: Option<bool>,
}

/// Parsed runner configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct MoonspecConfig {
    /// Name of the world type to run against.
    pub world: Option<String>,

    /// World construction mode.
    #[serde(default)]
    pub mode: WorldMode,

    /// Step-definition configuration.
    pub steps: Option<StepsConfig>,

    /// Configured formatters.
    #[serde(default)]
    pub formatters: Vec<FormatterConfig>,
}
