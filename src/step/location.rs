//! Source-location tracking for step definitions and hooks.

use derive_more::Display;

/// Location of a registration call site, captured via
/// [`#[track_caller]`](macro@std::panic::Location) on the [`Setup`]
/// registration methods.
///
/// [`Setup`]: crate::setup::Setup
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display(fmt = "{}:{}:{}", path, line, column)]
pub struct Location {
    /// Path to the file the registration happened in.
    pub path: &'static str,

    /// Line of the registration call.
    pub line: u32,

    /// Column of the registration call.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`].
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// Captures the caller's location.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self::new(loc.file(), loc.line(), loc.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_points_into_this_file() {
        let loc = Location::caller();
        assert!(loc.path.ends_with("location.rs"));
        assert!(loc.line > 0);
    }

    #[test]
    fn display_is_path_line_column() {
        let loc = Location::new("src/steps.rs", 12, 5);
        assert_eq!(loc.to_string(), "src/steps.rs:12:5");
    }
}
