//! Feature cache: parsed [`gherkin::Feature`]s keyed by URI.
//!
//! Loading never raises on malformed input. Parse and IO failures are
//! collected as [`ParseErrorInfo`] values so the rest of a run can
//! proceed, and they later surface both in [`RunResult::parse_errors`]
//! and as `ParseError` envelopes.
//!
//! [`RunResult::parse_errors`]: crate::result::RunResult::parse_errors

use std::{fs, path::PathBuf};

use derive_more::Display;
use gherkin::GherkinEnv;
use lazy_regex::regex_captures;
use linked_hash_map::LinkedHashMap;
use sealed::sealed;

/// One input of a run: where a feature comes from.
#[derive(Clone, Debug)]
pub enum FeatureSource {
    /// Inline Gherkin text with an explicit URI.
    Text {
        /// URI the feature is cached under.
        uri: String,

        /// Gherkin source text.
        content: String,
    },

    /// A `.feature` file read from disk; the path doubles as the URI.
    File {
        /// Path to the feature file.
        path: PathBuf,
    },

    /// A pre-parsed feature with an explicit URI.
    Parsed {
        /// URI the feature is cached under.
        uri: String,

        /// Parsed feature.
        feature: Box<gherkin::Feature>,
    },
}

/// Collected information about a feature that failed to load.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}: {}", uri, message)]
pub struct ParseErrorInfo {
    /// URI of the failed feature.
    pub uri: String,

    /// Parser or IO diagnostic.
    pub message: String,

    /// Source line of the failure, when the parser reported one.
    pub line: Option<usize>,
}

impl ParseErrorInfo {
    fn new(uri: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        // Gherkin diagnostics embed a `line:col` pair; keep the line around
        // for reporters that can point at the source.
        let line = regex_captures!(r"(\d+):\d+", &message)
            .and_then(|(_, line)| line.parse().ok());
        Self { uri: uri.into(), message, line }
    }
}

/// A cached feature together with what is needed to emit `Source`
/// envelopes for it.
#[derive(Clone, Debug)]
pub(crate) struct CachedFeature {
    /// Parsed AST.
    pub(crate) feature: gherkin::Feature,

    /// Original source text, when the feature was loaded from text or
    /// from a file.
    pub(crate) source: Option<String>,

    /// Gherkin dialect of the feature.
    pub(crate) language: String,
}

/// Insertion-ordered cache of parsed features, keyed by URI.
#[derive(Clone, Debug, Default)]
pub struct FeatureCache {
    entries: LinkedHashMap<String, CachedFeature>,
}

impl FeatureCache {
    /// Creates an empty [`FeatureCache`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and caches it under `uri`, replacing any previous
    /// entry for the same URI.
    ///
    /// # Errors
    ///
    /// On malformed Gherkin; the cache is left untouched.
    pub fn load_text(
        &mut self,
        uri: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), ParseErrorInfo> {
        let (uri, text) = (uri.into(), text.into());
        match gherkin::Feature::parse(&text, GherkinEnv::default()) {
            Ok(feature) => {
                let language = dialect_of(&text);
                log::debug!("cached feature `{uri}` from text ({language})");
                _ = self.entries.insert(uri, CachedFeature {
                    feature,
                    source: Some(text),
                    language,
                });
                Ok(())
            }
            Err(e) => Err(ParseErrorInfo::new(uri, e.to_string())),
        }
    }

    /// Reads and parses the file at `path`, caching it under the path's
    /// display form. A no-op when that URI is already cached.
    ///
    /// # Errors
    ///
    /// On read failure or malformed Gherkin; the cache is left untouched.
    pub fn load_file(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<(), ParseErrorInfo> {
        let path = path.into();
        let uri = path.display().to_string();
        if self.entries.contains_key(&uri) {
            return Ok(());
        }
        let text = fs::read_to_string(&path).map_err(|e| {
            ParseErrorInfo::new(&uri, format!("failed to read `{uri}`: {e}"))
        })?;
        self.load_text(uri, text)
    }

    /// Caches an already-parsed feature under `uri`, replacing any
    /// previous entry. Never fails.
    ///
    /// The parsed AST carries no dialect, so the feature is recorded as
    /// English; load from text to preserve a `# language:` pragma.
    pub fn load_parsed(
        &mut self,
        uri: impl Into<String>,
        feature: gherkin::Feature,
    ) {
        _ = self.entries.insert(uri.into(), CachedFeature {
            feature,
            source: None,
            language: "en".to_owned(),
        });
    }

    /// Dispatches on a [`FeatureSource`].
    ///
    /// # Errors
    ///
    /// See [`FeatureCache::load_text`] and [`FeatureCache::load_file`].
    pub fn load_from_source(
        &mut self,
        source: FeatureSource,
    ) -> Result<(), ParseErrorInfo> {
        match source {
            FeatureSource::Text { uri, content } => self.load_text(uri, content),
            FeatureSource::File { path } => self.load_file(path),
            FeatureSource::Parsed { uri, feature } => {
                self.load_parsed(uri, *feature);
                Ok(())
            }
        }
    }

    /// Cached `(uri, feature)` pairs in first-insertion order.
    pub fn features(
        &self,
    ) -> impl Iterator<Item = (&str, &gherkin::Feature)> + '_ {
        self.entries.iter().map(|(uri, e)| (uri.as_str(), &e.feature))
    }

    /// Full cache entries, for envelope emission.
    pub(crate) fn entries(
        &self,
    ) -> impl Iterator<Item = (&str, &CachedFeature)> + '_ {
        self.entries.iter().map(|(uri, e)| (uri.as_str(), e))
    }

    /// Returns the feature cached under `uri`, if any.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&gherkin::Feature> {
        self.entries.get(uri).map(|e| &e.feature)
    }

    /// Indicates whether `uri` is cached.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    /// Number of cached features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indicates whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads the dialect from a `# language: <code>` pragma in the feature
/// header. Only comment lines may precede the pragma; anything else ends
/// the header and the dialect defaults to English.
fn dialect_of(text: &str) -> String {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(comment) = trimmed.strip_prefix('#') else {
            break;
        };
        if let Some((key, value)) = comment.split_once(':') {
            if key.trim() == "language" {
                return value.trim().to_owned();
            }
        }
    }
    "en".to_owned()
}

/// Helper methods to operate on [`gherkin::Feature`]s.
#[sealed]
pub trait Ext {
    /// Counts all the feature's scenarios, including those nested under
    /// [`Rule`]s.
    ///
    /// [`Rule`]: gherkin::Rule
    #[must_use]
    fn count_scenarios(&self) -> usize;
}

#[sealed]
impl Ext for gherkin::Feature {
    fn count_scenarios(&self) -> usize {
        self.scenarios.len()
            + self.rules.iter().map(|r| r.scenarios.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const FEATURE: &str = "\
Feature: Basic
  Scenario: one
    Given a step
";

    const OTHER: &str = "\
Feature: Other
  Scenario: two
    Given another step
";

    #[test]
    fn load_text_caches_on_success() {
        let mut cache = FeatureCache::new();
        cache.load_text("basic.feature", FEATURE).unwrap();

        assert!(cache.contains("basic.feature"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("basic.feature").unwrap().name, "Basic");
    }

    #[test]
    fn load_text_overwrites_existing_uri() {
        let mut cache = FeatureCache::new();
        cache.load_text("f.feature", FEATURE).unwrap();
        cache.load_text("f.feature", OTHER).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("f.feature").unwrap().name, "Other");
    }

    #[test]
    fn load_text_failure_leaves_cache_untouched() {
        let mut cache = FeatureCache::new();
        let err = cache.load_text("bad.feature", "not gherkin").unwrap_err();

        assert_eq!(err.uri, "bad.feature");
        assert!(!cache.contains("bad.feature"));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_file_is_idempotent_per_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FEATURE.as_bytes()).unwrap();

        let mut cache = FeatureCache::new();
        cache.load_file(file.path()).unwrap();
        cache.load_file(file.path()).unwrap();

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn load_file_read_failure_is_collected() {
        let mut cache = FeatureCache::new();
        let err = cache.load_file("/nonexistent/feature/path").unwrap_err();

        assert!(err.message.contains("failed to read"));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_parsed_replaces_without_parsing() {
        let parsed =
            gherkin::Feature::parse(FEATURE, GherkinEnv::default()).unwrap();
        let mut cache = FeatureCache::new();
        cache.load_text("f.feature", OTHER).unwrap();
        cache.load_parsed("f.feature", parsed);

        assert_eq!(cache.get("f.feature").unwrap().name, "Basic");
    }

    #[test]
    fn features_preserve_insertion_order() {
        let mut cache = FeatureCache::new();
        cache.load_text("b.feature", OTHER).unwrap();
        cache.load_text("a.feature", FEATURE).unwrap();

        let uris: Vec<_> = cache.features().map(|(uri, _)| uri).collect();
        assert_eq!(uris, ["b.feature", "a.feature"]);
    }

    #[test]
    fn language_pragma_is_recorded() {
        let mut cache = FeatureCache::new();
        cache
            .load_text(
                "de.feature",
                "\
# language: de
Funktionalität: Auf Deutsch
  Szenario: eins
    Angenommen ein Schritt
",
            )
            .unwrap();

        let (_, entry) = cache.entries().next().unwrap();
        assert_eq!(entry.language, "de");
        assert_eq!(entry.feature.name, "Auf Deutsch");
    }

    #[test]
    fn dialect_defaults_to_english() {
        assert_eq!(dialect_of(FEATURE), "en");
        assert_eq!(
            dialect_of("# a comment\n# language: fr\nFonctionnalité: F\n"),
            "fr",
        );
        // A pragma after the header no longer counts.
        assert_eq!(dialect_of("Feature: F\n# language: fr\n"), "en");
    }

    #[test]
    fn count_scenarios_includes_rules() {
        let feature = gherkin::Feature::parse(
            "\
Feature: With rules
  Scenario: top
    Given a step

  Rule: grouping
    Scenario: nested
      Given a step
",
            GherkinEnv::default(),
        )
        .unwrap();

        assert_eq!(feature.count_scenarios(), 2);
    }
}
