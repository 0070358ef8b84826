//! Diagnostics for undefined steps: nearest-pattern suggestions and
//! registration snippets.

use itertools::Itertools as _;
use lazy_regex::regex;

use crate::pickle::PickleStepType;

/// How many nearest patterns an undefined-step diagnostic offers.
const MAX_SUGGESTIONS: usize = 3;

/// Levenshtein edit distance between two strings.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Ranks registered patterns by distance to the unmatched step text.
pub(crate) fn suggestions<'p>(
    text: &str,
    patterns: impl IntoIterator<Item = &'p str>,
) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| (edit_distance(text, p), p))
        .sorted_by_key(|(dist, _)| *dist)
        .take(MAX_SUGGESTIONS)
        .map(|(_, p)| p.to_owned())
        .collect()
}

/// Generates a registration skeleton for an unmatched step, with numbers
/// and quoted strings generalised to parameters.
pub(crate) fn snippet(text: &str, ty: PickleStepType) -> String {
    let method = match ty {
        PickleStepType::Context => "given",
        PickleStepType::Action => "when",
        PickleStepType::Outcome => "then",
        PickleStepType::Unknown => "step",
    };

    let pattern = regex!(r#""[^"]*"|'[^']*'"#)
        .replace_all(text, "{string}")
        .into_owned();
    let pattern = regex!(r"\d+\.\d+")
        .replace_all(&pattern, "{float}")
        .into_owned();
    let pattern =
        regex!(r"\d+").replace_all(&pattern, "{int}").into_owned();

    format!(
        "setup.{method}(\"{pattern}\", |world, ctx| {{\n    \
         anyhow::bail!(\"unimplemented step\")\n}});",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "abd"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn suggestions_are_ranked_and_capped() {
        let ranked = suggestions("I have 5 cucumbers", [
            "I have {int} cucumbers",
            "I eat {int} cucumbers",
            "the server is running",
            "I have {int} gherkins",
        ]);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0], "I have {int} cucumbers");
        assert!(!ranked.contains(&"the server is running".to_owned()));
    }

    #[test]
    fn snippet_generalises_numbers_and_strings() {
        let snip = snippet(
            r#"I pay 12.50 for 3 "green" cucumbers"#,
            PickleStepType::Action,
        );
        assert!(snip.contains(
            r#"setup.when("I pay {float} for {int} {string} cucumbers""#,
        ));
    }

    #[test]
    fn snippet_method_follows_step_type() {
        assert!(snippet("x", PickleStepType::Context).starts_with("setup.given("));
        assert!(snippet("x", PickleStepType::Unknown).starts_with("setup.step("));
    }
}
