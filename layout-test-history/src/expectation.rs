//! Comparison of a test's actual outcomes against its expected outcomes, following layout test
//! expectation semantics.

use std::collections::BTreeSet;

/// The expectation of a test that declares none.
const DEFAULT_EXPECTED: &str = "PASS";

/// Actual outcomes that an expected `FAIL` covers.
const COVERED_BY_FAIL: &[&str] = &["TEXT", "IMAGE+TEXT", "AUDIO"];

const FAIL: &str = "FAIL";

/// Whether a result is what its expectations called for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Classification {
    /// There is no data to classify.
    Unknown,
    Matched,
    Mismatched,
}

/// Splits a composite outcome string like `TEXT CRASH` or `[ TEXT PASS ]` into its tokens.
fn tokens(outcomes: &str) -> impl Iterator<Item = &str> {
    outcomes
        .split(|c: char| c.is_whitespace() || c == '[' || c == ']')
        .filter(|token| !token.is_empty())
}

/// Classifies `actual` outcomes against `expected` ones. Every actual token must be expected for
/// a match.
pub(crate) fn classify(actual: &str, expected: Option<&str>) -> Classification {
    let expected = tokens(expected.unwrap_or(DEFAULT_EXPECTED)).collect::<BTreeSet<_>>();
    let is_expected = |token: &str| {
        expected.contains(token) || (COVERED_BY_FAIL.contains(&token) && expected.contains(FAIL))
    };
    if tokens(actual).all(is_expected) {
        Classification::Matched
    } else {
        Classification::Mismatched
    }
}

#[test]
fn split_tokens() {
    assert_eq!(tokens("TEXT CRASH").collect::<Vec<_>>(), ["TEXT", "CRASH"]);
    assert_eq!(tokens("[ TEXT  PASS ]").collect::<Vec<_>>(), ["TEXT", "PASS"]);
    assert_eq!(tokens("[IMAGE+TEXT]").collect::<Vec<_>>(), ["IMAGE+TEXT"]);
    assert_eq!(tokens("").count(), 0);
}

#[test]
fn classify_outcomes() {
    use Classification::*;

    assert_eq!(classify("TEXT", Some("FAIL")), Matched);
    assert_eq!(classify("IMAGE+TEXT", Some("FAIL")), Matched);
    assert_eq!(classify("AUDIO", Some("[ FAIL PASS ]")), Matched);
    assert_eq!(
        classify("IMAGE", Some("FAIL")),
        Mismatched,
        "`FAIL` only covers `TEXT`, `IMAGE+TEXT`, and `AUDIO`"
    );
    assert_eq!(classify("CRASH", Some("FAIL")), Mismatched);

    assert_eq!(classify("TEXT CRASH", Some("TEXT CRASH TIMEOUT")), Matched);
    assert_eq!(classify("TEXT CRASH", Some("TEXT")), Mismatched);
    assert_eq!(classify("TEXT CRASH", Some("FAIL CRASH")), Matched);
    assert_eq!(classify("TIMEOUT", Some("[ TIMEOUT ]")), Matched);

    assert_eq!(classify("PASS", None), Matched);
    assert_eq!(classify("TEXT", None), Mismatched);
}
