//! The contents of a single `full_results` snapshot.

#[cfg(test)]
use insta::{assert_debug_snapshot, assert_snapshot};

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{
    de::{Deserializer, Error},
    Deserialize,
};
use serde_json::Value;

use crate::{
    envelope::{Envelope, EnvelopeError},
    test_name::TestName,
};

/// A bot's recorded test outcomes for a single build at a single revision.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    #[serde(deserialize_with = "revision_from_number_or_string")]
    pub revision: u64,
    pub tests: TestTree,
}

/// Children of a directory in a [`Snapshot`]'s test hierarchy, keyed by path segment.
///
/// Nodes are kept as raw JSON. Only the leaf of a test that is [looked up](Snapshot::lookup) is
/// validated, so that a malformed entry elsewhere in the tree does not prevent reading the rest.
pub type TestTree = IndexMap<String, Value>;

/// The outcome(s) recorded for a single test.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ResultLeaf {
    /// One or more space-separated outcomes, e.g., `TEXT` or `TEXT CRASH`.
    pub actual: String,
    /// Outcomes that were declared acceptable for this test, if any were recorded.
    #[serde(default)]
    pub expected: Option<String>,
}

impl Snapshot {
    /// Strips `envelope` from `contents`, and parses what remains.
    pub fn parse(contents: &str, envelope: Envelope) -> Result<Self, SnapshotParseError> {
        let json = envelope.strip(contents)?;
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the results for `test_name`, if this snapshot has any.
    ///
    /// A node is a leaf if it has an `actual` member. Leaves have no children.
    pub fn lookup(&self, test_name: &TestName) -> Result<Option<ResultLeaf>, LeafParseError> {
        let is_leaf = |node: &Value| node.get("actual").is_some();

        let mut segments = test_name.segments();
        let Some(mut node) = segments.next().and_then(|first| self.tests.get(first)) else {
            return Ok(None);
        };
        for segment in segments {
            if is_leaf(node) {
                return Ok(None);
            }
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        if !is_leaf(node) {
            return Ok(None);
        }

        ResultLeaf::deserialize(node)
            .map(Some)
            .map_err(|source| LeafParseError {
                test_name: test_name.to_string(),
                source,
            })
    }
}

fn revision_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(revision) => Ok(revision),
        NumberOrString::String(revision) => revision.trim().parse().map_err(|e| {
            D::Error::custom(format!("`revision` {revision:?} is not a number: {e}"))
        }),
    }
}

/// An error encountered during [`Snapshot::parse`].
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum SnapshotParseError {
    #[error("failed to strip envelope")]
    Envelope(#[from] EnvelopeError),
    #[error("failed to parse JSON")]
    Json(#[from] serde_json::Error),
}

/// An error encountered during [`Snapshot::lookup`], when the requested test's results do not
/// have the expected shape.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("results for `{test_name}` are malformed")]
pub struct LeafParseError {
    pub test_name: String,
    #[source]
    pub source: serde_json::Error,
}

#[cfg(test)]
fn parse(contents: &str) -> Snapshot {
    Snapshot::parse(contents, Envelope::ADD_RESULTS).unwrap()
}

#[test]
fn parse_snapshot() {
    let snapshot = parse(
        r#"ADD_RESULTS({
    "revision": "80123",
    "version": 3,
    "tests": {
        "fast": {
            "dom": {
                "node-removal.html": {"actual": "TEXT CRASH", "expected": "FAIL", "time_ms": 12},
                "timeout.html": {"actual": "TIMEOUT"}
            }
        }
    }
});"#,
    );
    assert_eq!(snapshot.revision, 80123);
    assert_eq!(snapshot.tests.keys().collect::<Vec<_>>(), ["fast"]);
    assert_debug_snapshot!(
        snapshot.lookup(&"fast/dom/node-removal.html".parse().unwrap()).unwrap(),
        @r###"
    Some(
        ResultLeaf {
            actual: "TEXT CRASH",
            expected: Some(
                "FAIL",
            ),
        },
    )
    "###
    );
}

#[test]
fn parse_numeric_revision() {
    assert_eq!(
        parse(r#"ADD_RESULTS({"revision": 42, "tests": {}});"#).revision,
        42
    );
}

#[test]
fn reject_malformed_snapshot() {
    let parse = |contents| Snapshot::parse(contents, Envelope::ADD_RESULTS);

    assert!(matches!(
        parse(r#"{"revision": 1, "tests": {}}"#),
        Err(SnapshotParseError::Envelope(EnvelopeError::MissingPrefix { .. }))
    ));
    assert!(matches!(
        parse(r#"ADD_RESULTS({"revision": "r1", "tests": {}});"#),
        Err(SnapshotParseError::Json(_))
    ));
    assert!(matches!(
        parse(r#"ADD_RESULTS({"tests": {}});"#),
        Err(SnapshotParseError::Json(_))
    ));
    assert!(matches!(
        parse(r#"ADD_RESULTS({"revision": 1});"#),
        Err(SnapshotParseError::Json(_))
    ));
}

#[test]
fn lookup_test() {
    let snapshot = parse(
        r#"ADD_RESULTS({
    "revision": "7",
    "tests": {
        "fast": {
            "dom": {
                "node-removal.html": {"actual": "IMAGE", "expected": "PASS"}
            },
            "leaf.html": {"actual": "PASS"}
        }
    }
});"#,
    );
    let lookup = |name: &str| snapshot.lookup(&name.parse().unwrap()).unwrap();

    assert_eq!(
        lookup("fast/dom/node-removal.html"),
        Some(ResultLeaf {
            actual: "IMAGE".to_owned(),
            expected: Some("PASS".to_owned()),
        })
    );
    assert_eq!(
        lookup("fast/leaf.html"),
        Some(ResultLeaf {
            actual: "PASS".to_owned(),
            expected: None,
        })
    );
    assert_eq!(lookup("fast/dom/missing.html"), None);
    assert_eq!(lookup("fast/leaf.html/deeper.html"), None, "leaves have no children");
    assert_eq!(lookup("fast/dom.html"), None);
    assert_eq!(lookup("slow/dom/node-removal.html"), None);
}

#[test]
fn lookup_ignores_malformed_siblings() {
    let snapshot = parse(
        r#"ADD_RESULTS({
    "revision": "3",
    "tests": {
        "fast": {
            "a.html": {"actual": "CRASH"},
            "b.html": {"expected": "PASS", "time": 0.5},
            "c.html": {"actual": ["TEXT"]},
            "d.html": 12
        }
    }
});"#,
    );
    let lookup = |name: &str| snapshot.lookup(&name.parse().unwrap());

    assert_eq!(
        lookup("fast/a.html").unwrap(),
        Some(ResultLeaf {
            actual: "CRASH".to_owned(),
            expected: None,
        })
    );
    assert_eq!(lookup("fast/b.html").unwrap(), None, "no `actual` member");
    assert_eq!(lookup("fast/d.html").unwrap(), None);

    let err = lookup("fast/c.html").unwrap_err();
    assert_eq!(err.test_name, "fast/c.html");
    assert_snapshot!(err, @"results for `fast/c.html` are malformed");
}
