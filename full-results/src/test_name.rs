//! Names of individual layout tests, e.g., `fast/dom/node-removal.html`.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use miette::Diagnostic;

/// A `/`-separated path to a single layout test, relative to the root of the layout test suite.
///
/// A valid name has at least two segments, and its last segment has a file extension.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestName(Utf8PathBuf);

impl TestName {
    pub fn as_str(&self) -> &str {
        let Self(path) = self;
        path.as_str()
    }

    /// Path segments of this name, from the outermost directory to the test file.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        let Self(path) = self;
        path.components().map(|component| component.as_str())
    }
}

impl FromStr for TestName {
    type Err = TestNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = Utf8Path::new(s);

        let mut num_segments = 0usize;
        for component in path.components() {
            match component {
                Utf8Component::Normal(_) => num_segments += 1,
                Utf8Component::Prefix(_)
                | Utf8Component::RootDir
                | Utf8Component::CurDir
                | Utf8Component::ParentDir => {
                    return Err(TestNameError::NotRelative { name: s.to_owned() })
                }
            }
        }

        if num_segments < 2 {
            return Err(TestNameError::TooFewSegments { name: s.to_owned() });
        }

        if path.extension().is_none_or(str::is_empty) {
            return Err(TestNameError::NoExtension { name: s.to_owned() });
        }

        Ok(Self(path.to_owned()))
    }
}

impl Display for TestName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error encountered while parsing a [`TestName`].
#[derive(Clone, Debug, Diagnostic, Eq, PartialEq, thiserror::Error)]
pub enum TestNameError {
    #[error("test name {name:?} has fewer than two path segments")]
    #[diagnostic(help("test names look like `fast/dom/node-removal.html`"))]
    TooFewSegments { name: String },
    #[error("the last segment of test name {name:?} has no file extension")]
    #[diagnostic(help("test names look like `fast/dom/node-removal.html`"))]
    NoExtension { name: String },
    #[error("test name {name:?} is not a relative path")]
    #[diagnostic(help(
        "test names are relative to the root of the layout test suite, and do not use `.` or `..`"
    ))]
    NotRelative { name: String },
}

#[test]
fn parse_test_name() {
    let name = "fast/dom/node-removal.html".parse::<TestName>().unwrap();
    assert_eq!(name.to_string(), "fast/dom/node-removal.html");
    assert_eq!(
        name.segments().collect::<Vec<_>>(),
        ["fast", "dom", "node-removal.html"]
    );

    let name = "fast/a.svg".parse::<TestName>().unwrap();
    assert_eq!(name.segments().collect::<Vec<_>>(), ["fast", "a.svg"]);
}

#[test]
fn reject_test_name() {
    let err = |s: &str| s.parse::<TestName>().unwrap_err();

    assert_eq!(
        err("node-removal.html"),
        TestNameError::TooFewSegments {
            name: "node-removal.html".to_owned()
        }
    );
    assert_eq!(
        err(""),
        TestNameError::TooFewSegments {
            name: "".to_owned()
        }
    );
    assert_eq!(
        err("fast/dom/node-removal"),
        TestNameError::NoExtension {
            name: "fast/dom/node-removal".to_owned()
        }
    );
    assert_eq!(
        err("fast/dom/node-removal."),
        TestNameError::NoExtension {
            name: "fast/dom/node-removal.".to_owned()
        }
    );
    assert_eq!(
        err("/fast/dom/node-removal.html"),
        TestNameError::NotRelative {
            name: "/fast/dom/node-removal.html".to_owned()
        }
    );
    assert_eq!(
        err("fast/../dom/node-removal.html"),
        TestNameError::NotRelative {
            name: "fast/../dom/node-removal.html".to_owned()
        }
    );
}
