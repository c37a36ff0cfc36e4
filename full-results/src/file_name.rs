//! Naming scheme of snapshot files, i.e., `<bot>_full_results_r<revision>_b<build>.json`.

use std::fmt::{self, Display, Formatter};

const REVISION_MARKER: &str = "_full_results_r";
const BUILD_MARKER: &str = "_b";
const EXTENSION: &str = ".json";

/// The components of a snapshot file name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SnapshotFileName<'a> {
    pub bot_name: &'a str,
    pub revision: u64,
    pub build_number: u64,
}

impl<'a> SnapshotFileName<'a> {
    /// A glob matching (a superset of) snapshot file names, suitable for enumerating a directory.
    pub const GLOB: &'static str = "*_full_results_r*_b*.json";

    pub fn parse(file_name: &'a str) -> Result<Self, SnapshotFileNameError<'a>> {
        let err = || SnapshotFileNameError { file_name };

        let stem = file_name.strip_suffix(EXTENSION).ok_or_else(err)?;
        let (rest, build_number) = stem.rsplit_once(BUILD_MARKER).ok_or_else(err)?;
        let (bot_name, revision) = rest.rsplit_once(REVISION_MARKER).ok_or_else(err)?;

        if bot_name.is_empty() {
            return Err(err());
        }

        let parse_number = |digits: &str| {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse::<u64>().ok()
        };

        Ok(Self {
            bot_name,
            revision: parse_number(revision).ok_or_else(err)?,
            build_number: parse_number(build_number).ok_or_else(err)?,
        })
    }
}

impl Display for SnapshotFileName<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            bot_name,
            revision,
            build_number,
        } = self;
        write!(
            f,
            "{bot_name}{REVISION_MARKER}{revision}{BUILD_MARKER}{build_number}{EXTENSION}"
        )
    }
}

/// An error encountered during [`SnapshotFileName::parse`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotFileNameError<'a> {
    file_name: &'a str,
}

impl Display for SnapshotFileNameError<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self { file_name } = self;
        write!(
            f,
            concat!(
                "file name {:?} does not match ",
                "`<bot>_full_results_r<revision>_b<build>.json`"
            ),
            file_name
        )
    }
}

impl std::error::Error for SnapshotFileNameError<'_> {}

#[test]
fn parse_snapshot_file_name() {
    assert_eq!(
        SnapshotFileName::parse("Webkit_Linux_full_results_r12345_b678.json").unwrap(),
        SnapshotFileName {
            bot_name: "Webkit_Linux",
            revision: 12345,
            build_number: 678,
        }
    );
    assert_eq!(
        SnapshotFileName::parse("Webkit_Linux_bot_full_results_r1_b2.json").unwrap(),
        SnapshotFileName {
            bot_name: "Webkit_Linux_bot",
            revision: 1,
            build_number: 2,
        },
        "`_b` in a bot name should not be mistaken for the build number"
    );

    let name = "Webkit_Mac10.6_full_results_r99_b0.json";
    assert_eq!(SnapshotFileName::parse(name).unwrap().to_string(), name);
}

#[test]
fn reject_snapshot_file_name() {
    for name in [
        "Webkit_Linux_full_results_r12345_b678.json.txt",
        "Webkit_Linux_full_results_r12345.json",
        "Webkit_Linux_full_results_r_b678.json",
        "Webkit_Linux_full_results_rHEAD_b678.json",
        "Webkit_Linux_full_results_r+1_b678.json",
        "Webkit_Linux_full_results_r1_b.json",
        "_full_results_r1_b2.json",
        "full_results.json",
    ] {
        assert_eq!(
            SnapshotFileName::parse(name),
            Err(SnapshotFileNameError { file_name: name }),
            "{name:?} should have been rejected"
        );
    }
}
