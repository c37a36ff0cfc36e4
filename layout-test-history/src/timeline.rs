use std::{collections::BTreeMap, ops::RangeInclusive};

use full_results::{
    snapshot::{ResultLeaf, Snapshot},
    test_name::TestName,
};

use miette::Report;

use crate::{snapshots::SnapshotPath, AlreadyReportedToCommandline};

/// The `actual` outcome that snapshots use for tests that were not run.
const SKIP: &str = "SKIP";

/// A test's outcome(s) as reported by a single snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ResultRecord {
    pub actual: String,
    pub expected: Option<String>,
}

/// What a snapshot recorded about a test at its revision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Recorded {
    /// The test was flagged with outcome(s) in the snapshot.
    Flagged(ResultRecord),
    /// The snapshot had a record for this revision, but did not flag the test: it matched its
    /// expectations, did not exist yet, or was skipped.
    NotFlagged,
}

/// The history of a single test, keyed by revision.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    entries: BTreeMap<u64, Recorded>,
}

impl Timeline {
    pub fn get(&self, revision: u64) -> Option<&Recorded> {
        self.entries.get(&revision)
    }

    /// The range of revisions between the first and last records, or [`None`] if there are no
    /// records at all.
    pub fn revision_range(&self) -> Option<RangeInclusive<u64>> {
        let (&first, _) = self.entries.first_key_value()?;
        let (&last, _) = self.entries.last_key_value()?;
        Some(first..=last)
    }

    /// Records `recorded` at `revision`, replacing (and returning) anything recorded before.
    pub fn insert(&mut self, revision: u64, recorded: Recorded) -> Option<Recorded> {
        self.entries.insert(revision, recorded)
    }

    /// Records what `snapshot` reports about `test_name`.
    ///
    /// The revision embedded in the snapshot is trusted over the one in its file name. Snapshots
    /// recorded later win over earlier ones for the same revision.
    ///
    /// If the results for `test_name` are malformed, nothing is recorded for this snapshot. This
    /// function reports to `log` automatically, so no meaningful [`Err`] value is returned.
    pub fn record_snapshot(
        &mut self,
        test_name: &TestName,
        source: &SnapshotPath,
        snapshot: &Snapshot,
    ) -> Result<(), AlreadyReportedToCommandline> {
        let SnapshotPath {
            path,
            file_name_revision,
        } = source;
        let revision = snapshot.revision;

        if revision != *file_name_revision {
            log::warn!(
                concat!(
                    "{} is named for revision {}, but contains results for revision {}; ",
                    "trusting its contents"
                ),
                path.display(),
                file_name_revision,
                revision,
            );
        }

        let leaf = snapshot.lookup(test_name).map_err(|e| {
            log::error!(
                "{:?}",
                Report::new(e).wrap_err(format!("failed to read results from {}", path.display()))
            );
            AlreadyReportedToCommandline
        })?;
        let recorded = match leaf {
            Some(ResultLeaf { actual, .. }) if actual.trim() == SKIP => Recorded::NotFlagged,
            Some(ResultLeaf { actual, expected }) => {
                Recorded::Flagged(ResultRecord { actual, expected })
            }
            None => Recorded::NotFlagged,
        };
        log::trace!("r{revision}: {recorded:?}");

        if self.insert(revision, recorded).is_some() {
            log::warn!(
                "found results for revision {revision} more than once; {} replaces them",
                path.display()
            );
        }
        Ok(())
    }
}

impl FromIterator<(u64, Recorded)> for Timeline {
    fn from_iter<T: IntoIterator<Item = (u64, Recorded)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
fn snapshot(revision: u64, tests: &str) -> Snapshot {
    use full_results::envelope::Envelope;

    Snapshot::parse(
        &format!(r#"ADD_RESULTS({{"revision": "{revision}", "tests": {tests}}});"#),
        Envelope::ADD_RESULTS,
    )
    .unwrap()
}

#[cfg(test)]
fn source(file_name_revision: u64) -> SnapshotPath {
    SnapshotPath {
        path: format!("Webkit_Linux_full_results_r{file_name_revision}_b1.json").into(),
        file_name_revision,
    }
}

#[cfg(test)]
fn record(timeline: &mut Timeline, test_name: &str, source: SnapshotPath, snapshot: Snapshot) {
    timeline
        .record_snapshot(&test_name.parse().unwrap(), &source, &snapshot)
        .unwrap()
}

#[test]
fn record_snapshots() {
    let test_name = "fast/dom/a.html";
    let mut timeline = Timeline::default();

    record(
        &mut timeline,
        test_name,
        source(10),
        snapshot(
            10,
            r#"{"fast": {"dom": {"a.html": {"actual": "TEXT", "expected": "PASS"}}}}"#,
        ),
    );
    record(
        &mut timeline,
        test_name,
        source(12),
        snapshot(12, r#"{"fast": {"dom": {"b.html": {"actual": "TEXT"}}}}"#),
    );
    record(
        &mut timeline,
        test_name,
        source(13),
        snapshot(13, r#"{"fast": {"dom": {"a.html": {"actual": "SKIP"}}}}"#),
    );

    assert_eq!(timeline.revision_range(), Some(10..=13));
    assert_eq!(
        timeline.get(10),
        Some(&Recorded::Flagged(ResultRecord {
            actual: "TEXT".to_owned(),
            expected: Some("PASS".to_owned()),
        }))
    );
    assert_eq!(timeline.get(11), None);
    assert_eq!(
        timeline.get(12),
        Some(&Recorded::NotFlagged),
        "a test missing from a snapshot was not flagged"
    );
    assert_eq!(timeline.get(13), Some(&Recorded::NotFlagged));
}

#[test]
fn embedded_revision_wins() {
    let mut timeline = Timeline::default();

    record(
        &mut timeline,
        "fast/a.html",
        source(5),
        snapshot(6, r#"{"fast": {"a.html": {"actual": "CRASH"}}}"#),
    );

    assert_eq!(timeline.revision_range(), Some(6..=6));
    assert_eq!(timeline.get(5), None);
}

#[test]
fn last_snapshot_wins() {
    let mut timeline = Timeline::default();

    record(
        &mut timeline,
        "fast/a.html",
        source(5),
        snapshot(5, r#"{"fast": {"a.html": {"actual": "CRASH"}}}"#),
    );
    record(&mut timeline, "fast/a.html", source(5), snapshot(5, "{}"));

    assert_eq!(timeline.get(5), Some(&Recorded::NotFlagged));
}

#[test]
fn malformed_results_are_not_recorded() {
    let test_name = "fast/a.html".parse().unwrap();
    let mut timeline = Timeline::default();

    let res = timeline.record_snapshot(
        &test_name,
        &source(5),
        &snapshot(5, r#"{"fast": {"a.html": {"actual": ["TEXT"]}}}"#),
    );
    assert!(res.is_err());
    assert_eq!(timeline.revision_range(), None);

    record(
        &mut timeline,
        "fast/a.html",
        source(6),
        snapshot(
            6,
            r#"{"fast": {"a.html": {"actual": "CRASH"}, "b.html": {"actual": 3}}}"#,
        ),
    );
    assert!(matches!(timeline.get(6), Some(Recorded::Flagged(_))));
}

#[test]
fn empty_timeline_has_no_range() {
    assert_eq!(Timeline::default().revision_range(), None);
}
