use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use full_results::{
    envelope::Envelope,
    file_name::SnapshotFileName,
    snapshot::Snapshot,
};
use miette::Report;
use wax::Glob;

use crate::AlreadyReportedToCommandline;

#[cfg(test)]
use crate::timeline::{Recorded, ResultRecord, Timeline};

/// A snapshot file found by [`find_snapshot_files`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SnapshotPath {
    pub path: PathBuf,
    /// The revision encoded in the file's name, which may disagree with its contents.
    pub file_name_revision: u64,
}

/// Returns a "naturally" sorted list of snapshot files in `results_dir`, optionally
/// filtered to those uploaded by `bot`. Snapshots should be processed in this order.
///
/// This function reports to `log` automatically, so no meaningful [`Err`] value is returned.
pub(crate) fn find_snapshot_files(
    results_dir: &Path,
    bot: Option<&str>,
) -> Result<Vec<SnapshotPath>, AlreadyReportedToCommandline> {
    log::debug!(
        "searching for {} files in {}",
        SnapshotFileName::GLOB,
        results_dir.display()
    );

    if !results_dir.is_dir() {
        log::error!("{} is not a directory", results_dir.display());
        return Err(AlreadyReportedToCommandline);
    }

    let glob = Glob::new(SnapshotFileName::GLOB).map_err(|e| {
        log::error!("internal error: failed to build snapshot file glob: {e}");
        AlreadyReportedToCommandline
    })?;

    let mut found_walk_err = false;
    let mut paths = glob
        .walk(results_dir)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(e) => {
                found_walk_err = true;
                let path_disp = e.path().map(|p| format!(" at {}", p.display()));
                let path_disp: &dyn Display = match path_disp.as_ref() {
                    Some(disp) => disp,
                    None => &"",
                };
                log::error!("failed to enumerate snapshot files{path_disp}\n  caused by: {e}");
                None
            }
        })
        .collect::<Vec<_>>();

    if found_walk_err {
        log::error!(concat!(
            "failed to enumerate snapshot files, ",
            "see above for more details"
        ));
        return Err(AlreadyReportedToCommandline);
    }

    paths.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));

    let snapshots = paths
        .into_iter()
        .filter_map(|path| {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                log::warn!("skipping non-UTF-8 file name {}", path.display());
                return None;
            };
            let file_name = match SnapshotFileName::parse(file_name) {
                Ok(file_name) => file_name,
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    return None;
                }
            };
            if bot.is_some_and(|bot| bot != file_name.bot_name) {
                log::debug!("skipping {} from another bot", path.display());
                return None;
            }
            let file_name_revision = file_name.revision;
            Some(SnapshotPath {
                path,
                file_name_revision,
            })
        })
        .collect::<Vec<_>>();

    log::debug!(
        "working with the following snapshot files: {:#?}",
        snapshots.iter().map(|s| &s.path).collect::<Vec<_>>()
    );
    log::info!("working with {} snapshot file(s)", snapshots.len());

    Ok(snapshots)
}

/// Reads and parses each of `snapshot_paths` in order.
///
/// Errors are rendered to the command line as they are encountered, so iteration may continue
/// past them.
pub(crate) fn read_snapshots(
    snapshot_paths: Vec<SnapshotPath>,
    envelope: Envelope,
) -> impl Iterator<Item = Result<(SnapshotPath, Snapshot), AlreadyReportedToCommandline>> {
    snapshot_paths.into_iter().map(move |snapshot_path| {
        let path = &snapshot_path.path;
        log::debug!("reading from {}…", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            log::error!("failed to read {}: {e}", path.display());
            AlreadyReportedToCommandline
        })?;
        match Snapshot::parse(&contents, envelope) {
            Ok(snapshot) => Ok((snapshot_path, snapshot)),
            Err(e) => {
                let e = Report::new(e)
                    .wrap_err(format!("failed to parse snapshot at {}", path.display()));
                eprintln!("{e:?}");
                Err(AlreadyReportedToCommandline)
            }
        }
    })
}

#[cfg(test)]
fn results_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

#[cfg(test)]
fn file_names(snapshots: &[SnapshotPath]) -> Vec<&str> {
    snapshots
        .iter()
        .map(|snapshot| snapshot.path.file_name().unwrap().to_str().unwrap())
        .collect()
}

#[test]
fn find_snapshot_files_in_natural_order() {
    let dir = results_dir(&[
        ("bot_full_results_r100_b1.json", ""),
        ("bot_full_results_r99_b1.json", ""),
        ("bot_full_results_r99_b10.json", ""),
        ("bot_full_results_r99_b2.json", ""),
        ("other_full_results_r5_b1.json", ""),
        ("bot_full_results_rX_b1.json", ""),
        ("notes.txt", ""),
    ]);

    let all = find_snapshot_files(dir.path(), None).unwrap();
    assert_eq!(
        file_names(&all),
        [
            "bot_full_results_r99_b1.json",
            "bot_full_results_r99_b2.json",
            "bot_full_results_r99_b10.json",
            "bot_full_results_r100_b1.json",
            "other_full_results_r5_b1.json",
        ]
    );
    assert_eq!(
        all.iter()
            .map(|snapshot| snapshot.file_name_revision)
            .collect::<Vec<_>>(),
        [99, 99, 99, 100, 5]
    );

    let other = find_snapshot_files(dir.path(), Some("other")).unwrap();
    assert_eq!(file_names(&other), ["other_full_results_r5_b1.json"]);

    let none = find_snapshot_files(dir.path(), Some("missing")).unwrap();
    assert!(none.is_empty());
}

#[test]
fn find_snapshot_files_requires_directory() {
    let dir = results_dir(&[("bot_full_results_r1_b1.json", "")]);
    assert!(find_snapshot_files(&dir.path().join("bot_full_results_r1_b1.json"), None).is_err());
    assert!(find_snapshot_files(&dir.path().join("missing"), None).is_err());
}

#[test]
fn later_snapshot_wins_for_revision() {
    let dir = results_dir(&[
        (
            "bot_full_results_r7_b2.json",
            r#"ADD_RESULTS({"revision": "7", "tests": {"fast": {"a.html": {"actual": "CRASH"}}}});"#,
        ),
        (
            "bot_full_results_r7_b10.json",
            r#"ADD_RESULTS({"revision": "7", "tests": {"fast": {"a.html": {"actual": "TEXT"}}}});"#,
        ),
        ("bot_full_results_r8_b1.json", "not a snapshot"),
    ]);
    let test_name = "fast/a.html".parse().unwrap();

    let paths = find_snapshot_files(dir.path(), None).unwrap();
    let mut timeline = Timeline::default();
    let mut errors = 0;
    for res in read_snapshots(paths, Envelope::ADD_RESULTS) {
        match res {
            Ok((source, snapshot)) => timeline
                .record_snapshot(&test_name, &source, &snapshot)
                .unwrap(),
            Err(AlreadyReportedToCommandline) => errors += 1,
        }
    }

    assert_eq!(errors, 1, "the malformed snapshot is reported");
    assert_eq!(timeline.revision_range(), Some(7..=7));
    assert_eq!(
        timeline.get(7),
        Some(&Recorded::Flagged(ResultRecord {
            actual: "TEXT".to_owned(),
            expected: None,
        }))
    );
}
