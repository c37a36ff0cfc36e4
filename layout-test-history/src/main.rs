mod compress;
mod expectation;
mod render;
mod snapshots;
mod timeline;

use self::{
    compress::{DisplayOptions, UnknownPolicy},
    snapshots::SnapshotPath,
    timeline::Timeline,
};

use std::{
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use full_results::{envelope::Envelope, test_name::TestName};
use miette::{Report, WrapErr};

/// Summarize the history of a single layout test across the `full_results` snapshots uploaded by
/// a CI bot, as ranges of revisions that share a result.
///
/// Snapshots are read from files named `<bot>_full_results_r<revision>_b<build>.json`. When more
/// than one snapshot covers the same revision, the one that sorts last (in natural order) wins.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// The test to summarize, e.g., `fast/dom/node-removal.html`.
    test_name: String,
    /// The directory containing snapshot files.
    #[clap(long, default_value = ".")]
    results_dir: PathBuf,
    /// Only read snapshots uploaded by this bot.
    #[clap(long)]
    bot: Option<String>,
    /// Print diagnostics, like inconsistencies between snapshots, to standard output.
    #[clap(long)]
    debug: bool,
    /// Only print revisions where the test was flagged as failing.
    #[clap(long = "onlyprinterr")]
    only_print_errors: bool,
    #[clap(flatten)]
    unknown: UnknownArgs,
    /// Append expected outcomes to flagged results.
    #[clap(long = "showexpected")]
    show_expected: bool,
    /// Disable coloring of results by whether they match expectations.
    #[clap(long = "nocolor")]
    no_color: bool,
}

/// How to present revisions that no snapshot covers. See also [`UnknownPolicy`].
#[derive(Clone, Copy, Debug, clap::Args)]
#[group(multiple = false)]
struct UnknownArgs {
    /// Show revisions without any snapshot as `UNKNOWN`, separately from `MATCH`.
    ///
    /// This is already the default, so this flag only makes it explicit.
    #[clap(long = "tellunknown")]
    tell_unknown: bool,
    /// Show revisions without any snapshot and those where the test was not flagged alike, as
    /// `MATCH/UNKNOWN`.
    #[clap(long = "mergeunknown")]
    merge_unknown: bool,
    /// Absorb revisions without any snapshot into the surrounding ranges.
    #[clap(long = "ignoreunknown")]
    ignore_unknown: bool,
}

impl From<UnknownArgs> for UnknownPolicy {
    fn from(value: UnknownArgs) -> Self {
        let UnknownArgs {
            tell_unknown: _,
            merge_unknown,
            ignore_unknown,
        } = value;
        if merge_unknown {
            Self::Merge
        } else if ignore_unknown {
            Self::Ignore
        } else {
            Self::Show
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut logger = env_logger::builder();
    if cli.debug {
        logger
            .filter_level(log::LevelFilter::Debug)
            .target(env_logger::Target::Stdout);
    } else {
        logger.filter_level(log::LevelFilter::Error);
    }
    logger.parse_default_env().init();
    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    let Cli {
        test_name,
        results_dir,
        bot,
        debug: _,
        only_print_errors,
        unknown,
        show_expected,
        no_color,
    } = cli;

    let test_name = match test_name.parse::<TestName>() {
        Ok(test_name) => test_name,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            return ExitCode::FAILURE;
        }
    };

    let options = DisplayOptions {
        only_failures: only_print_errors,
        unknown: unknown.into(),
        show_expected,
    };

    let timeline = match build_timeline(&test_name, &results_dir, bot.as_deref()) {
        Ok(timeline) => timeline,
        Err(AlreadyReportedToCommandline) => return ExitCode::FAILURE,
    };

    let Some(intervals) = timeline.summarize(options) else {
        log::error!(
            "no snapshots with results for {test_name} were found in {}",
            results_dir.display()
        );
        return ExitCode::FAILURE;
    };

    let mut out = BufWriter::new(io::stdout().lock());
    match render::write_summary(&mut out, &test_name, intervals, !no_color)
        .and_then(|()| out.flush())
        .map_err(Report::msg)
        .wrap_err("failed to write summary to standard output")
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Reads every snapshot in `results_dir` and records what each says about `test_name`.
///
/// This function reports to `log` automatically, so no meaningful [`Err`] value is returned.
fn build_timeline(
    test_name: &TestName,
    results_dir: &Path,
    bot: Option<&str>,
) -> Result<Timeline, AlreadyReportedToCommandline> {
    let snapshot_paths = snapshots::find_snapshot_files(results_dir, bot)?;

    let mut timeline = Timeline::default();
    let mut err_found = false;
    for res in snapshots::read_snapshots(snapshot_paths, Envelope::ADD_RESULTS) {
        match res {
            Ok((source, snapshot)) => {
                let SnapshotPath { path, .. } = &source;
                log::debug!("recording results for {test_name} from {}", path.display());
                if let Err(AlreadyReportedToCommandline) =
                    timeline.record_snapshot(test_name, &source, &snapshot)
                {
                    err_found = true;
                }
            }
            Err(AlreadyReportedToCommandline) => err_found = true,
        }
    }

    if err_found {
        log::error!(concat!(
            "failed to read one or more snapshots, ",
            "see above for more details"
        ));
        return Err(AlreadyReportedToCommandline);
    }

    Ok(timeline)
}

/// A sentinel for errors that have already been rendered to the command line.
#[derive(Debug)]
struct AlreadyReportedToCommandline;

#[test]
fn unknown_policy_flags() {
    let policy = |args: &[&str]| {
        Cli::try_parse_from(["layout-test-history", "fast/a.html"].iter().chain(args))
            .map(|cli| UnknownPolicy::from(cli.unknown))
    };

    assert_eq!(policy(&[]).unwrap(), UnknownPolicy::Show);
    assert_eq!(policy(&["--tellunknown"]).unwrap(), UnknownPolicy::Show);
    assert_eq!(policy(&["--mergeunknown"]).unwrap(), UnknownPolicy::Merge);
    assert_eq!(policy(&["--ignoreunknown"]).unwrap(), UnknownPolicy::Ignore);
    assert!(policy(&["--tellunknown", "--mergeunknown"]).is_err());
    assert!(policy(&["--mergeunknown", "--ignoreunknown"]).is_err());
}
