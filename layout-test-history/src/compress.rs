//! Compression of a [`Timeline`] into [`Interval`]s of revisions that share a displayed result.
//!
//! Revisions are walked one at a time from the first to the last revision of a timeline. Each
//! revision displays either a flagged result, or one of the sentinels [`DisplayResult::Unknown`]
//! (no snapshot covered the revision) and [`DisplayResult::Match`] (a snapshot covered the
//! revision, but did not flag the test). Consecutive revisions with equal displayed results are
//! collapsed into a single interval. After the last revision, the pending interval is always
//! flushed.

#[cfg(test)]
use insta::{assert_debug_snapshot, assert_snapshot};

use std::{
    fmt::{self, Display, Formatter},
    ops::RangeInclusive,
};

use lazy_format::make_lazy_format;

use crate::{
    expectation::{self, Classification},
    timeline::{Recorded, ResultRecord, Timeline},
};

/// How revisions that no snapshot covers are presented.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum UnknownPolicy {
    /// Display them as [`DisplayResult::Unknown`], distinct from [`DisplayResult::Match`].
    #[default]
    Show,
    /// Display them and revisions whose snapshots did not flag the test alike, as
    /// [`DisplayResult::MatchOrUnknown`].
    Merge,
    /// Absorb them into whichever interval surrounds them.
    Ignore,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct DisplayOptions {
    /// Only show intervals where the test was flagged.
    pub only_failures: bool,
    pub unknown: UnknownPolicy,
    /// Append expected outcomes to flagged results.
    pub show_expected: bool,
}

/// The result displayed for a revision. Consecutive revisions with equal values are grouped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DisplayResult {
    Unknown,
    Match,
    MatchOrUnknown,
    Flagged(String),
}

impl DisplayResult {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged(_))
    }
}

impl Display for DisplayResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("UNKNOWN"),
            Self::Match => f.write_str("MATCH"),
            Self::MatchOrUnknown => f.write_str("MATCH/UNKNOWN"),
            Self::Flagged(result) => f.write_str(result),
        }
    }
}

/// A maximal run of consecutive revisions that share a [`DisplayResult`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Interval {
    pub first: u64,
    pub last: u64,
    pub result: DisplayResult,
    pub classification: Classification,
}

impl Interval {
    /// Renders this interval's revisions as `[r<first>-r<last>]` if it covers more than two of
    /// them, or `r<last>` otherwise.
    ///
    /// An interval of two revisions is labeled with only its later revision. Readers of this
    /// output depend on that.
    pub fn label(&self) -> impl Display + '_ {
        let Self { first, last, .. } = self;
        let is_range = last - first >= 2;
        make_lazy_format!(|f| if is_range {
            write!(f, "[r{first}-r{last}]")
        } else {
            write!(f, "r{last}")
        })
    }

    pub fn is_shown(&self, options: &DisplayOptions) -> bool {
        !options.only_failures || self.result.is_flagged()
    }
}

/// The result of the interval currently being accumulated.
#[derive(Debug)]
enum Pending<'a> {
    Unknown,
    Match,
    MatchOrUnknown,
    Flagged {
        text: String,
        record: &'a ResultRecord,
    },
}

impl Pending<'_> {
    /// Whether `self` and `other` display the same result, and thus belong to the same interval.
    fn shows_same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unknown, Self::Unknown)
            | (Self::Match, Self::Match)
            | (Self::MatchOrUnknown, Self::MatchOrUnknown) => true,
            (Self::Flagged { text: lhs, .. }, Self::Flagged { text: rhs, .. }) => lhs == rhs,
            _ => false,
        }
    }

    fn result(&self) -> DisplayResult {
        match self {
            Self::Unknown => DisplayResult::Unknown,
            Self::Match => DisplayResult::Match,
            Self::MatchOrUnknown => DisplayResult::MatchOrUnknown,
            Self::Flagged { text, .. } => DisplayResult::Flagged(text.clone()),
        }
    }

    fn classification(&self) -> Classification {
        match self {
            Self::Unknown => Classification::Unknown,
            Self::Match | Self::MatchOrUnknown => Classification::Matched,
            Self::Flagged { record, .. } => {
                expectation::classify(&record.actual, record.expected.as_deref())
            }
        }
    }

    fn finish(&self, first: u64, last: u64) -> Interval {
        Interval {
            first,
            last,
            result: self.result(),
            classification: self.classification(),
        }
    }
}

/// An iterator over every [`Interval`] of a [`Timeline`], in revision order, including those that
/// are not [shown](Interval::is_shown).
///
/// Created with [`Timeline::intervals`].
#[derive(Debug)]
pub(crate) struct Intervals<'a> {
    timeline: &'a Timeline,
    options: DisplayOptions,
    revisions: RangeInclusive<u64>,
    last_revision: u64,
    pending_start: u64,
    pending: Pending<'a>,
    flushed: bool,
}

impl<'a> Intervals<'a> {
    fn new(timeline: &'a Timeline, options: DisplayOptions) -> Option<Self> {
        let revisions = timeline.revision_range()?;
        let initial = match options.unknown {
            UnknownPolicy::Merge => Pending::MatchOrUnknown,
            UnknownPolicy::Show | UnknownPolicy::Ignore => Pending::Unknown,
        };
        Some(Self {
            timeline,
            options,
            pending_start: *revisions.start(),
            last_revision: *revisions.end(),
            revisions,
            pending: initial,
            flushed: false,
        })
    }

    /// Computes what to display for `revision`, or [`None`] if it should be absorbed into the
    /// pending interval.
    fn pending_at(&self, revision: u64) -> Option<Pending<'a>> {
        let DisplayOptions {
            only_failures: _,
            unknown,
            show_expected,
        } = self.options;

        let pending = match self.timeline.get(revision) {
            None => match unknown {
                UnknownPolicy::Show => Pending::Unknown,
                UnknownPolicy::Merge => Pending::MatchOrUnknown,
                UnknownPolicy::Ignore => return None,
            },
            Some(Recorded::NotFlagged) => match unknown {
                UnknownPolicy::Merge => Pending::MatchOrUnknown,
                UnknownPolicy::Show | UnknownPolicy::Ignore => Pending::Match,
            },
            Some(Recorded::Flagged(record)) => {
                let text = match (&record.expected, show_expected) {
                    (Some(expected), true) => {
                        format!("{} (Expected: {expected})", record.actual)
                    }
                    _ => record.actual.clone(),
                };
                Pending::Flagged { text, record }
            }
        };
        Some(pending)
    }
}

impl Iterator for Intervals<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(revision) = self.revisions.next() else {
                if self.flushed {
                    return None;
                }
                self.flushed = true;
                return Some(self.pending.finish(self.pending_start, self.last_revision));
            };

            let Some(here) = self.pending_at(revision) else {
                continue;
            };
            if here.shows_same_as(&self.pending) {
                continue;
            }

            // Nothing has accumulated before the first revision.
            let finished = (revision > self.pending_start)
                .then(|| self.pending.finish(self.pending_start, revision - 1));
            self.pending_start = revision;
            self.pending = here;
            if finished.is_some() {
                return finished;
            }
        }
    }
}

impl Timeline {
    /// Returns every interval of this timeline, or [`None`] if it has no records.
    pub fn intervals(&self, options: DisplayOptions) -> Option<Intervals<'_>> {
        Intervals::new(self, options)
    }

    /// Returns the intervals of this timeline that should be shown with `options`.
    pub fn summarize(
        &self,
        options: DisplayOptions,
    ) -> Option<impl Iterator<Item = Interval> + '_> {
        Some(
            self.intervals(options)?
                .filter(move |interval| interval.is_shown(&options)),
        )
    }
}

#[cfg(test)]
fn flagged(actual: &str, expected: Option<&str>) -> Recorded {
    Recorded::Flagged(ResultRecord {
        actual: actual.to_owned(),
        expected: expected.map(ToOwned::to_owned),
    })
}

#[cfg(test)]
fn labeled(timeline: &Timeline, options: DisplayOptions) -> String {
    timeline
        .summarize(options)
        .unwrap()
        .map(|interval| format!("{} {}\n", interval.label(), interval.result))
        .collect()
}

#[test]
fn terse_skips_unknown() {
    let timeline = Timeline::from_iter([
        (100, flagged("FAIL", None)),
        (101, flagged("FAIL", None)),
        (103, flagged("PASS", None)),
    ]);
    let options = DisplayOptions {
        only_failures: true,
        ..Default::default()
    };
    assert_snapshot!(labeled(&timeline, options), @r###"
    r101 FAIL
    r103 PASS
    "###);
    assert_snapshot!(
        labeled(&timeline, DisplayOptions::default()),
        @r###"
    r101 FAIL
    r102 UNKNOWN
    r103 PASS
    "###
    );
}

#[test]
fn detail_shows_match_range() {
    let timeline = Timeline::from_iter((5..=7).map(|revision| (revision, Recorded::NotFlagged)));
    assert_debug_snapshot!(
        timeline.summarize(DisplayOptions::default()).unwrap().collect::<Vec<_>>(),
        @r###"
    [
        Interval {
            first: 5,
            last: 7,
            result: Match,
            classification: Matched,
        },
    ]
    "###
    );
    assert_snapshot!(labeled(&timeline, DisplayOptions::default()), @"[r5-r7] MATCH");
    assert_snapshot!(
        labeled(&timeline, DisplayOptions { only_failures: true, ..Default::default() }),
        @""
    );
}

#[test]
fn label_points_and_ranges() {
    let interval = |first, last| Interval {
        first,
        last,
        result: DisplayResult::Unknown,
        classification: Classification::Unknown,
    };
    assert_eq!(interval(4, 4).label().to_string(), "r4");
    assert_eq!(
        interval(4, 5).label().to_string(),
        "r5",
        "two revisions are labeled by the later one"
    );
    assert_eq!(interval(4, 6).label().to_string(), "[r4-r6]");
    assert_eq!(interval(0, 1000).label().to_string(), "[r0-r1000]");
}

#[test]
fn unknown_policies() {
    let timeline = Timeline::from_iter([
        (1, Recorded::NotFlagged),
        (3, Recorded::NotFlagged),
        (4, flagged("CRASH", None)),
        (6, flagged("CRASH", None)),
    ]);

    assert_snapshot!(
        labeled(&timeline, DisplayOptions::default()),
        @r###"
    r1 MATCH
    r2 UNKNOWN
    r3 MATCH
    r4 CRASH
    r5 UNKNOWN
    r6 CRASH
    "###
    );
    assert_snapshot!(
        labeled(
            &timeline,
            DisplayOptions {
                unknown: UnknownPolicy::Merge,
                ..Default::default()
            }
        ),
        @r###"
    [r1-r3] MATCH/UNKNOWN
    r4 CRASH
    r5 MATCH/UNKNOWN
    r6 CRASH
    "###
    );
    assert_snapshot!(
        labeled(
            &timeline,
            DisplayOptions {
                unknown: UnknownPolicy::Ignore,
                ..Default::default()
            }
        ),
        @r###"
    [r1-r3] MATCH
    [r4-r6] CRASH
    "###
    );
}

#[test]
fn show_expected() {
    let timeline = Timeline::from_iter([
        (1, flagged("TEXT", Some("FAIL"))),
        (2, flagged("TEXT", Some("PASS"))),
        (3, flagged("TEXT", None)),
    ]);

    assert_snapshot!(labeled(&timeline, DisplayOptions::default()), @"[r1-r3] TEXT");
    assert_snapshot!(
        labeled(
            &timeline,
            DisplayOptions {
                show_expected: true,
                ..Default::default()
            }
        ),
        @r###"
    r1 TEXT (Expected: FAIL)
    r2 TEXT (Expected: PASS)
    r3 TEXT
    "###
    );
}

#[test]
fn flagged_result_never_equals_sentinel() {
    let timeline = Timeline::from_iter([(1, flagged("MATCH", None)), (2, Recorded::NotFlagged)]);
    let intervals = timeline
        .intervals(DisplayOptions::default())
        .unwrap()
        .collect::<Vec<_>>();
    assert_eq!(intervals.len(), 2);
}

#[test]
fn classify_intervals() {
    let timeline = Timeline::from_iter([
        (1, flagged("TEXT", Some("FAIL"))),
        (2, flagged("CRASH", Some("FAIL"))),
        (4, Recorded::NotFlagged),
    ]);
    let classifications = |unknown| {
        timeline
            .intervals(DisplayOptions {
                unknown,
                ..Default::default()
            })
            .unwrap()
            .map(|interval| (interval.first, interval.classification))
            .collect::<Vec<_>>()
    };

    assert_eq!(
        classifications(UnknownPolicy::Show),
        [
            (1, Classification::Matched),
            (2, Classification::Mismatched),
            (3, Classification::Unknown),
            (4, Classification::Matched),
        ]
    );
    assert_eq!(
        classifications(UnknownPolicy::Merge),
        [
            (1, Classification::Matched),
            (2, Classification::Mismatched),
            (3, Classification::Matched),
        ]
    );
}

#[test]
fn single_revision() {
    let timeline = Timeline::from_iter([(7, flagged("TIMEOUT", None))]);
    assert_snapshot!(labeled(&timeline, DisplayOptions::default()), @"r7 TIMEOUT");
}

#[test]
fn empty_timeline_has_no_intervals() {
    assert!(Timeline::default()
        .intervals(DisplayOptions::default())
        .is_none());
}

#[cfg(test)]
fn sample_timelines() -> Vec<Timeline> {
    let results = [
        flagged("TEXT", Some("FAIL")),
        flagged("TEXT", Some("PASS")),
        flagged("CRASH", None),
        Recorded::NotFlagged,
    ];
    // Deterministic, irregular patterns of results and gaps.
    (0..20u64)
        .map(|seed| {
            Timeline::from_iter((0..30u64).filter_map(|i| {
                let mix = (i * 7 + seed * 13) ^ (i / 3 + seed);
                (mix % 5 != 0).then(|| (1000 + i, results[(mix % 4) as usize].clone()))
            }))
        })
        .collect()
}

#[cfg(test)]
fn all_options() -> Vec<DisplayOptions> {
    let mut options = Vec::new();
    for only_failures in [false, true] {
        for unknown in [
            UnknownPolicy::Show,
            UnknownPolicy::Merge,
            UnknownPolicy::Ignore,
        ] {
            for show_expected in [false, true] {
                options.push(DisplayOptions {
                    only_failures,
                    unknown,
                    show_expected,
                });
            }
        }
    }
    options
}

#[test]
fn intervals_cover_timeline() {
    for timeline in sample_timelines() {
        let range = timeline.revision_range().unwrap();
        for options in all_options() {
            let intervals = timeline.intervals(options).unwrap().collect::<Vec<_>>();

            assert_eq!(intervals.first().unwrap().first, *range.start());
            assert_eq!(intervals.last().unwrap().last, *range.end());
            for interval in &intervals {
                assert!(interval.first <= interval.last, "{interval:?} is empty");
            }
            for pair in intervals.windows(2) {
                let [prev, next] = pair else { unreachable!() };
                assert_eq!(prev.last + 1, next.first, "gap or overlap in {options:?}");
                assert_ne!(prev.result, next.result, "uncollapsed in {options:?}");
            }
        }
    }
}

#[test]
fn intervals_collapse_equal_neighbors() {
    for timeline in sample_timelines() {
        for options in all_options() {
            let walk = timeline.intervals(options).unwrap();
            for interval in timeline.intervals(options).unwrap() {
                for revision in interval.first..=interval.last {
                    match walk.pending_at(revision) {
                        Some(here) => assert_eq!(
                            here.result(),
                            interval.result,
                            "r{revision} in {options:?}"
                        ),
                        None => assert_eq!(options.unknown, UnknownPolicy::Ignore),
                    }
                }
            }
        }
    }
}

#[test]
fn flagged_interval_classified_from_first_record() {
    let timeline = Timeline::from_iter([
        (10, flagged("TEXT", Some("PASS"))),
        (11, flagged("TEXT", Some("FAIL"))),
        (12, flagged("TEXT", Some("FAIL"))),
    ]);
    assert_debug_snapshot!(
        timeline.summarize(DisplayOptions::default()).unwrap().collect::<Vec<_>>(),
        @r###"
    [
        Interval {
            first: 10,
            last: 12,
            result: Flagged(
                "TEXT",
            ),
            classification: Mismatched,
        },
    ]
    "###
    );

    let timeline = Timeline::from_iter([
        (10, flagged("TEXT", Some("FAIL"))),
        (11, flagged("TEXT", Some("PASS"))),
    ]);
    let classifications = timeline
        .intervals(DisplayOptions::default())
        .unwrap()
        .map(|interval| interval.classification)
        .collect::<Vec<_>>();
    assert_eq!(classifications, [Classification::Matched]);
}

#[test]
fn terse_shows_only_flagged() {
    for timeline in sample_timelines() {
        for options in all_options().into_iter().filter(|o| o.only_failures) {
            let all = timeline
                .intervals(options)
                .unwrap()
                .filter(|interval| interval.result.is_flagged())
                .collect::<Vec<_>>();
            let shown = timeline.summarize(options).unwrap().collect::<Vec<_>>();
            assert_eq!(all, shown);
        }
    }
}

#[test]
fn summarize_is_idempotent() {
    for timeline in sample_timelines() {
        for options in all_options() {
            assert_eq!(
                timeline.summarize(options).unwrap().collect::<Vec<_>>(),
                timeline.summarize(options).unwrap().collect::<Vec<_>>(),
            );
        }
    }
}
