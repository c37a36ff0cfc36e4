use std::io::{self, Write};

use full_results::test_name::TestName;
use owo_colors::OwoColorize;

use crate::{compress::Interval, expectation::Classification};

/// Interval labels are padded to this width, so that results line up.
const LABEL_WIDTH: usize = 20;

/// Writes a header naming `test_name`, a line for each of `intervals`, and a blank line.
pub(crate) fn write_summary(
    out: &mut dyn Write,
    test_name: &TestName,
    intervals: impl IntoIterator<Item = Interval>,
    use_color: bool,
) -> io::Result<()> {
    writeln!(out, "{test_name}")?;
    for interval in intervals {
        let line = format!(
            "{:<LABEL_WIDTH$} {}",
            interval.label().to_string(),
            interval.result
        );
        match (use_color, interval.classification) {
            (true, Classification::Matched) => writeln!(out, "{}", line.green())?,
            (true, Classification::Mismatched) => writeln!(out, "{}", line.red())?,
            (true, Classification::Unknown) | (false, _) => writeln!(out, "{line}")?,
        }
    }
    writeln!(out)
}

#[cfg(test)]
fn render(intervals: Vec<Interval>, use_color: bool) -> String {
    let mut out = Vec::new();
    write_summary(
        &mut out,
        &"fast/dom/node-removal.html".parse().unwrap(),
        intervals,
        use_color,
    )
    .unwrap();
    String::from_utf8(out).unwrap()
}

#[cfg(test)]
fn sample_intervals() -> Vec<Interval> {
    use crate::compress::DisplayResult;

    vec![
        Interval {
            first: 100,
            last: 104,
            result: DisplayResult::Flagged("TEXT (Expected: FAIL)".to_owned()),
            classification: Classification::Matched,
        },
        Interval {
            first: 105,
            last: 105,
            result: DisplayResult::Unknown,
            classification: Classification::Unknown,
        },
        Interval {
            first: 106,
            last: 107,
            result: DisplayResult::Flagged("CRASH".to_owned()),
            classification: Classification::Mismatched,
        },
    ]
}

#[test]
fn plain_summary() {
    insta::assert_snapshot!(render(sample_intervals(), false), @r###"
    fast/dom/node-removal.html
    [r100-r104]          TEXT (Expected: FAIL)
    r105                 UNKNOWN
    r107                 CRASH
    "###);
}

#[test]
fn summary_ends_with_blank_line() {
    assert_eq!(render(Vec::new(), false), "fast/dom/node-removal.html\n\n");
    assert!(render(sample_intervals(), false).ends_with("CRASH\n\n"));
}

#[test]
fn colored_summary() {
    let rendered = render(sample_intervals(), true);
    let lines = rendered.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[1],
        format!("{}", "[r100-r104]          TEXT (Expected: FAIL)".green())
    );
    assert_eq!(lines[2], "r105                 UNKNOWN", "unknown results stay plain");
    assert_eq!(lines[3], format!("{}", "r107                 CRASH".red()));
}
