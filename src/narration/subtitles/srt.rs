//! SubRip (`.srt`) writing, parsing and validation.

use std::fmt;
use std::fmt::Write;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::{SUBTITLE_MAX_LINES, SubtitleEntry};

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Serialize a track: numbered cues separated by a blank line.
pub fn write_srt(entries: &[SubtitleEntry]) -> String {
    let mut output = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        writeln!(output, "{}", entry.index).unwrap();
        writeln!(
            output,
            "{} --> {}",
            format_srt_timestamp(entry.start),
            format_srt_timestamp(entry.end)
        )
        .unwrap();
        writeln!(output, "{}", entry.text).unwrap();
    }
    output
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtCue {
    /// Index as written in the file, when present and numeric
    pub index: Option<usize>,
    pub start: Duration,
    pub end: Duration,
    /// Cue lines joined with `\n`
    pub text: String,
}

/// Parse a track in file order. Inverted or overlapping cues are kept so
/// [`check_track`] can report them.
pub fn parse_srt(input: &str) -> Result<Vec<SrtCue>> {
    let input = input.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let first = line.trim();
        if first.is_empty() {
            continue;
        }

        // The index line is sometimes omitted
        let (index, times) = if first.contains("-->") {
            (None, first)
        } else {
            let times = lines
                .next()
                .map(str::trim)
                .with_context(|| format!("SRT cue '{first}' is missing a timestamp line"))?;
            (first.parse::<usize>().ok(), times)
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("SRT cue timestamp line must contain '-->'")?;

        let start = parse_timestamp(start_raw)
            .with_context(|| format!("Failed to parse SRT start timestamp '{start_raw}'"))?;
        let end = parse_timestamp(end_raw)
            .with_context(|| format!("Failed to parse SRT end timestamp '{end_raw}'"))?;

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(next.trim().to_string());
            lines.next();
        }

        cues.push(SrtCue {
            index,
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

fn parse_timestamp(value: &str) -> Result<Duration> {
    let cleaned = value.trim().replace(',', ".");
    let mut parts = cleaned.split('.');
    let time_part = parts
        .next()
        .context("Timestamp is missing time component (HH:MM:SS)")?;
    let fractional_part = parts.next().unwrap_or("0");

    let mut hms = time_part.split(':');
    let hours = hms
        .next()
        .context("Timestamp missing hours")?
        .parse::<u64>()
        .context("Invalid hours in timestamp")?;
    let minutes = hms
        .next()
        .context("Timestamp missing minutes")?
        .parse::<u64>()
        .context("Invalid minutes in timestamp")?;
    let seconds = hms
        .next()
        .context("Timestamp missing seconds")?
        .parse::<u64>()
        .context("Invalid seconds in timestamp")?;

    if hms.next().is_some() {
        bail!("Timestamp has more than three components: {value}");
    }
    if minutes >= 60 || seconds >= 60 {
        bail!("Timestamp minutes and seconds must be below 60: {value}");
    }

    let mut millis_str = fractional_part.to_string();
    if millis_str.len() < 3 {
        millis_str.push_str(&"0".repeat(3 - millis_str.len()));
    }
    let millis = millis_str
        .chars()
        .take(3)
        .collect::<String>()
        .parse::<u64>()
        .context("Invalid millisecond component in timestamp")?;

    let total_seconds = hours * 3600 + minutes * 60 + seconds;
    Ok(Duration::from_secs(total_seconds) + Duration::from_millis(millis))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackIssue {
    /// Cue number does not follow its predecessor
    IndexGap {
        position: usize,
        expected: usize,
        found: Option<usize>,
    },
    /// Cue ends before (or when) it starts
    Inverted { position: usize },
    /// Cue starts before the previous one ends
    Overlap {
        position: usize,
        previous_end: Duration,
        start: Duration,
    },
    TooManyLines { position: usize, lines: usize },
    LineTooLong {
        position: usize,
        chars: usize,
        limit: usize,
    },
}

impl fmt::Display for TrackIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackIssue::IndexGap {
                position,
                expected,
                found,
            } => match found {
                Some(found) => write!(f, "cue {position}: numbered {found}, expected {expected}"),
                None => write!(f, "cue {position}: missing number, expected {expected}"),
            },
            TrackIssue::Inverted { position } => {
                write!(f, "cue {position}: ends before it starts")
            }
            TrackIssue::Overlap {
                position,
                previous_end,
                start,
            } => write!(
                f,
                "cue {position}: starts at {} before the previous cue ends at {}",
                format_srt_timestamp(start.as_secs_f64()),
                format_srt_timestamp(previous_end.as_secs_f64())
            ),
            TrackIssue::TooManyLines { position, lines } => {
                write!(f, "cue {position}: {lines} lines (max {SUBTITLE_MAX_LINES})")
            }
            TrackIssue::LineTooLong {
                position,
                chars,
                limit,
            } => write!(f, "cue {position}: line of {chars} characters (max {limit})"),
        }
    }
}

/// Check the track invariants: 1-based consecutive numbering, cues that
/// move forward in time without overlapping, and (with a width) the
/// two-line layout.
pub fn check_track(cues: &[SrtCue], line_width: Option<usize>) -> Vec<TrackIssue> {
    let mut issues = Vec::new();
    let mut previous_end: Option<Duration> = None;

    for (i, cue) in cues.iter().enumerate() {
        let position = i + 1;
        if cue.index != Some(position) {
            issues.push(TrackIssue::IndexGap {
                position,
                expected: position,
                found: cue.index,
            });
        }
        if cue.end <= cue.start {
            issues.push(TrackIssue::Inverted { position });
        }
        if let Some(previous_end) = previous_end {
            if cue.start < previous_end {
                issues.push(TrackIssue::Overlap {
                    position,
                    previous_end,
                    start: cue.start,
                });
            }
        }
        previous_end = Some(cue.end);

        let lines: Vec<&str> = cue.text.lines().collect();
        if lines.len() > SUBTITLE_MAX_LINES {
            issues.push(TrackIssue::TooManyLines {
                position,
                lines: lines.len(),
            });
        }
        if let Some(limit) = line_width {
            for line in lines {
                let chars = line.chars().count();
                // A single unbreakable word may overflow
                if chars > limit && line.contains(' ') {
                    issues.push(TrackIssue::LineTooLong {
                        position,
                        chars,
                        limit,
                    });
                }
            }
        }
    }
    issues
}
