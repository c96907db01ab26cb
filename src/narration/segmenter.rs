//! Caption-sized text segmentation.
//!
//! Narration is packed greedily into segments that respect both a character
//! budget and a line budget. When a unit does not fit it is broken into the
//! next finer unit (paragraph, sentence, clause, word); words are never
//! split. The same packing drives on-screen captions and subtitle entries.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::error::NarrationError;
use super::logging::log_event;
use crate::ui::prelude::Level;

/// Lower bound for the derived per-line width.
pub const MIN_CHARS_PER_LINE: usize = 20;

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n[ \t\r]*\n").expect("valid paragraph regex");
}

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?'];
const CLAUSE_ENDINGS: &[char] = &[',', ';', ':'];
const CLOSING_MARKS: &[char] = &['"', '\'', ')', ']', '”', '’', '»'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationConfig {
    pub max_chars_per_segment: usize,
    pub max_lines: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_chars_per_segment: 120,
            max_lines: 2,
        }
    }
}

impl SegmentationConfig {
    pub fn new(max_chars_per_segment: usize, max_lines: usize) -> Self {
        Self {
            max_chars_per_segment,
            max_lines,
        }
    }

    pub fn max_chars_per_line(&self) -> usize {
        (self.max_chars_per_segment / self.max_lines.max(1)).max(MIN_CHARS_PER_LINE)
    }

    pub fn validate(&self) -> Result<(), NarrationError> {
        if self.max_chars_per_segment == 0 {
            return Err(NarrationError::InvalidConfig(
                "max_chars_per_segment must be at least 1".into(),
            ));
        }
        if self.max_lines == 0 {
            return Err(NarrationError::InvalidConfig(
                "max_lines must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionSegment {
    pub text: String,
    pub char_count: usize,
    pub line_count: usize,
}

impl CaptionSegment {
    fn new(text: String, chars_per_line: usize) -> Self {
        let char_count = text.chars().count();
        let line_count = wrap_words(&text, chars_per_line).len();
        Self {
            text,
            char_count,
            line_count,
        }
    }
}

/// Collapse whitespace runs (including newlines) to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap by character count. Words longer than `width` get a
/// line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub const ELLIPSIS: &str = "...";

/// Mark a cut-off line without making it longer.
pub fn ellipsize(line: &str) -> String {
    if line.ends_with(ELLIPSIS) {
        return line.to_string();
    }
    let chars: Vec<char> = line.chars().collect();
    if chars.len() > ELLIPSIS.len() {
        let kept: String = chars[..chars.len() - ELLIPSIS.len()].iter().collect();
        format!("{kept}{ELLIPSIS}")
    } else {
        ELLIPSIS.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Paragraph,
    Sentence,
    Clause,
    Word,
}

impl Unit {
    fn finer(self) -> Option<Unit> {
        match self {
            Unit::Paragraph => Some(Unit::Sentence),
            Unit::Sentence => Some(Unit::Clause),
            Unit::Clause => Some(Unit::Word),
            Unit::Word => None,
        }
    }
}

fn ends_with_any(word: &str, endings: &[char]) -> bool {
    word.trim_end_matches(CLOSING_MARKS)
        .chars()
        .last()
        .is_some_and(|c| endings.contains(&c))
}

fn group_words(text: &str, endings: &[char]) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        current.push(word);
        if ends_with_any(word, endings) {
            groups.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        groups.push(current.join(" "));
    }
    groups
}

/// Split `text` (already normalized unless `unit` is a paragraph) into
/// units one level finer than the caller's.
fn split_units(text: &str, unit: Unit) -> Vec<String> {
    match unit {
        Unit::Paragraph => PARAGRAPH_BREAK
            .split(text)
            .map(normalize_whitespace)
            .filter(|p| !p.is_empty())
            .collect(),
        Unit::Sentence => group_words(text, SENTENCE_ENDINGS),
        Unit::Clause => group_words(text, CLAUSE_ENDINGS),
        Unit::Word => text.split_whitespace().map(str::to_string).collect(),
    }
}

struct Packer {
    config: SegmentationConfig,
    chars_per_line: usize,
    running: String,
    segments: Vec<CaptionSegment>,
}

impl Packer {
    fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            chars_per_line: config.max_chars_per_line(),
            running: String::new(),
            segments: Vec::new(),
        }
    }

    fn fits(&self, candidate: &str) -> bool {
        candidate.chars().count() <= self.config.max_chars_per_segment
            && wrap_words(candidate, self.chars_per_line).len() <= self.config.max_lines
    }

    fn flush(&mut self) {
        if !self.running.is_empty() {
            let text = std::mem::take(&mut self.running);
            self.segments
                .push(CaptionSegment::new(text, self.chars_per_line));
        }
    }

    fn push(&mut self, text: &str, unit: Unit) {
        let candidate = if self.running.is_empty() {
            text.to_string()
        } else {
            format!("{} {}", self.running, text)
        };
        if self.fits(&candidate) {
            self.running = candidate;
            return;
        }

        self.flush();
        if self.fits(text) {
            self.running = text.to_string();
            return;
        }

        match unit.finer() {
            Some(finer) => {
                for part in split_units(text, finer) {
                    self.push(&part, finer);
                }
            }
            None => {
                log_event(
                    Level::Debug,
                    "narration.segment.oversized",
                    format!(
                        "Word '{}' exceeds the caption limit of {} characters; it gets its own segment",
                        text, self.config.max_chars_per_segment
                    ),
                );
                self.running = text.to_string();
                self.flush();
            }
        }
    }

    fn finish(mut self) -> Vec<CaptionSegment> {
        self.flush();
        self.segments
    }
}

/// Split narration into ordered caption segments.
///
/// Empty or whitespace-only text yields no segments. Joining the segments
/// with single spaces reproduces the whitespace-normalized input.
pub fn segment_text(text: &str, config: &SegmentationConfig) -> Vec<CaptionSegment> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut packer = Packer::new(*config);
    if packer.fits(&normalized) {
        return vec![CaptionSegment::new(normalized, packer.chars_per_line)];
    }

    for paragraph in split_units(text, Unit::Paragraph) {
        packer.push(&paragraph, Unit::Paragraph);
    }
    packer.finish()
}
