//! Linear word timing.
//!
//! Words share the governing duration evenly. Timings are first computed
//! against an estimate (speaking rate) and later reconciled against the
//! decoded audio length; both steps are pure, so recomputing simply
//! rescales every window.

use serde::Serialize;

use super::error::{NarrationError, ensure_duration};

/// Tolerance used when deriving group sizes from float ratios.
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordWindow {
    pub word_index: usize,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl WordWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Consecutive words displayed together as one karaoke unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WordGroup {
    pub first_word: usize,
    /// Inclusive
    pub last_word: usize,
    pub start: f64,
    pub end: f64,
}

impl WordGroup {
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn len(&self) -> usize {
        self.last_word + 1 - self.first_word
    }

    pub fn contains(&self, word_index: usize) -> bool {
        (self.first_word..=self.last_word).contains(&word_index)
    }
}

pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Speaking-time estimate used before real audio is available.
pub fn estimate_duration(word_count: usize, words_per_minute: f64) -> f64 {
    if word_count == 0 || !(words_per_minute > 0.0) {
        return 0.0;
    }
    word_count as f64 * 60.0 / words_per_minute
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordTimings {
    governing_duration: f64,
    windows: Vec<WordWindow>,
}

impl WordTimings {
    /// Spread the words of `text` evenly over `governing_duration`.
    pub fn compute(text: &str, governing_duration: f64) -> Result<Self, NarrationError> {
        let words = tokenize(text);
        Self::from_words(&words, governing_duration)
    }

    pub fn from_words(words: &[&str], governing_duration: f64) -> Result<Self, NarrationError> {
        let duration = ensure_duration(|| "governing duration".into(), governing_duration)?;
        if words.is_empty() {
            return Ok(Self {
                governing_duration: duration,
                windows: Vec::new(),
            });
        }
        if duration <= 0.0 {
            return Err(NarrationError::invalid_duration(
                "governing duration for timed words",
                duration,
            ));
        }

        let n = words.len();
        let boundary = |k: usize| k as f64 * duration / n as f64;
        let windows = words
            .iter()
            .enumerate()
            .map(|(i, word)| WordWindow {
                word_index: i,
                text: (*word).to_string(),
                start: boundary(i),
                end: if i + 1 == n { duration } else { boundary(i + 1) },
            })
            .collect();

        Ok(Self {
            governing_duration: duration,
            windows,
        })
    }

    /// Phase one: time words against an estimated speaking duration.
    pub fn estimate(text: &str, words_per_minute: f64) -> Result<Self, NarrationError> {
        let words = tokenize(text);
        if !(words_per_minute > 0.0) || !words_per_minute.is_finite() {
            return Err(NarrationError::InvalidConfig(format!(
                "words_per_minute must be positive (got {words_per_minute})"
            )));
        }
        Self::from_words(&words, estimate_duration(words.len(), words_per_minute))
    }

    /// Phase two: rescale to the decoded audio duration.
    pub fn reconcile(&self, actual_duration: f64) -> Result<Self, NarrationError> {
        let words: Vec<&str> = self.windows.iter().map(|w| w.text.as_str()).collect();
        Self::from_words(&words, actual_duration)
    }

    pub fn governing_duration(&self) -> f64 {
        self.governing_duration
    }

    pub fn windows(&self) -> &[WordWindow] {
        &self.windows
    }

    pub fn word_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Words per karaoke unit so that each unit stays visible for at least
    /// `min_visible_seconds`.
    pub fn group_size(&self, min_visible_seconds: f64) -> usize {
        if self.windows.is_empty() || !(min_visible_seconds > 0.0) {
            return 1;
        }
        let per_word = self.governing_duration / self.windows.len() as f64;
        if per_word >= min_visible_seconds {
            return 1;
        }
        ((min_visible_seconds / per_word - RATIO_EPSILON).ceil() as usize).max(1)
    }

    /// Batch consecutive words into units; spans are contiguous and sum to
    /// the governing duration.
    pub fn group(&self, min_visible_seconds: f64) -> Vec<WordGroup> {
        let size = self.group_size(min_visible_seconds);
        self.windows
            .chunks(size)
            .map(|chunk| {
                let first = &chunk[0];
                let last = &chunk[chunk.len() - 1];
                WordGroup {
                    first_word: first.word_index,
                    last_word: last.word_index,
                    start: first.start,
                    end: last.end,
                }
            })
            .collect()
    }
}
