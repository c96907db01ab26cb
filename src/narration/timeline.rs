//! Per-slide duration schedule.
//!
//! Every downstream component (frames, subtitles, ASS export) consumes the
//! entries produced here, so the video and the subtitle track share one
//! clock.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::error::{NarrationError, ensure_duration};
use super::logging::log_event;
use super::model::{Language, SlideNarration};
use crate::ui::prelude::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    Primary,
    Translated,
    None,
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Primary => write!(f, "primary"),
            AudioSource::Translated => write!(f, "translated"),
            AudioSource::None => write!(f, "none"),
        }
    }
}

impl From<Language> for AudioSource {
    fn from(language: Language) -> Self {
        match language {
            Language::Original => AudioSource::Primary,
            Language::Translated => AudioSource::Translated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub slide_index: u32,
    /// Seconds the slide stays on screen
    pub total_duration: f64,
    /// Portion of `total_duration` backed by speech
    pub audio_duration_used: f64,
    pub source: AudioSource,
    /// True when the other language's audio stood in for the selected one
    pub fallback: bool,
    pub audio_path: Option<PathBuf>,
}

impl TimelineEntry {
    pub fn has_audio(&self) -> bool {
        self.audio_duration_used > 0.0
    }

    /// Silence appended after the speech.
    pub fn padding(&self) -> f64 {
        (self.total_duration - self.audio_duration_used).max(0.0)
    }

    /// Duration that word timing is scaled against: the speech when there
    /// is any, otherwise the whole (minimum) slide duration.
    pub fn governing_duration(&self) -> f64 {
        if self.has_audio() {
            self.audio_duration_used
        } else {
            self.total_duration
        }
    }

    pub fn source_label(&self) -> String {
        if self.fallback {
            format!("{} (fallback)", self.source)
        } else {
            self.source.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSettings {
    pub language: Language,
    pub extra_padding_seconds: f64,
    pub minimum_duration_seconds: f64,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            language: Language::Original,
            extra_padding_seconds: 0.5,
            minimum_duration_seconds: 3.0,
        }
    }
}

impl TimelineSettings {
    pub fn validate(&self) -> Result<(), NarrationError> {
        ensure_duration(|| "extra_padding_seconds".into(), self.extra_padding_seconds)?;
        let minimum = ensure_duration(
            || "minimum_duration_seconds".into(),
            self.minimum_duration_seconds,
        )?;
        if minimum <= 0.0 {
            return Err(NarrationError::InvalidConfig(
                "minimum_duration_seconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Check the caller contract: 1-based, unique slide indices and
/// non-negative audio durations.
pub fn validate_slides(slides: &[SlideNarration]) -> Result<(), NarrationError> {
    let mut seen = HashSet::with_capacity(slides.len());
    for slide in slides {
        if slide.slide_index == 0 {
            return Err(NarrationError::InvalidSlideIndex(0));
        }
        if !seen.insert(slide.slide_index) {
            return Err(NarrationError::DuplicateSlide(slide.slide_index));
        }
        for (label, audio) in [
            ("audio", slide.primary_audio.as_ref()),
            ("translated audio", slide.translated_audio.as_ref()),
        ] {
            if let Some(audio) = audio {
                ensure_duration(
                    || format!("slide {} {label} duration", slide.slide_index),
                    audio.duration,
                )?;
            }
        }
    }
    Ok(())
}

/// Compute one slide's timeline entry.
pub fn build_timeline_entry(
    slide: &SlideNarration,
    settings: &TimelineSettings,
) -> TimelineEntry {
    let selected = settings.language;
    let (audio, source, fallback) = match slide.audio_for(selected).filter(|a| a.is_usable()) {
        Some(audio) => (Some(audio), AudioSource::from(selected), false),
        None => match slide
            .audio_for(selected.other())
            .filter(|a| a.is_usable())
        {
            Some(audio) => (Some(audio), AudioSource::from(selected.other()), true),
            None => (None, AudioSource::None, false),
        },
    };

    if fallback {
        log_event(
            Level::Warn,
            "narration.timeline.audio_fallback",
            format!(
                "Slide {}: no {} audio, using {} audio instead",
                slide.slide_index,
                selected,
                selected.other()
            ),
        );
    } else if audio.is_none() {
        log_event(
            Level::Warn,
            "narration.timeline.no_audio",
            format!(
                "Slide {}: no audio in either language, showing for {:.1}s",
                slide.slide_index, settings.minimum_duration_seconds
            ),
        );
    }

    let audio_duration_used = audio.map(|a| a.duration).unwrap_or(0.0);
    let total_duration = if audio_duration_used > 0.0 {
        audio_duration_used + settings.extra_padding_seconds
    } else {
        settings.minimum_duration_seconds
    };

    TimelineEntry {
        slide_index: slide.slide_index,
        total_duration,
        audio_duration_used,
        source,
        fallback,
        audio_path: audio.map(|a| a.path.clone()),
    }
}

/// Build the timeline for every slide, ordered by slide index.
pub fn build_timeline(
    slides: &[SlideNarration],
    settings: &TimelineSettings,
) -> Result<Vec<TimelineEntry>, NarrationError> {
    settings.validate()?;
    validate_slides(slides)?;

    let mut entries: Vec<TimelineEntry> = slides
        .iter()
        .map(|slide| build_timeline_entry(slide, settings))
        .collect();
    entries.sort_by_key(|entry| entry.slide_index);
    Ok(entries)
}

pub fn total_runtime(entries: &[TimelineEntry]) -> f64 {
    entries.iter().map(|entry| entry.total_duration).sum()
}
