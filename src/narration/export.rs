//! Presentation data export.
//!
//! Describes the narrated deck for a web player: per slide the image, both
//! audio tracks, both texts and timed words. Word windows are estimated from
//! the speaking rate and then reconciled against the slide's resolved
//! timing, so a player can highlight along without decoding audio first.

use std::path::PathBuf;

use serde::Serialize;

use super::compositor::{HighlightStyle, KaraokePaging};
use super::error::NarrationError;
use super::frames::SlideImageProvider;
use super::logging::log_event;
use super::model::{Language, SlideNarration};
use super::subtitles::slides_in_order;
use super::timeline::TimelineEntry;
use super::word_timing::{WordGroup, WordTimings, WordWindow};
use crate::ui::prelude::Level;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub title: String,
    pub language: Language,
    pub karaoke_use_translation: bool,
    pub words_per_minute: f64,
    pub min_visible_seconds: f64,
    pub paging: KaraokePaging,
    pub highlight: HighlightStyle,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            language: Language::Original,
            karaoke_use_translation: false,
            words_per_minute: 150.0,
            min_visible_seconds: 0.3,
            paging: KaraokePaging::Scroll,
            highlight: HighlightStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationExport {
    pub version: &'static str,
    pub title: String,
    /// Audio track the slide timing follows
    pub language: Language,
    pub total_duration: f64,
    pub karaoke: KaraokeExport,
    pub slides: Vec<SlideExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KaraokeExport {
    pub paging: KaraokePaging,
    pub min_visible_seconds: f64,
    pub highlight: HighlightStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideAudio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideText {
    pub original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideExport {
    pub id: u32,
    pub image: PathBuf,
    /// Offset of the slide from the start of the presentation
    pub start: f64,
    pub duration: f64,
    pub audio_duration: f64,
    pub audio: SlideAudio,
    pub text: SlideText,
    /// Text the word windows refer to
    pub karaoke_text: String,
    /// Speaking time predicted from the word count
    pub estimated_duration: f64,
    pub words: Vec<WordWindow>,
    pub groups: Vec<WordGroup>,
}

/// Estimate word windows from the speaking rate, then rescale them to the
/// slide's governing duration. Returns the estimate and the final timings.
pub fn timed_words(
    text: &str,
    entry: &TimelineEntry,
    words_per_minute: f64,
) -> Result<(WordTimings, WordTimings), NarrationError> {
    let estimate = WordTimings::estimate(text, words_per_minute)?;
    let timings = estimate.reconcile(entry.governing_duration())?;
    Ok((estimate, timings))
}

/// Build the presentation description for all slides in order.
pub fn build_presentation(
    slides: &[SlideNarration],
    timelines: &[TimelineEntry],
    images: &dyn SlideImageProvider,
    settings: &ExportSettings,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<PresentationExport, NarrationError> {
    let ordered = slides_in_order(slides, timelines)?;

    let total = ordered.len();
    let mut exported = Vec::with_capacity(total);
    let mut clock = 0.0;
    for (done, (slide, entry)) in ordered.into_iter().enumerate() {
        let karaoke_text = slide.display_text(settings.karaoke_use_translation);
        let (estimate, timings) = timed_words(karaoke_text, entry, settings.words_per_minute)?;
        if !timings.is_empty() {
            log_event(
                Level::Debug,
                "narration.export.reconciled",
                format!(
                    "Slide {}: {} words estimated at {:.2}s, timed against {:.2}s",
                    slide.slide_index,
                    timings.word_count(),
                    estimate.governing_duration(),
                    timings.governing_duration()
                ),
            );
        }

        exported.push(SlideExport {
            id: slide.slide_index,
            image: images.slide_image(slide.slide_index),
            start: clock,
            duration: entry.total_duration,
            audio_duration: entry.audio_duration_used,
            audio: SlideAudio {
                original: slide.primary_audio.as_ref().map(|a| a.path.clone()),
                translated: slide.translated_audio.as_ref().map(|a| a.path.clone()),
            },
            text: SlideText {
                original: slide.narration_text.clone(),
                translated: slide.translated_text.clone(),
            },
            karaoke_text: karaoke_text.to_string(),
            estimated_duration: estimate.governing_duration(),
            groups: timings.group(settings.min_visible_seconds),
            words: timings.windows().to_vec(),
        });

        clock += entry.total_duration;
        on_progress(done + 1, total);
    }

    Ok(PresentationExport {
        version: EXPORT_VERSION,
        title: settings.title.clone(),
        language: settings.language,
        total_duration: clock,
        karaoke: KaraokeExport {
            paging: settings.paging,
            min_visible_seconds: settings.min_visible_seconds,
            highlight: settings.highlight.clone(),
        },
        slides: exported,
    })
}
