//! Subtitle track generation.
//!
//! Subtitles reuse the caption packing and the slide timeline, but no pixel
//! measurement, so a missing font backend never blocks them. Segments are
//! packed against the subtitle layout (two lines of `line_width`), not the
//! on-screen caption budget.

pub mod ass;
pub mod srt;

use std::collections::HashMap;

use serde::Serialize;

use super::error::NarrationError;
use super::logging::log_event;
use super::model::SlideNarration;
use super::segmenter::{SegmentationConfig, segment_text, wrap_words};
use super::timeline::{TimelineEntry, validate_slides};
use crate::ui::prelude::Level;

pub const SUBTITLE_MAX_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleEntry {
    /// 1-based position in the track
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleEntry {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleSettings {
    pub segmentation: SegmentationConfig,
    /// Characters per subtitle line
    pub line_width: usize,
    pub use_translation: bool,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            line_width: 60,
            use_translation: false,
        }
    }
}

impl SubtitleSettings {
    pub fn validate(&self) -> Result<(), NarrationError> {
        self.segmentation.validate()?;
        if self.line_width == 0 {
            return Err(NarrationError::InvalidConfig(
                "subtitle_line_width must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Packing budget for cue text: at most two lines of `line_width`,
    /// never more than the caption budget allows.
    pub fn cue_segmentation(&self) -> SegmentationConfig {
        let max_chars = self
            .segmentation
            .max_chars_per_segment
            .min(SUBTITLE_MAX_LINES * self.line_width);
        SegmentationConfig::new(max_chars, SUBTITLE_MAX_LINES)
    }
}

/// Wrap segment text at `line_width` and cut it into cue texts of at most
/// two lines each. Every word ends up in exactly one cue.
pub fn split_cue_text(text: &str, line_width: usize) -> Vec<String> {
    wrap_words(text, line_width)
        .chunks(SUBTITLE_MAX_LINES)
        .map(|lines| lines.join("\n"))
        .collect()
}

/// Slides paired with their timeline entries, in slide order.
pub(crate) fn slides_in_order<'a>(
    slides: &'a [SlideNarration],
    timelines: &'a [TimelineEntry],
) -> Result<Vec<(&'a SlideNarration, &'a TimelineEntry)>, NarrationError> {
    validate_slides(slides)?;
    let entries: HashMap<u32, &TimelineEntry> =
        timelines.iter().map(|e| (e.slide_index, e)).collect();

    let mut ordered: Vec<&SlideNarration> = slides.iter().collect();
    ordered.sort_by_key(|slide| slide.slide_index);
    ordered
        .into_iter()
        .map(|slide| {
            entries
                .get(&slide.slide_index)
                .map(|entry| (slide, *entry))
                .ok_or(NarrationError::MissingTimeline(slide.slide_index))
        })
        .collect()
}

/// Build the subtitle track for all slides on one running clock.
///
/// Each slide's total duration is split evenly over its segments; a segment
/// whose wrapped text needs more than two lines shares its slot among
/// several cues. Slides without text still advance the clock.
pub fn generate_subtitles(
    slides: &[SlideNarration],
    timelines: &[TimelineEntry],
    settings: &SubtitleSettings,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<SubtitleEntry>, NarrationError> {
    settings.validate()?;
    let ordered = slides_in_order(slides, timelines)?;

    let segmentation = settings.cue_segmentation();
    let total = ordered.len();
    let mut entries = Vec::new();
    let mut clock = 0.0;
    for (done, (slide, entry)) in ordered.into_iter().enumerate() {
        let text = slide.display_text(settings.use_translation);
        let segments = segment_text(text, &segmentation);

        if segments.is_empty() {
            log_event(
                Level::Debug,
                "narration.subtitles.empty_text",
                format!(
                    "Slide {}: no text, skipping {:.2}s",
                    slide.slide_index, entry.total_duration
                ),
            );
        }

        let per_segment = entry.total_duration / segments.len().max(1) as f64;
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            let start = clock + i as f64 * per_segment;
            let end = if i == last {
                clock + entry.total_duration
            } else {
                clock + (i + 1) as f64 * per_segment
            };

            let cues = split_cue_text(&segment.text, settings.line_width);
            if cues.len() > 1 {
                log_event(
                    Level::Debug,
                    "narration.subtitles.split_segment",
                    format!(
                        "Slide {}: segment {} needs {} cues at {} characters per line",
                        slide.slide_index,
                        i + 1,
                        cues.len(),
                        settings.line_width
                    ),
                );
            }
            let per_cue = (end - start) / cues.len() as f64;
            let last_cue = cues.len().saturating_sub(1);
            for (j, cue_text) in cues.into_iter().enumerate() {
                entries.push(SubtitleEntry {
                    index: entries.len() + 1,
                    start: start + j as f64 * per_cue,
                    end: if j == last_cue {
                        end
                    } else {
                        start + (j + 1) as f64 * per_cue
                    },
                    text: cue_text,
                });
            }
        }

        clock += entry.total_duration;
        on_progress(done + 1, total);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::model::AudioRef;
    use crate::narration::timeline::{TimelineSettings, build_timeline};

    const EPS: f64 = 1e-6;

    fn track(slides: &[SlideNarration], settings: &SubtitleSettings) -> Vec<SubtitleEntry> {
        let timelines = build_timeline(slides, &TimelineSettings::default()).unwrap();
        generate_subtitles(slides, &timelines, settings, &mut |_, _| {}).unwrap()
    }

    fn assert_monotonic(entries: &[SubtitleEntry]) {
        assert_eq!(entries[0].index, 1);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].index, pair[0].index + 1);
            assert!(pair[0].end <= pair[1].start);
        }
        for entry in entries {
            assert!(entry.start < entry.end);
        }
    }

    #[test]
    fn segments_share_the_slide_duration() {
        let sentence = "This sentence is long enough to need a segment of its own here.";
        let slides = vec![
            SlideNarration::new(1, format!("{sentence} {sentence} {sentence}"))
                .with_primary_audio(AudioRef::new("a.mp3", 5.5)),
            SlideNarration::new(2, "Short one.").with_primary_audio(AudioRef::new("b.mp3", 1.5)),
        ];
        let entries = track(&slides, &SubtitleSettings::default());

        assert_eq!(entries.len(), 4);
        assert_monotonic(&entries);
        assert!((entries[0].end - 2.0).abs() < EPS);
        assert!((entries[2].end - 6.0).abs() < EPS);
        assert_eq!(entries[3].start, entries[2].end);
        assert!((entries[3].end - 8.0).abs() < EPS);
        assert_eq!(entries[3].text, "Short one.");
    }

    #[test]
    fn empty_slides_advance_the_clock() {
        let slides = vec![
            SlideNarration::new(1, "First."),
            SlideNarration::new(2, "   "),
            SlideNarration::new(3, "Third."),
        ];
        let entries = track(&slides, &SubtitleSettings::default());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].index, 2);
        assert!((entries[1].start - 6.0).abs() < EPS);
        assert!((entries[1].end - 9.0).abs() < EPS);
    }

    #[test]
    fn translation_is_used_when_requested() {
        let slides = vec![SlideNarration::new(1, "Olá").with_translation("Hello")];
        let settings = SubtitleSettings {
            use_translation: true,
            ..SubtitleSettings::default()
        };
        assert_eq!(track(&slides, &settings)[0].text, "Hello");
        assert_eq!(track(&slides, &SubtitleSettings::default())[0].text, "Olá");
    }

    fn rejoined(entries: &[SubtitleEntry]) -> String {
        entries
            .iter()
            .map(|e| e.text.replace('\n', " "))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn cue_text_is_at_most_two_lines() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let cues = split_cue_text(text, 20);
        assert_eq!(cues.len(), 2);
        for cue in &cues {
            let lines: Vec<&str> = cue.lines().collect();
            assert!(lines.len() <= SUBTITLE_MAX_LINES);
            assert!(lines.iter().all(|l| l.chars().count() <= 20));
        }
        assert_eq!(cues.join(" ").replace('\n', " "), text);
        assert_eq!(split_cue_text("fits on one line", 60), vec!["fits on one line"]);
    }

    #[test]
    fn tall_caption_budget_keeps_every_word() {
        let text = format!("{} {} {}", "a".repeat(31), "b".repeat(31), "c".repeat(31));
        let slides = vec![
            SlideNarration::new(1, text.clone()).with_primary_audio(AudioRef::new("a.mp3", 2.5)),
        ];
        let settings = SubtitleSettings {
            segmentation: SegmentationConfig::new(120, 3),
            ..SubtitleSettings::default()
        };
        let entries = track(&slides, &settings);

        assert_eq!(rejoined(&entries), text);
        assert!(entries.iter().all(|e| !e.text.contains("...")));
        assert!(entries.iter().all(|e| e.text.lines().count() <= SUBTITLE_MAX_LINES));
        assert_monotonic(&entries);
        assert!((entries.last().unwrap().end - 3.0).abs() < EPS);
    }

    #[test]
    fn single_line_caption_budget_keeps_every_word() {
        let text = "Narrow captions still need the whole sentence in the subtitle track, every single word of it.";
        let slides = vec![SlideNarration::new(1, text)];
        let settings = SubtitleSettings {
            segmentation: SegmentationConfig::new(120, 1),
            line_width: 12,
            ..SubtitleSettings::default()
        };
        let entries = track(&slides, &settings);

        assert_eq!(rejoined(&entries), text);
        assert_monotonic(&entries);
        for entry in &entries {
            assert!(entry.text.lines().count() <= SUBTITLE_MAX_LINES);
            assert!(entry.text.lines().all(|l| l.chars().count() <= 12));
        }
        assert!((entries.last().unwrap().end - 3.0).abs() < EPS);
    }

    #[test]
    fn cue_budget_follows_line_width() {
        let settings = SubtitleSettings {
            segmentation: SegmentationConfig::new(120, 3),
            line_width: 40,
            ..SubtitleSettings::default()
        };
        assert_eq!(settings.cue_segmentation(), SegmentationConfig::new(80, 2));
        assert_eq!(
            SubtitleSettings::default().cue_segmentation(),
            SegmentationConfig::default()
        );
    }

    #[test]
    fn many_slides_stay_monotonic() {
        let slides: Vec<SlideNarration> = (1..=25)
            .map(|i| {
                SlideNarration::new(i, format!("Slide {i} says something. And then a bit more, with a clause."))
                    .with_primary_audio(AudioRef::new("x.mp3", 0.1 * i as f64 + 0.37))
            })
            .collect();
        let settings = SubtitleSettings {
            segmentation: SegmentationConfig::new(30, 1),
            ..SubtitleSettings::default()
        };
        let entries = track(&slides, &settings);
        assert!(entries.len() > 25);
        assert_monotonic(&entries);
    }

    #[test]
    fn missing_timeline_is_an_error() {
        let slides = vec![SlideNarration::new(1, "a")];
        let err = generate_subtitles(&slides, &[], &SubtitleSettings::default(), &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, NarrationError::MissingTimeline(1)));
    }
}
