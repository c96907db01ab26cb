//! Frame sequencing.
//!
//! Turns each slide's timeline entry into an ordered list of still frames.
//! Every mode keeps two properties per slide: frame durations add up to the
//! slide's total duration, and only the first frame carries the audio.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::compositor::{CaptionCompositor, CaptionLayout};
use super::error::NarrationError;
use super::logging::log_event;
use super::model::SlideNarration;
use super::segmenter::{SegmentationConfig, segment_text};
use super::timeline::{TimelineEntry, validate_slides};
use super::word_timing::{WordTimings, tokenize};
use crate::ui::prelude::Level;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FrameMode {
    /// One bare frame per slide
    Plain,
    /// One captioned frame per caption segment
    Captions,
    /// One frame per highlighted word group
    #[default]
    Karaoke,
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameMode::Plain => write!(f, "plain"),
            FrameMode::Captions => write!(f, "captions"),
            FrameMode::Karaoke => write!(f, "karaoke"),
        }
    }
}

/// Source of the per-slide raster images.
pub trait SlideImageProvider {
    fn slide_image(&self, slide_index: u32) -> PathBuf;
}

/// Images exported as `slide_<index>.png` into one directory.
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    dir: PathBuf,
}

impl ImageDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SlideImageProvider for ImageDirectory {
    fn slide_image(&self, slide_index: u32) -> PathBuf {
        self.dir.join(format!("slide_{slide_index}.png"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameContent {
    pub slide_image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<CaptionLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KaraokeFrame {
    pub slide_index: u32,
    pub content: FrameContent,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    /// Inclusive word range highlighted on this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_words: Option<(usize, usize)>,
}

impl KaraokeFrame {
    pub fn carries_audio(&self) -> bool {
        self.audio.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub mode: FrameMode,
    pub captions_use_translation: bool,
    pub karaoke_use_translation: bool,
    pub min_visible_seconds: f64,
    pub segmentation: SegmentationConfig,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            mode: FrameMode::Karaoke,
            captions_use_translation: true,
            karaoke_use_translation: false,
            min_visible_seconds: 0.3,
            segmentation: SegmentationConfig::default(),
        }
    }
}

/// Collaborators shared by every slide of one run.
pub struct FrameContext<'a> {
    pub settings: &'a FrameSettings,
    pub compositor: CaptionCompositor<'a>,
    pub images: &'a dyn SlideImageProvider,
}

/// Frames for every slide, keyed (and therefore ordered) by slide index.
///
/// `on_progress(done, total)` is called after each slide is finalised.
pub fn generate_karaoke_frames(
    slides: &[SlideNarration],
    timelines: &[TimelineEntry],
    ctx: &FrameContext<'_>,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<BTreeMap<u32, Vec<KaraokeFrame>>, NarrationError> {
    validate_slides(slides)?;
    if !(ctx.settings.min_visible_seconds > 0.0) {
        return Err(NarrationError::InvalidConfig(format!(
            "min_visible_seconds must be positive (got {})",
            ctx.settings.min_visible_seconds
        )));
    }
    let entries: HashMap<u32, &TimelineEntry> =
        timelines.iter().map(|e| (e.slide_index, e)).collect();

    let mut ordered: Vec<&SlideNarration> = slides.iter().collect();
    ordered.sort_by_key(|slide| slide.slide_index);

    let total = ordered.len();
    let mut frames = BTreeMap::new();
    for (done, slide) in ordered.into_iter().enumerate() {
        let entry = entries
            .get(&slide.slide_index)
            .copied()
            .ok_or(NarrationError::MissingTimeline(slide.slide_index))?;

        let slide_frames = match ctx.settings.mode {
            FrameMode::Plain => plain_frames(entry, ctx),
            FrameMode::Captions => caption_frames(slide, entry, ctx)?,
            FrameMode::Karaoke => karaoke_frames(slide, entry, ctx)?,
        };
        log_event(
            Level::Debug,
            "narration.frames.slide_done",
            format!(
                "Slide {}: {} frame(s) over {:.2}s",
                slide.slide_index,
                slide_frames.len(),
                entry.total_duration
            ),
        );
        frames.insert(slide.slide_index, slide_frames);
        on_progress(done + 1, total);
    }
    Ok(frames)
}

fn frame(
    entry: &TimelineEntry,
    ctx: &FrameContext<'_>,
    caption: Option<CaptionLayout>,
    duration: f64,
    first: bool,
) -> KaraokeFrame {
    KaraokeFrame {
        slide_index: entry.slide_index,
        content: FrameContent {
            slide_image: ctx.images.slide_image(entry.slide_index),
            caption,
        },
        duration,
        audio: if first { entry.audio_path.clone() } else { None },
        active_words: None,
    }
}

fn plain_frames(entry: &TimelineEntry, ctx: &FrameContext<'_>) -> Vec<KaraokeFrame> {
    vec![frame(entry, ctx, None, entry.total_duration, true)]
}

/// A single caption-less frame spanning the whole slide.
fn duration_only(entry: &TimelineEntry, ctx: &FrameContext<'_>) -> Vec<KaraokeFrame> {
    log_event(
        Level::Debug,
        "narration.frames.empty_text",
        format!("Slide {}: no text, emitting a single frame", entry.slide_index),
    );
    let blank = ctx.compositor.blank();
    vec![frame(entry, ctx, Some(blank), entry.total_duration, true)]
}

fn caption_frames(
    slide: &SlideNarration,
    entry: &TimelineEntry,
    ctx: &FrameContext<'_>,
) -> Result<Vec<KaraokeFrame>, NarrationError> {
    let text = slide.display_text(ctx.settings.captions_use_translation);
    let segments = segment_text(text, &ctx.settings.segmentation);
    if segments.is_empty() {
        return Ok(duration_only(entry, ctx));
    }

    let per_segment = entry.total_duration / segments.len() as f64;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let layout = ctx.compositor.layout_caption(&segment.text)?;
            Ok(frame(entry, ctx, Some(layout), per_segment, i == 0))
        })
        .collect()
}

fn karaoke_frames(
    slide: &SlideNarration,
    entry: &TimelineEntry,
    ctx: &FrameContext<'_>,
) -> Result<Vec<KaraokeFrame>, NarrationError> {
    let text = slide.display_text(ctx.settings.karaoke_use_translation);
    let words = tokenize(text);
    if words.is_empty() {
        return Ok(duration_only(entry, ctx));
    }

    // Word timing follows the speech; the trailing padding belongs to the
    // last frame only.
    let governing = entry.governing_duration();
    let padding = (entry.total_duration - governing).max(0.0);
    let timings = WordTimings::from_words(&words, governing)?;
    let groups = timings.group(ctx.settings.min_visible_seconds);
    let rows = ctx.compositor.arrange_words(&words)?;

    let last = groups.len() - 1;
    Ok(groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let layout = ctx
                .compositor
                .layout_karaoke(&rows, group.first_word..=group.last_word);
            let duration = if i == last {
                group.span() + padding
            } else {
                group.span()
            };
            KaraokeFrame {
                active_words: Some((group.first_word, group.last_word)),
                ..frame(entry, ctx, Some(layout), duration, i == 0)
            }
        })
        .collect())
}

/// Serializable view of a run's frames, written by `slidecast frames`.
#[derive(Debug, Serialize)]
pub struct FramePlan<'a> {
    pub mode: FrameMode,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub total_duration: f64,
    pub slides: Vec<SlidePlan<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SlidePlan<'a> {
    pub slide_index: u32,
    pub total_duration: f64,
    pub frames: &'a [KaraokeFrame],
}

impl<'a> FramePlan<'a> {
    pub fn new(
        mode: FrameMode,
        canvas: (u32, u32),
        frames: &'a BTreeMap<u32, Vec<KaraokeFrame>>,
    ) -> Self {
        let slides: Vec<SlidePlan<'a>> = frames
            .iter()
            .map(|(index, frames)| SlidePlan {
                slide_index: *index,
                total_duration: frames.iter().map(|f| f.duration).sum(),
                frames,
            })
            .collect();
        Self {
            mode,
            canvas_width: canvas.0,
            canvas_height: canvas.1,
            total_duration: slides.iter().map(|s| s.total_duration).sum(),
            slides,
        }
    }
}
