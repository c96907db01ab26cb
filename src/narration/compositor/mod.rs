//! Caption layout math.
//!
//! The compositor decides where caption text, the caption band and karaoke
//! highlight boxes go on a frame. It never touches pixels: a
//! [`CaptionLayout`] is handed to a rendering backend, which draws it.

mod measure;

pub use measure::{EstimatedWidthMeasurer, FontSpec, MeasureError, TextMeasurer};

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::error::NarrationError;
use super::logging::log_event;
use super::segmenter::{ELLIPSIS, ellipsize, normalize_whitespace};
use crate::ui::prelude::Level;

pub const MIN_FONT_SIZE: u32 = 20;
pub const FONT_SCALE: f64 = 0.028;
pub const LINE_SPACING: u32 = 8;
pub const BAND_PADDING: u32 = 20;
pub const HIGHLIGHT_PADDING: u32 = 4;
pub const OVERLAY_TINT_ALPHA: u8 = 200;

pub const WEB_SAFE_COLORS: &[(&str, [u8; 3])] = &[
    ("Yellow", [255, 255, 0]),
    ("Cyan", [0, 255, 255]),
    ("Lime", [0, 255, 0]),
    ("Magenta", [255, 0, 255]),
    ("Orange", [255, 165, 0]),
    ("Pink", [255, 192, 203]),
    ("Aqua", [0, 255, 255]),
    ("Red", [255, 0, 0]),
    ("Green", [0, 128, 0]),
    ("Blue", [0, 0, 255]),
    ("White", [255, 255, 255]),
];

pub fn web_safe_color(name: &str) -> Option<[u8; 3]> {
    WEB_SAFE_COLORS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name.trim()))
        .map(|(_, rgb)| *rgb)
}

/// Where the caption band sits relative to the slide image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Tinted band drawn over the bottom of the slide
    #[default]
    Overlay,
    /// Opaque band appended below the slide; the canvas grows
    SeparateBand,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::Overlay => write!(f, "overlay"),
            LayoutMode::SeparateBand => write!(f, "separate-band"),
        }
    }
}

/// How karaoke captions move through text longer than the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KaraokePaging {
    #[default]
    Scroll,
    Page,
}

impl fmt::Display for KaraokePaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KaraokePaging::Scroll => write!(f, "scroll"),
            KaraokePaging::Page => write!(f, "page"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightStyle {
    pub color_name: String,
    pub rgb: [u8; 3],
    /// Percent, 0-100
    pub opacity: u8,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color_name: "Yellow".into(),
            rgb: [255, 255, 0],
            opacity: 70,
        }
    }
}

impl HighlightStyle {
    pub fn named(name: &str, opacity: u8) -> Result<Self, NarrationError> {
        let rgb = web_safe_color(name).ok_or_else(|| {
            NarrationError::InvalidConfig(format!("unknown highlight colour '{name}'"))
        })?;
        if opacity > 100 {
            return Err(NarrationError::InvalidConfig(format!(
                "highlight opacity must be 0-100 (got {opacity})"
            )));
        }
        Ok(Self {
            color_name: name.trim().to_string(),
            rgb,
            opacity,
        })
    }

    /// Overlay highlights blend through alpha; separate-band highlights sit
    /// on an opaque black band, so the colour itself is darkened instead.
    pub fn fill(&self, mode: LayoutMode) -> Rgba {
        let [r, g, b] = self.rgb;
        match mode {
            LayoutMode::Overlay => Rgba::new(r, g, b, (self.opacity as f64 * 2.55) as u8),
            LayoutMode::SeparateBand => {
                let scale = |c: u8| (c as f64 * (self.opacity as f64 / 100.0)) as u8;
                Rgba::new(scale(r), scale(g), scale(b), 255)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub mode: LayoutMode,
    /// Caption lines visible at once
    pub max_lines: usize,
    pub margin: u32,
    pub font_family: String,
    pub highlight: HighlightStyle,
    pub paging: KaraokePaging,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            frame_width: 1920,
            frame_height: 1080,
            mode: LayoutMode::Overlay,
            max_lines: 3,
            margin: 40,
            font_family: "DejaVu Sans".into(),
            highlight: HighlightStyle::default(),
            paging: KaraokePaging::Scroll,
        }
    }
}

impl LayoutConfig {
    pub fn font_size(&self) -> u32 {
        ((self.frame_height as f64 * FONT_SCALE) as u32).max(MIN_FONT_SIZE)
    }

    pub fn font(&self) -> FontSpec {
        FontSpec::new(self.font_family.clone(), self.font_size())
    }

    pub fn line_height(&self) -> u32 {
        self.font_size() + LINE_SPACING
    }

    pub fn band_height(&self) -> u32 {
        self.max_lines as u32 * self.line_height() + BAND_PADDING
    }

    /// Output frame size; separate-band layouts extend the slide downwards.
    pub fn canvas_size(&self) -> (u32, u32) {
        match self.mode {
            LayoutMode::Overlay => (self.frame_width, self.frame_height),
            LayoutMode::SeparateBand => (
                self.frame_width,
                self.frame_height + self.band_height(),
            ),
        }
    }

    pub fn band_rect(&self) -> Rect {
        let (width, height) = self.canvas_size();
        let band_height = self.band_height();
        Rect {
            x: 0,
            y: height.saturating_sub(band_height) as i32,
            width,
            height: band_height,
        }
    }

    pub fn band_fill(&self) -> Rgba {
        match self.mode {
            LayoutMode::Overlay => Rgba::new(0, 0, 0, OVERLAY_TINT_ALPHA),
            LayoutMode::SeparateBand => Rgba::new(0, 0, 0, 255),
        }
    }

    pub fn text_width(&self) -> u32 {
        self.frame_width.saturating_sub(self.margin * 2)
    }

    pub fn validate(&self) -> Result<(), NarrationError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(NarrationError::InvalidConfig(format!(
                "frame size must be non-zero (got {}x{})",
                self.frame_width, self.frame_height
            )));
        }
        if self.max_lines == 0 {
            return Err(NarrationError::InvalidConfig(
                "caption_lines must be at least 1".into(),
            ));
        }
        if self.text_width() == 0 {
            return Err(NarrationError::InvalidConfig(format!(
                "caption_margin {} leaves no room for text in a {}px frame",
                self.margin, self.frame_width
            )));
        }
        if self.mode == LayoutMode::Overlay && self.band_height() >= self.frame_height {
            return Err(NarrationError::InvalidConfig(format!(
                "{} caption lines do not fit on a {}px high frame",
                self.max_lines, self.frame_height
            )));
        }
        if self.highlight.opacity > 100 {
            return Err(NarrationError::InvalidConfig(format!(
                "highlight opacity must be 0-100 (got {})",
                self.highlight.opacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionLine {
    pub text: String,
    /// Left edge; negative when an unbreakable word overflows the frame
    pub x: i32,
    /// Top edge
    pub y: i32,
    pub width: u32,
}

/// Everything a backend needs to draw one captioned frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub band: Rect,
    pub band_fill: Rgba,
    pub font: FontSpec,
    pub line_height: u32,
    pub lines: Vec<CaptionLine>,
    /// Some content did not fit in the visible lines
    pub truncated: bool,
    pub highlights: Vec<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_fill: Option<Rgba>,
}

impl CaptionLayout {
    pub fn visible_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredWord {
    pub text: String,
    pub width: u32,
}

/// A slide's words arranged into caption rows once, then windowed per
/// karaoke frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRows {
    rows: Vec<Vec<MeasuredWord>>,
    space_width: u32,
}

impl WordRows {
    pub fn rows(&self) -> &[Vec<MeasuredWord>] {
        &self.rows
    }

    pub fn word_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    fn row_width(&self, row: &[MeasuredWord]) -> u32 {
        let words: u32 = row.iter().map(|w| w.width).sum();
        words + self.space_width * row.len().saturating_sub(1) as u32
    }

    fn words_before(&self, row: usize) -> usize {
        self.rows[..row].iter().map(Vec::len).sum()
    }

    /// Rows shown while the words in `active` are highlighted.
    fn visible_rows(
        &self,
        active: &RangeInclusive<usize>,
        max_lines: usize,
        paging: KaraokePaging,
    ) -> RangeInclusive<usize> {
        let total = self.rows.len();
        let first_active = *active.start();
        match paging {
            KaraokePaging::Scroll => {
                let mut current = 0;
                let mut counted = 0;
                for (i, row) in self.rows.iter().enumerate() {
                    if counted + row.len() > first_active {
                        current = i;
                        break;
                    }
                    counted += row.len();
                }
                let mut start = current.saturating_sub(max_lines / 2);
                let end = (start + max_lines).min(total);
                if end == total {
                    start = end.saturating_sub(max_lines);
                }
                start..=end.saturating_sub(1)
            }
            KaraokePaging::Page => {
                // Page holding most of the active words; the earlier page wins a tie
                let mut best: Option<(usize, RangeInclusive<usize>)> = None;
                let mut counted = 0;
                for page_start in (0..total).step_by(max_lines) {
                    let page_end = (page_start + max_lines).min(total);
                    let words: usize = self.rows[page_start..page_end].iter().map(Vec::len).sum();
                    let from = first_active.max(counted);
                    let to = (*active.end() + 1).min(counted + words);
                    let hits = to.saturating_sub(from);
                    if hits > 0 && best.as_ref().is_none_or(|(most, _)| hits > *most) {
                        best = Some((hits, page_start..=page_end - 1));
                    }
                    counted += words;
                }
                best.map(|(_, rows)| rows)
                    .unwrap_or_else(|| 0..=max_lines.min(total).saturating_sub(1))
            }
        }
    }
}

pub struct CaptionCompositor<'a> {
    measurer: &'a dyn TextMeasurer,
    config: &'a LayoutConfig,
    font: FontSpec,
}

impl<'a> CaptionCompositor<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, config: &'a LayoutConfig) -> Self {
        Self {
            measurer,
            config,
            font: config.font(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        self.config
    }

    fn measure(&self, text: &str) -> Result<u32, NarrationError> {
        Ok(self.measurer.measure(text, &self.font)?)
    }

    /// Band without any text, used for slides with nothing to caption so
    /// every frame of a run keeps the same canvas.
    pub fn blank(&self) -> CaptionLayout {
        let (canvas_width, canvas_height) = self.config.canvas_size();
        CaptionLayout {
            canvas_width,
            canvas_height,
            band: self.config.band_rect(),
            band_fill: self.config.band_fill(),
            font: self.font.clone(),
            line_height: self.config.line_height(),
            lines: Vec::new(),
            truncated: false,
            highlights: Vec::new(),
            highlight_fill: None,
        }
    }

    /// Vertical position of the first of `count` lines, centred in the band.
    fn first_line_y(&self, count: usize) -> i32 {
        let band = self.config.band_rect();
        let block = count as u32 * self.config.line_height();
        band.y + (band.height.saturating_sub(block) / 2) as i32
    }

    fn centred_x(&self, width: u32) -> i32 {
        (self.config.canvas_size().0 as i32 - width as i32) / 2
    }

    /// Greedy pixel wrap; a word wider than the band keeps a line of its own.
    fn wrap_to_width(&self, words: &[&str]) -> Result<Vec<String>, NarrationError> {
        let max_width = self.config.text_width();
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in words {
            let candidate = if current.is_empty() {
                (*word).to_string()
            } else {
                format!("{current} {word}")
            };
            if self.measure(&candidate)? <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if self.measure(word)? > max_width {
                log_event(
                    Level::Debug,
                    "narration.compositor.overflow",
                    format!("'{word}' is wider than the caption band and will overflow"),
                );
            }
            current = (*word).to_string();
        }
        if !current.is_empty() {
            lines.push(current);
        }
        Ok(lines)
    }

    /// Lay out one caption segment as static text.
    pub fn layout_caption(&self, text: &str) -> Result<CaptionLayout, NarrationError> {
        let normalized = normalize_whitespace(text);
        let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
        let mut wrapped = self.wrap_to_width(&words)?;

        let truncated = wrapped.len() > self.config.max_lines;
        if truncated {
            wrapped.truncate(self.config.max_lines);
            if let Some(last) = wrapped.last_mut() {
                *last = ellipsize(last);
            }
            log_event(
                Level::Debug,
                "narration.compositor.truncated",
                format!(
                    "Caption cut to {} lines: '{}'",
                    self.config.max_lines,
                    truncate_for_log(&normalized)
                ),
            );
        }

        let top = self.first_line_y(wrapped.len());
        let line_height = self.config.line_height() as i32;
        let mut lines = Vec::with_capacity(wrapped.len());
        for (i, text) in wrapped.into_iter().enumerate() {
            let width = self.measure(&text)?;
            lines.push(CaptionLine {
                x: self.centred_x(width),
                y: top + i as i32 * line_height,
                width,
                text,
            });
        }

        Ok(CaptionLayout {
            lines,
            truncated,
            ..self.blank()
        })
    }

    /// Measure every word once and arrange the full utterance into rows.
    pub fn arrange_words(&self, words: &[&str]) -> Result<WordRows, NarrationError> {
        let max_width = self.config.text_width();
        let space_width = self.measure(" ")?;
        let mut rows: Vec<Vec<MeasuredWord>> = Vec::new();
        let mut current: Vec<MeasuredWord> = Vec::new();
        let mut current_width = 0;

        for word in words {
            let width = self.measure(word)?;
            if current.is_empty() {
                current_width = width;
            } else if current_width + space_width + width <= max_width {
                current_width += space_width + width;
            } else {
                rows.push(std::mem::take(&mut current));
                current_width = width;
            }
            current.push(MeasuredWord {
                text: (*word).to_string(),
                width,
            });
        }
        if !current.is_empty() {
            rows.push(current);
        }

        Ok(WordRows { rows, space_width })
    }

    /// Lay out a karaoke frame: the visible window of rows plus one
    /// highlight box per active word.
    pub fn layout_karaoke(&self, rows: &WordRows, active: RangeInclusive<usize>) -> CaptionLayout {
        if rows.rows.is_empty() {
            return self.blank();
        }

        let visible = rows.visible_rows(&active, self.config.max_lines, self.config.paging);
        let shown = visible.end() + 1 - visible.start();
        let top = self.first_line_y(shown);
        let line_height = self.config.line_height();
        let padding = HIGHLIGHT_PADDING as i32;

        let mut word_index = rows.words_before(*visible.start());
        let mut lines = Vec::with_capacity(shown);
        let mut highlights = Vec::new();

        for (offset, row) in rows.rows[visible.clone()].iter().enumerate() {
            let width = rows.row_width(row);
            let x = self.centred_x(width);
            let y = top + offset as i32 * line_height as i32;

            let mut cursor = x;
            for word in row {
                if active.contains(&word_index) {
                    highlights.push(Rect {
                        x: cursor - padding,
                        y: y - padding,
                        width: word.width + 2 * HIGHLIGHT_PADDING,
                        height: line_height,
                    });
                }
                cursor += (word.width + rows.space_width) as i32;
                word_index += 1;
            }

            lines.push(CaptionLine {
                text: row
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                x,
                y,
                width,
            });
        }

        CaptionLayout {
            lines,
            truncated: shown < rows.rows.len(),
            highlights,
            highlight_fill: Some(self.config.highlight.fill(self.config.mode)),
            ..self.blank()
        }
    }
}

fn truncate_for_log(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}{ELLIPSIS}")
    }
}
