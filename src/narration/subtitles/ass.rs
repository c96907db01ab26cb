//! ASS (Advanced SubStation Alpha) karaoke export.
//!
//! Cues follow the same word groups and windows as the karaoke video
//! frames, but show the text of the caption segment the group falls in.

use std::fmt::Write;

use super::{SubtitleSettings, slides_in_order};
use crate::narration::compositor::{BAND_PADDING, HighlightStyle, LayoutConfig, LayoutMode};
use crate::narration::error::NarrationError;
use crate::narration::model::SlideNarration;
use crate::narration::segmenter::segment_text;
use crate::narration::timeline::TimelineEntry;
use crate::narration::word_timing::{WordTimings, tokenize};

/// Style configuration for ASS subtitles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssStyle {
    pub name: String,
    pub font_name: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Colours in `&HAABBGGRR` form
    pub primary_color: String,
    pub secondary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    /// Outline width in pixels
    pub outline: u32,
    /// Shadow depth in pixels
    pub shadow: u32,
    /// Alignment (numpad layout: 1-3=bottom, 4-6=mid, 7-9=top)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    /// Distance from the bottom edge for bottom-aligned text
    pub margin_v: u32,
}

impl Default for AssStyle {
    fn default() -> Self {
        Self::for_layout(&LayoutConfig::default())
    }
}

impl AssStyle {
    /// Match the burned-in caption band: same font, size and margins.
    pub fn for_layout(layout: &LayoutConfig) -> Self {
        Self {
            name: "Default".to_string(),
            font_name: layout.font_family.clone(),
            font_size: layout.font_size(),
            primary_color: "&H00FFFFFF".to_string(),
            secondary_color: "&H00FFFFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: style_color([0, 0, 0], layout.band_fill().a),
            bold: false,
            outline: 2,
            shadow: 1,
            alignment: 2,
            margin_l: layout.margin,
            margin_r: layout.margin,
            margin_v: BAND_PADDING / 2,
        }
    }

    fn to_style_line(&self) -> String {
        let bold_val = if self.bold { -1 } else { 0 };
        format!(
            "Style: {name},{font},{size},{primary},{secondary},{outline},{back},{bold},0,0,0,100,100,0,0,1,{outline_w},{shadow},{align},{ml},{mr},{mv},1",
            name = self.name,
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            secondary = self.secondary_color,
            outline = self.outline_color,
            back = self.back_color,
            bold = bold_val,
            outline_w = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            ml = self.margin_l,
            mr = self.margin_r,
            mv = self.margin_v,
        )
    }
}

/// Highlight animation constants
mod ass_constants {
    /// Text colour of the words around the highlighted group
    pub const COLOR_NORMAL: &str = "&HFFFFFF&";
    /// Text colour of the highlighted words, drawn on the highlight box
    pub const COLOR_HIGHLIGHT_TEXT: &str = "&H000000&";

    pub const BORD_THICKNESS_NONE: u32 = 0;
    pub const BORD_THICKNESS_FULL: u32 = 8;
    pub const BORD_THICKNESS_MIN: u32 = 4;
    pub const BLUR_ROUNDED: u32 = 2;

    /// Centiseconds for the box to grow, then settle
    pub const BOX_SCALE_IN_CS: u32 = 10;
    pub const BOX_SCALE_OUT_CS: u32 = 10;
}

/// One dialogue line: a caption segment with a highlighted word group.
#[derive(Debug, Clone, PartialEq)]
pub struct KaraokeCue {
    pub start: f64,
    pub end: f64,
    pub words: Vec<String>,
    /// Inclusive range into `words`
    pub active: (usize, usize),
}

/// Build karaoke cues for every slide on the shared clock.
pub fn generate_karaoke_cues(
    slides: &[SlideNarration],
    timelines: &[TimelineEntry],
    settings: &SubtitleSettings,
    min_visible_seconds: f64,
) -> Result<Vec<KaraokeCue>, NarrationError> {
    settings.validate()?;
    let mut cues = Vec::new();
    let mut clock = 0.0;

    for (slide, entry) in slides_in_order(slides, timelines)? {
        let text = slide.display_text(settings.use_translation);
        let segments = segment_text(text, &settings.segmentation);
        let words = tokenize(text);
        if segments.is_empty() {
            clock += entry.total_duration;
            continue;
        }

        // Word ranges of each segment; segments reproduce the word sequence
        let mut bounds = Vec::with_capacity(segments.len());
        let mut first = 0;
        for segment in &segments {
            let count = segment.text.split(' ').count();
            bounds.push((first, first + count - 1));
            first += count;
        }

        let governing = entry.governing_duration();
        let padding = (entry.total_duration - governing).max(0.0);
        let timings = WordTimings::from_words(&words, governing)?;
        let groups = timings.group(min_visible_seconds);
        let last = groups.len() - 1;

        for (i, group) in groups.iter().enumerate() {
            let (seg_first, seg_last) = bounds
                .iter()
                .copied()
                .find(|(a, b)| (*a..=*b).contains(&group.first_word))
                .unwrap_or((group.first_word, group.last_word));
            // The last group also holds the slide's trailing padding
            let end = if i == last {
                clock + group.end + padding
            } else {
                clock + group.end
            };
            cues.push(KaraokeCue {
                start: clock + group.start,
                end,
                words: words[seg_first..=seg_last]
                    .iter()
                    .map(|w| (*w).to_string())
                    .collect(),
                active: (
                    group.first_word - seg_first,
                    group.last_word.min(seg_last) - seg_first,
                ),
            });
        }
        clock += entry.total_duration;
    }
    Ok(cues)
}

/// Generate the complete ASS file content.
pub fn generate_ass_file(
    cues: &[KaraokeCue],
    style: &AssStyle,
    highlight: &HighlightStyle,
    play_res: (u32, u32),
) -> String {
    let mut output = String::new();

    writeln!(output, "[Script Info]").unwrap();
    writeln!(output, "; Generated by slidecast").unwrap();
    writeln!(output, "ScriptType: v4.00+").unwrap();
    writeln!(output, "PlayResX: {}", play_res.0).unwrap();
    writeln!(output, "PlayResY: {}", play_res.1).unwrap();
    writeln!(output, "WrapStyle: 0").unwrap();
    writeln!(output, "ScaledBorderAndShadow: yes").unwrap();
    writeln!(output).unwrap();

    writeln!(output, "[V4+ Styles]").unwrap();
    writeln!(
        output,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    )
    .unwrap();
    writeln!(output, "{}", style.to_style_line()).unwrap();
    writeln!(output).unwrap();

    writeln!(output, "[Events]").unwrap();
    writeln!(
        output,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    )
    .unwrap();

    for cue in cues {
        writeln!(
            output,
            "Dialogue: 0,{start},{end},{style},,0,0,0,,{text}",
            start = format_ass_timestamp(cue.start),
            end = format_ass_timestamp(cue.end),
            style = style.name,
            text = format_karaoke_text(cue, highlight)
        )
        .unwrap();
    }

    output
}

/// Full segment text with the active group drawn on an animated box.
///
/// The box is the outline of the highlighted words (`\3c`, `\bord`), grown
/// from nothing over the first 100ms and eased back to a thinner border at
/// the end of the cue.
fn format_karaoke_text(cue: &KaraokeCue, highlight: &HighlightStyle) -> String {
    use ass_constants::*;

    let fill = highlight.fill(LayoutMode::Overlay);
    let box_color = override_color([fill.r, fill.g, fill.b]);
    let box_alpha = format!("&H{:02X}&", 255 - fill.a);
    let duration_cs = ((cue.end - cue.start) * 100.0).round().max(0.0) as u32;
    let scale_out_start = duration_cs.saturating_sub(BOX_SCALE_OUT_CS);

    let mut text = String::new();
    for (i, word) in cue.words.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let active = (cue.active.0..=cue.active.1).contains(&i);
        if active {
            write!(
                text,
                "{{\\1c{}\\3c{}\\3a{}\\bord{}\\blur{}\\t({},{},\\bord{})\\t({},{},\\bord{})}}",
                COLOR_HIGHLIGHT_TEXT,
                box_color,
                box_alpha,
                BORD_THICKNESS_NONE,
                BLUR_ROUNDED,
                0,
                BOX_SCALE_IN_CS,
                BORD_THICKNESS_FULL,
                scale_out_start,
                duration_cs,
                BORD_THICKNESS_MIN
            )
            .unwrap();
        } else {
            write!(text, "{{\\1c{}}}", COLOR_NORMAL).unwrap();
        }
        text.push_str(&escape_ass_text(word));
        if active {
            text.push_str("{\\r}");
        }
    }
    text
}

/// `&HAABBGGRR` for style lines; ASS alpha 00 is opaque.
fn style_color(rgb: [u8; 3], alpha: u8) -> String {
    let [r, g, b] = rgb;
    format!("&H{:02X}{b:02X}{g:02X}{r:02X}", 255 - alpha)
}

/// `&HBBGGRR&` for inline overrides.
fn override_color(rgb: [u8; 3]) -> String {
    let [r, g, b] = rgb;
    format!("&H{b:02X}{g:02X}{r:02X}&")
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc).
fn format_ass_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = total_cs / 360_000;
    let minutes = (total_cs % 360_000) / 6000;
    let secs = (total_cs % 6000) / 100;
    let centiseconds = total_cs % 100;
    format!("{hours}:{minutes:02}:{secs:02}.{centiseconds:02}")
}

/// Escape special characters in ASS text.
fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}
