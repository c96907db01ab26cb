use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontSpec {
    pub family: String,
    pub size_px: u32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: u32) -> Self {
        Self {
            family: family.into(),
            size_px,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasureError {
    #[error("text measurement backend unavailable: {0}")]
    Unavailable(String),

    #[error("font '{family}' cannot be measured at {size_px}px")]
    UnsupportedFont { family: String, size_px: u32 },
}

/// Pixel width of a run of text in a given font.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Result<u32, MeasureError>;
}

/// Width approximation from an average glyph advance, expressed as a
/// fraction of the font size.
///
/// Good enough for sans-serif Latin text; the ffmpeg renderer uses the same
/// numbers, so highlight boxes line up with what gets drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedWidthMeasurer {
    pub advance_ratio: f64,
}

impl Default for EstimatedWidthMeasurer {
    fn default() -> Self {
        Self {
            advance_ratio: 0.55,
        }
    }
}

impl EstimatedWidthMeasurer {
    pub fn new(advance_ratio: f64) -> Self {
        Self { advance_ratio }
    }
}

impl TextMeasurer for EstimatedWidthMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Result<u32, MeasureError> {
        if font.size_px == 0 || !(self.advance_ratio > 0.0) {
            return Err(MeasureError::UnsupportedFont {
                family: font.family.clone(),
                size_px: font.size_px,
            });
        }
        let advance = font.size_px as f64 * self.advance_ratio;
        Ok((text.chars().count() as f64 * advance).round() as u32)
    }
}
