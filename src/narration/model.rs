//! Caller-owned slide narration records.
//!
//! The engine only reads these; durations are already resolved by the
//! audio collaborator before a run starts.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which narration track drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Original,
    Translated,
}

impl Language {
    pub fn other(self) -> Self {
        match self {
            Language::Original => Language::Translated,
            Language::Translated => Language::Original,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Original => write!(f, "original"),
            Language::Translated => write!(f, "translated"),
        }
    }
}

/// A synthesized audio file and its decoded duration in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioRef {
    pub path: PathBuf,
    pub duration: f64,
}

impl AudioRef {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }

    /// Audio that can back a slide: resolvable and longer than zero.
    pub fn is_usable(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideNarration {
    /// 1-based position in the presentation
    pub slide_index: u32,
    pub narration_text: String,
    pub translated_text: Option<String>,
    pub primary_audio: Option<AudioRef>,
    pub translated_audio: Option<AudioRef>,
}

impl SlideNarration {
    pub fn new(slide_index: u32, narration_text: impl Into<String>) -> Self {
        Self {
            slide_index,
            narration_text: narration_text.into(),
            ..Self::default()
        }
    }

    pub fn with_translation(mut self, text: impl Into<String>) -> Self {
        self.translated_text = Some(text.into());
        self
    }

    pub fn with_primary_audio(mut self, audio: AudioRef) -> Self {
        self.primary_audio = Some(audio);
        self
    }

    pub fn with_translated_audio(mut self, audio: AudioRef) -> Self {
        self.translated_audio = Some(audio);
        self
    }

    pub fn audio_for(&self, language: Language) -> Option<&AudioRef> {
        match language {
            Language::Original => self.primary_audio.as_ref(),
            Language::Translated => self.translated_audio.as_ref(),
        }
    }

    /// Text shown on screen or in subtitles.
    ///
    /// With `use_translation` the translation wins when it has any
    /// non-whitespace content; otherwise the narration text is used.
    pub fn display_text(&self, use_translation: bool) -> &str {
        if use_translation {
            if let Some(translated) = self.translated_text.as_deref() {
                if !translated.trim().is_empty() {
                    return translated;
                }
            }
        }
        &self.narration_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_falls_back_to_narration() {
        let slide = SlideNarration::new(1, "Olá mundo").with_translation("   ");
        assert_eq!(slide.display_text(true), "Olá mundo");

        let slide = SlideNarration::new(1, "Olá mundo").with_translation("Hello world");
        assert_eq!(slide.display_text(true), "Hello world");
        assert_eq!(slide.display_text(false), "Olá mundo");
    }

    #[test]
    fn zero_length_audio_is_not_usable() {
        assert!(!AudioRef::new("a.mp3", 0.0).is_usable());
        assert!(!AudioRef::new("a.mp3", f64::NAN).is_usable());
        assert!(AudioRef::new("a.mp3", 0.01).is_usable());
    }

    #[test]
    fn language_other_swaps() {
        assert_eq!(Language::Original.other(), Language::Translated);
        assert_eq!(Language::Translated.other(), Language::Original);
        assert_eq!(Language::Translated.to_string(), "translated");
    }
}
