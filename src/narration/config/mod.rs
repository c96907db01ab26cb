use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Import macro from crate root (#[macro_export] places it there)
use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;

use super::compositor::{HighlightStyle, KaraokePaging, LayoutConfig, LayoutMode};
use super::error::NarrationError;
use super::export::ExportSettings;
use super::frames::{FrameMode, FrameSettings};
use super::model::Language;
use super::segmenter::SegmentationConfig;
use super::subtitles::SubtitleSettings;
use super::timeline::TimelineSettings;

/// Settings for one generation run.
///
/// Loaded once, validated, then handed to each component by reference;
/// nothing reads it from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub language: Language,
    pub extra_padding_seconds: f64,
    pub minimum_duration_seconds: f64,
    pub words_per_minute: f64,
    pub max_chars_per_segment: usize,
    pub max_lines: usize,
    pub subtitle_line_width: usize,
    pub frame_mode: FrameMode,
    pub captions_use_translation: bool,
    pub karaoke_use_translation: bool,
    pub frame_width: u32,
    pub frame_height: u32,
    pub layout_mode: LayoutMode,
    pub caption_lines: usize,
    pub caption_margin: u32,
    pub font_family: String,
    pub min_visible_seconds: f64,
    pub karaoke_paging: KaraokePaging,
    pub highlight_color: String,
    pub highlight_opacity: u8,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            language: Language::Original,
            extra_padding_seconds: 0.5,
            minimum_duration_seconds: 3.0,
            words_per_minute: 150.0,
            max_chars_per_segment: 120,
            max_lines: 2,
            subtitle_line_width: 60,
            frame_mode: FrameMode::Karaoke,
            captions_use_translation: true,
            karaoke_use_translation: false,
            frame_width: 1920,
            frame_height: 1080,
            layout_mode: LayoutMode::Overlay,
            caption_lines: 3,
            caption_margin: 40,
            font_family: "DejaVu Sans".to_string(),
            min_visible_seconds: 0.3,
            karaoke_paging: KaraokePaging::Scroll,
            highlight_color: "Yellow".to_string(),
            highlight_opacity: 70,
        }
    }
}

documented_config!(NarrationConfig {
    fields: [
        language, "Audio track that drives slide timing (original or translated)",
        extra_padding_seconds, "Silence appended after each slide's audio",
        minimum_duration_seconds, "Duration of slides without any audio",
        words_per_minute, "Speaking rate used to estimate durations before audio exists",
        max_chars_per_segment, "Maximum characters per caption/subtitle segment",
        max_lines, "Maximum lines per caption/subtitle segment",
        subtitle_line_width, "Characters per subtitle line",
        frame_mode, "Frame sequence style (plain, captions or karaoke)",
        captions_use_translation, "Captions and subtitles show the translation when present",
        karaoke_use_translation, "Karaoke highlights the translation when present",
        frame_width, "Slide image width in pixels",
        frame_height, "Slide image height in pixels",
        layout_mode, "Caption band placement (overlay or separate-band)",
        caption_lines, "Lines visible in the on-screen caption band",
        caption_margin, "Horizontal caption margin in pixels",
        font_family, "Caption font family",
        min_visible_seconds, "Minimum time a karaoke highlight stays on screen",
        karaoke_paging, "How karaoke moves through long text (scroll or page)",
        highlight_color, "Karaoke highlight colour (Yellow, Cyan, Lime, Magenta, Orange, Pink, Aqua, Red, Green, Blue, White)",
        highlight_opacity, "Karaoke highlight opacity in percent (0-100)",
    ],
    config_path: paths::narration_config_path(),
});

impl NarrationConfig {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => <Self as DocumentedConfig>::config_path()?,
        };
        let config = <Self as DocumentedConfig>::load_from_path_documented(&path)?;
        config
            .validate()
            .with_context(|| format!("validating {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NarrationError> {
        self.timeline_settings().validate()?;
        self.segmentation().validate()?;
        self.subtitle_settings(self.captions_use_translation)
            .validate()?;
        self.layout()?.validate()?;
        if !(self.min_visible_seconds.is_finite() && self.min_visible_seconds > 0.0) {
            return Err(NarrationError::InvalidConfig(format!(
                "min_visible_seconds must be positive (got {})",
                self.min_visible_seconds
            )));
        }
        if !(self.words_per_minute.is_finite() && self.words_per_minute > 0.0) {
            return Err(NarrationError::InvalidConfig(format!(
                "words_per_minute must be positive (got {})",
                self.words_per_minute
            )));
        }
        Ok(())
    }

    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            language: self.language,
            extra_padding_seconds: self.extra_padding_seconds,
            minimum_duration_seconds: self.minimum_duration_seconds,
        }
    }

    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig::new(self.max_chars_per_segment, self.max_lines)
    }

    pub fn subtitle_settings(&self, use_translation: bool) -> SubtitleSettings {
        SubtitleSettings {
            segmentation: self.segmentation(),
            line_width: self.subtitle_line_width,
            use_translation,
        }
    }

    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            mode: self.frame_mode,
            captions_use_translation: self.captions_use_translation,
            karaoke_use_translation: self.karaoke_use_translation,
            min_visible_seconds: self.min_visible_seconds,
            segmentation: self.segmentation(),
        }
    }

    pub fn export_settings(
        &self,
        title: impl Into<String>,
        use_translation: bool,
    ) -> Result<ExportSettings, NarrationError> {
        Ok(ExportSettings {
            title: title.into(),
            language: self.language,
            karaoke_use_translation: use_translation,
            words_per_minute: self.words_per_minute,
            min_visible_seconds: self.min_visible_seconds,
            paging: self.karaoke_paging,
            highlight: HighlightStyle::named(&self.highlight_color, self.highlight_opacity)?,
        })
    }

    pub fn layout(&self) -> Result<LayoutConfig, NarrationError> {
        Ok(LayoutConfig {
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            mode: self.layout_mode,
            max_lines: self.caption_lines,
            margin: self.caption_margin,
            font_family: self.font_family.clone(),
            highlight: HighlightStyle::named(&self.highlight_color, self.highlight_opacity)?,
            paging: self.karaoke_paging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = NarrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout().unwrap(), LayoutConfig::default());
        assert_eq!(config.timeline_settings(), TimelineSettings::default());
        assert_eq!(config.segmentation(), SegmentationConfig::default());
    }

    #[test]
    fn documented_toml_describes_every_field() {
        let toml = NarrationConfig::default().to_documented_toml();
        assert!(toml.contains("language = \"original\"  # Audio track"));
        assert!(toml.contains("extra_padding_seconds = 0.5  #"));
        assert!(toml.contains("layout_mode = \"overlay\"  #"));
        assert!(toml.contains("highlight_opacity = 70  #"));
        assert_eq!(
            toml.lines().count(),
            NarrationConfig::field_metadata().len()
        );
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("narration.toml");

        let config = NarrationConfig::load(Some(&path)).unwrap();
        assert_eq!(config, NarrationConfig::default());
        assert!(path.exists());

        let reloaded = NarrationConfig::load(Some(&path)).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narration.toml");
        fs::write(
            &path,
            "language = \"translated\"\nlayout_mode = \"separate-band\"\nkaraoke_paging = \"page\"\n",
        )
        .unwrap();

        let config = NarrationConfig::load(Some(&path)).unwrap();
        assert_eq!(config.language, Language::Translated);
        assert_eq!(config.layout_mode, LayoutMode::SeparateBand);
        assert_eq!(config.karaoke_paging, KaraokePaging::Page);
        assert_eq!(config.extra_padding_seconds, 0.5);
        assert_eq!(config.frame_mode, FrameMode::Karaoke);
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narration.toml");
        let config = NarrationConfig {
            frame_mode: FrameMode::Captions,
            highlight_color: "Cyan".into(),
            minimum_duration_seconds: 4.25,
            ..NarrationConfig::default()
        };
        config.save_with_documentation(&path).unwrap();
        assert_eq!(NarrationConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            NarrationConfig {
                minimum_duration_seconds: 0.0,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                extra_padding_seconds: -1.0,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                max_lines: 0,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                highlight_color: "Mauve".into(),
                ..NarrationConfig::default()
            },
            NarrationConfig {
                highlight_opacity: 150,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                min_visible_seconds: 0.0,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                words_per_minute: 0.0,
                ..NarrationConfig::default()
            },
            NarrationConfig {
                subtitle_line_width: 0,
                ..NarrationConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narration.toml");
        fs::write(&path, "minimum_duration_seconds = -2.0\n").unwrap();
        assert!(NarrationConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn export_settings_follow_the_config() {
        let config = NarrationConfig {
            words_per_minute: 180.0,
            karaoke_paging: KaraokePaging::Page,
            highlight_color: "Cyan".into(),
            ..NarrationConfig::default()
        };
        let settings = config.export_settings("deck", true).unwrap();
        assert_eq!(settings.title, "deck");
        assert!(settings.karaoke_use_translation);
        assert_eq!(settings.words_per_minute, 180.0);
        assert_eq!(settings.paging, KaraokePaging::Page);
        assert_eq!(settings.highlight.rgb, [0, 255, 255]);
    }
}
