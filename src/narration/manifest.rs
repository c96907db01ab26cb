//! Slide manifests: the narration input of every command.
//!
//! ```toml
//! images_dir = "slides"
//!
//! [[slides]]
//! index = 1
//! text = "Welcome to the course."
//! translated_text = "Bem-vindo ao curso."
//! audio = "audio/slide_1.mp3"
//! audio_duration = 4.2
//! ```
//!
//! JSON manifests use the same field names. Relative paths resolve against
//! the manifest's directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::audio::AudioDurationResolver;
use super::frames::{ImageDirectory, SlideImageProvider};
use super::logging::log_event;
use super::model::{AudioRef, SlideNarration};
use crate::ui::prelude::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    /// `.json` files are JSON, everything else is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ManifestFormat::Json,
            _ => ManifestFormat::Toml,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    /// Seconds; probed from `audio` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_audio: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_audio_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<PathBuf>,
    #[serde(default)]
    pub slides: Vec<SlideEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::parse(&contents, ManifestFormat::from_path(path), base_dir)
            .with_context(|| format!("parsing manifest {}", path.display()))
    }

    /// Parse manifest text, resolving relative paths against `base_dir`.
    pub fn parse(contents: &str, format: ManifestFormat, base_dir: &Path) -> Result<Self> {
        let mut manifest: Manifest = match format {
            ManifestFormat::Toml => toml::from_str(contents).context("invalid TOML manifest")?,
            ManifestFormat::Json => {
                serde_json::from_str(contents).context("invalid JSON manifest")?
            }
        };
        manifest.resolve_paths(base_dir);
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        match self.images_dir.as_mut() {
            Some(dir) => resolve(dir),
            None => self.images_dir = Some(base_dir.to_path_buf()),
        }
        for slide in &mut self.slides {
            slide.audio.iter_mut().for_each(resolve);
            slide.translated_audio.iter_mut().for_each(resolve);
            slide.image.iter_mut().for_each(resolve);
        }
    }

    /// Narration records with every audio duration resolved.
    pub fn to_slides(&self, resolver: &dyn AudioDurationResolver) -> Vec<SlideNarration> {
        self.slides
            .iter()
            .map(|entry| SlideNarration {
                slide_index: entry.index,
                narration_text: entry.text.clone(),
                translated_text: entry.translated_text.clone(),
                primary_audio: audio_ref(
                    entry.index,
                    entry.audio.as_deref(),
                    entry.audio_duration,
                    resolver,
                ),
                translated_audio: audio_ref(
                    entry.index,
                    entry.translated_audio.as_deref(),
                    entry.translated_audio_duration,
                    resolver,
                ),
            })
            .collect()
    }

    pub fn images(&self) -> ManifestImages {
        ManifestImages {
            overrides: self
                .slides
                .iter()
                .filter_map(|slide| slide.image.clone().map(|image| (slide.index, image)))
                .collect(),
            fallback: ImageDirectory::new(
                self.images_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            ),
        }
    }
}

fn audio_ref(
    slide_index: u32,
    path: Option<&Path>,
    duration: Option<f64>,
    resolver: &dyn AudioDurationResolver,
) -> Option<AudioRef> {
    let Some(path) = path else {
        if duration.is_some() {
            log_event(
                Level::Debug,
                "narration.manifest.orphan_duration",
                format!("Slide {slide_index}: audio duration given without an audio file"),
            );
        }
        return None;
    };
    let duration = duration.unwrap_or_else(|| resolver.duration_seconds(path));
    Some(AudioRef::new(path, duration))
}

/// Per-slide image overrides on top of an image directory.
#[derive(Debug, Clone)]
pub struct ManifestImages {
    overrides: HashMap<u32, PathBuf>,
    fallback: ImageDirectory,
}

impl SlideImageProvider for ManifestImages {
    fn slide_image(&self, slide_index: u32) -> PathBuf {
        self.overrides
            .get(&slide_index)
            .cloned()
            .unwrap_or_else(|| self.fallback.slide_image(slide_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records which files were probed.
    struct FixedResolver {
        duration: f64,
        probed: RefCell<Vec<PathBuf>>,
    }

    impl AudioDurationResolver for FixedResolver {
        fn duration_seconds(&self, path: &Path) -> f64 {
            self.probed.borrow_mut().push(path.to_path_buf());
            self.duration
        }
    }

    fn resolver(duration: f64) -> FixedResolver {
        FixedResolver {
            duration,
            probed: RefCell::new(Vec::new()),
        }
    }

    const TOML_MANIFEST: &str = r#"
images_dir = "slides"

[[slides]]
index = 1
text = "Hello world"
audio = "audio/one.mp3"
audio_duration = 4.0

[[slides]]
index = 2
text = "Olá"
translated_text = "Hi"
audio = "/abs/two.mp3"
translated_audio = "audio/two_en.mp3"
translated_audio_duration = 2.5
image = "custom.png"
"#;

    #[test]
    fn toml_manifest_resolves_relative_paths() {
        let base = Path::new("/work/deck");
        let manifest = Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml, base).unwrap();

        assert_eq!(manifest.images_dir, Some(base.join("slides")));
        assert_eq!(manifest.slides.len(), 2);
        assert_eq!(manifest.slides[0].audio, Some(base.join("audio/one.mp3")));
        assert_eq!(manifest.slides[1].audio, Some(PathBuf::from("/abs/two.mp3")));
        assert_eq!(manifest.slides[1].image, Some(base.join("custom.png")));
    }

    #[test]
    fn missing_durations_are_probed() {
        let manifest =
            Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml, Path::new("/deck")).unwrap();
        let resolver = resolver(7.25);
        let slides = manifest.to_slides(&resolver);

        assert_eq!(slides[0].primary_audio, Some(AudioRef::new("/deck/audio/one.mp3", 4.0)));
        assert_eq!(slides[1].primary_audio, Some(AudioRef::new("/abs/two.mp3", 7.25)));
        assert_eq!(
            slides[1].translated_audio,
            Some(AudioRef::new("/deck/audio/two_en.mp3", 2.5))
        );
        assert_eq!(slides[1].translated_text.as_deref(), Some("Hi"));
        assert_eq!(*resolver.probed.borrow(), vec![PathBuf::from("/abs/two.mp3")]);
    }

    #[test]
    fn json_manifest_without_images_dir() {
        let json = r#"{"slides": [{"index": 3, "text": "Only text"}]}"#;
        let base = Path::new("/deck");
        let manifest = Manifest::parse(json, ManifestFormat::Json, base).unwrap();
        let slides = manifest.to_slides(&resolver(1.0));

        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].slide_index, 3);
        assert!(slides[0].primary_audio.is_none());
        assert_eq!(
            manifest.images().slide_image(3),
            PathBuf::from("/deck/slide_3.png")
        );
    }

    #[test]
    fn image_overrides_take_precedence() {
        let manifest =
            Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml, Path::new("/deck")).unwrap();
        let images = manifest.images();
        assert_eq!(images.slide_image(1), PathBuf::from("/deck/slides/slide_1.png"));
        assert_eq!(images.slide_image(2), PathBuf::from("/deck/custom.png"));
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.json");
        fs::write(&path, r#"{"slides": [{"index": 1, "text": "a"}]}"#).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.slides[0].text, "a");
        assert_eq!(manifest.images_dir, Some(dir.path().to_path_buf()));

        let bad = dir.path().join("deck.toml");
        fs::write(&bad, "[[slides]]\ntext = 'no index'\n").unwrap();
        assert!(Manifest::load(&bad).is_err());
        assert!(Manifest::load(&dir.path().join("absent.toml")).is_err());
    }
}
