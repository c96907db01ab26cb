use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory holding a manifest and its own narration config.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("slidecast-test-").tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config file used by every command run in this environment
    pub fn config_path(&self) -> PathBuf {
        self.path().join("narration.toml")
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Three slides: primary audio, translated audio only, and silent.
    /// Durations are given explicitly so no audio files or ffprobe are needed.
    pub fn write_deck(&self) -> Result<PathBuf> {
        self.write_file(
            "deck.toml",
            r#"
images_dir = "slides"

[[slides]]
index = 1
text = "Welcome to the course. Today we look at how narration drives the slides."
translated_text = "Bem-vindo ao curso. Hoje vemos como a narração conduz os slides."
audio = "audio/slide_1.mp3"
audio_duration = 4.0

[[slides]]
index = 2
text = "Only the translation was recorded for this one."
translated_audio = "audio/slide_2_en.mp3"
translated_audio_duration = 2.0

[[slides]]
index = 3
text = "A silent slide."
"#,
        )
    }
}
