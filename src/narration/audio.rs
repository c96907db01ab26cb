//! Audio duration lookup.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use super::logging::log_event;
use crate::ui::prelude::Level;

/// Resolves the playable length of an audio file in seconds.
///
/// Missing or unreadable files resolve to 0.0 so the timeline treats the
/// slide as silent.
pub trait AudioDurationResolver {
    fn duration_seconds(&self, path: &Path) -> f64;
}

/// Asks `ffprobe` for the container duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeResolver;

impl AudioDurationResolver for FfprobeResolver {
    fn duration_seconds(&self, path: &Path) -> f64 {
        if !path.exists() {
            log_event(
                Level::Warn,
                "narration.audio.missing",
                format!("Audio file {} does not exist", path.display()),
            );
            return 0.0;
        }
        match probe_duration_seconds(path) {
            Ok(duration) if duration.is_finite() && duration >= 0.0 => duration,
            Ok(duration) => {
                log_event(
                    Level::Warn,
                    "narration.audio.bad_duration",
                    format!("ffprobe reported {duration} for {}", path.display()),
                );
                0.0
            }
            Err(err) => {
                log_event(
                    Level::Warn,
                    "narration.audio.unreadable",
                    format!("{err:#}"),
                );
                0.0
            }
        }
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Reading ffprobe duration for {}", path.display()))
}

fn parse_duration_output(stdout: &str) -> Result<f64> {
    stdout
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")
}
