use std::fmt::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use super::FrameRenderer;
use crate::narration::compositor::{CaptionLayout, LayoutConfig, LayoutMode, Rect, Rgba};
use crate::narration::frames::KaraokeFrame;

pub trait FfmpegRunner {
    fn run(&self, args: &[String]) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String]) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(args)
            .output()
            .context("Failed to spawn ffmpeg")?;
        if !output.status.success() {
            bail!(
                "ffmpeg exited with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Rasterises one frame per ffmpeg call: scale the slide, pad it for a
/// separate band, then draw the band, highlight boxes and caption lines.
pub struct FfmpegFrameRenderer<R: FfmpegRunner> {
    runner: R,
    layout: LayoutConfig,
}

impl<R: FfmpegRunner> FfmpegFrameRenderer<R> {
    pub fn new(runner: R, layout: LayoutConfig) -> Self {
        Self { runner, layout }
    }

    pub fn build_args(&self, frame: &KaraokeFrame, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            frame.content.slide_image.to_string_lossy().into_owned(),
            "-vf".into(),
            self.filter_graph(frame.content.caption.as_ref()),
            "-frames:v".into(),
            "1".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    pub fn filter_graph(&self, caption: Option<&CaptionLayout>) -> String {
        let mut filters = vec![format!(
            "scale={}:{}",
            self.layout.frame_width, self.layout.frame_height
        )];
        if self.layout.mode == LayoutMode::SeparateBand {
            let (width, height) = self.layout.canvas_size();
            filters.push(format!("pad={width}:{height}:0:0:black"));
        }

        if let Some(caption) = caption {
            filters.push(drawbox(&caption.band, caption.band_fill));
            if let Some(fill) = caption.highlight_fill {
                filters.extend(caption.highlights.iter().map(|rect| drawbox(rect, fill)));
            }
            for line in &caption.lines {
                let mut filter = String::new();
                write!(
                    filter,
                    "drawtext=font='{}':fontsize={}:fontcolor=white:x={}:y={}:text='{}'",
                    escape_filter_text(&caption.font.family),
                    caption.font.size_px,
                    line.x,
                    line.y,
                    escape_filter_text(&line.text)
                )
                .unwrap();
                filters.push(filter);
            }
        }
        filters.join(",")
    }
}

impl<R: FfmpegRunner> FrameRenderer for FfmpegFrameRenderer<R> {
    fn render(&self, frame: &KaraokeFrame, output: &Path) -> Result<()> {
        self.runner
            .run(&self.build_args(frame, output))
            .with_context(|| format!("rendering slide {} frame", frame.slide_index))
    }
}

fn drawbox(rect: &Rect, fill: Rgba) -> String {
    format!(
        "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill",
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        ffmpeg_color(fill)
    )
}

/// `0xRRGGBB@alpha` with alpha in 0..=1.
pub fn ffmpeg_color(color: Rgba) -> String {
    format!(
        "0x{:02X}{:02X}{:02X}@{:.3}",
        color.r,
        color.g,
        color.b,
        color.a as f64 / 255.0
    )
}

/// Escape text for a single-quoted filter option value.
pub fn escape_filter_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace('%', "\\%")
}
