//! Frame rasterisation into a scratch workspace.
//!
//! Frames are rendered into a temporary directory owned by the run. Only a
//! completed run copies them to the destination together with an ffconcat
//! list; on any failure the workspace is dropped and nothing is written.

pub mod ffmpeg;

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use super::frames::KaraokeFrame;
use super::logging::log_event;
use crate::ui::prelude::Level;

pub const CONCAT_FILE_NAME: &str = "frames.ffconcat";

pub trait FrameRenderer {
    fn render(&self, frame: &KaraokeFrame, output: &Path) -> Result<()>;
}

/// Scratch directory for one rendering run.
pub struct RunWorkspace {
    dir: TempDir,
    frames: Vec<(String, f64)>,
}

impl RunWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("slidecast-")
            .tempdir()
            .context("creating scratch directory")?;
        Ok(Self {
            dir,
            frames: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for the next frame; the frame is listed once [`Self::record`] is called.
    pub fn next_frame_path(&self) -> PathBuf {
        self.dir.path().join(frame_file_name(self.frames.len()))
    }

    pub fn record(&mut self, duration: f64) {
        let name = frame_file_name(self.frames.len());
        self.frames.push((name, duration));
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Copy every recorded frame into `destination` and write the concat
    /// list next to them. Returns the list's path.
    pub fn persist(self, destination: &Path) -> Result<PathBuf> {
        fs::create_dir_all(destination)
            .with_context(|| format!("creating frame directory {}", destination.display()))?;

        for (name, _) in &self.frames {
            let from = self.dir.path().join(name);
            let to = destination.join(name);
            fs::copy(&from, &to).with_context(|| {
                format!("copying {} to {}", from.display(), to.display())
            })?;
        }

        let concat_path = destination.join(CONCAT_FILE_NAME);
        fs::write(&concat_path, write_ffconcat(&self.frames))
            .with_context(|| format!("writing {}", concat_path.display()))?;
        Ok(concat_path)
    }
}

fn frame_file_name(position: usize) -> String {
    format!("frame_{position:05}.png")
}

/// ffconcat demuxer list. The last file is repeated so its duration is
/// honoured.
pub fn write_ffconcat(frames: &[(String, f64)]) -> String {
    let mut output = String::from("ffconcat version 1.0\n");
    for (name, duration) in frames {
        writeln!(output, "file '{}'", name.replace('\'', "'\\''")).unwrap();
        writeln!(output, "duration {duration:.6}").unwrap();
    }
    if let Some((name, _)) = frames.last() {
        writeln!(output, "file '{}'", name.replace('\'', "'\\''")).unwrap();
    }
    output
}

/// Render every frame in slide order and persist them to `destination`.
///
/// An existing destination is only replaced with `force`, and only once
/// every frame has rendered.
pub fn render_frames(
    frames: &BTreeMap<u32, Vec<KaraokeFrame>>,
    renderer: &dyn FrameRenderer,
    destination: &Path,
    force: bool,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<PathBuf> {
    if destination.exists() && !force {
        bail!(
            "Frame directory {} already exists. Use --force to overwrite.",
            destination.display()
        );
    }

    let mut workspace = RunWorkspace::new()?;
    log_event(
        Level::Debug,
        "narration.render.workspace",
        format!("Rendering into {}", workspace.path().display()),
    );

    let total = frames.len();
    for (done, slide_frames) in frames.values().enumerate() {
        for frame in slide_frames {
            let output = workspace.next_frame_path();
            renderer.render(frame, &output)?;
            workspace.record(frame.duration);
        }
        on_progress(done + 1, total);
    }

    if destination.exists() {
        fs::remove_dir_all(destination).with_context(|| {
            format!("removing existing frame directory {}", destination.display())
        })?;
    }
    let count = workspace.frame_count();
    let concat = workspace.persist(destination)?;
    log_event(
        Level::Success,
        "narration.render.done",
        format!("Rendered {count} frames to {}", destination.display()),
    );
    Ok(concat)
}
