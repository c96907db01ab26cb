use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

use crate::common::config::DocumentedConfig;
use crate::common::progress::{create_slide_progress, finish_progress_with_success};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

use super::audio::FfprobeResolver;
use super::cli::{
    CheckArgs, ConfigCommands, ExportArgs, FramesArgs, NarrationCommands, SubtitleFormat,
    SubtitlesArgs, TimelineArgs,
};
use super::compositor::{CaptionCompositor, EstimatedWidthMeasurer};
use super::config::NarrationConfig;
use super::export::build_presentation;
use super::frames::{FrameContext, FramePlan, generate_karaoke_frames};
use super::manifest::Manifest;
use super::model::{Language, SlideNarration};
use super::render::ffmpeg::{FfmpegFrameRenderer, SystemFfmpegRunner};
use super::render::render_frames;
use super::subtitles::ass::{AssStyle, generate_ass_file, generate_karaoke_cues};
use super::subtitles::generate_subtitles;
use super::subtitles::srt::{check_track, parse_srt, write_srt};
use super::timeline::{TimelineEntry, build_timeline, total_runtime};
use super::word_timing::WordTimings;

pub fn handle_narration_command(
    command: NarrationCommands,
    config_path: Option<&Path>,
) -> Result<()> {
    match command {
        NarrationCommands::Timeline(args) => handle_timeline(args, config_path),
        NarrationCommands::Subtitles(args) => handle_subtitles(args, config_path),
        NarrationCommands::Frames(args) => handle_frames(args, config_path),
        NarrationCommands::Export(args) => handle_export(args, config_path),
        NarrationCommands::Check(args) => handle_check(args),
        NarrationCommands::Config { command } => handle_config(command, config_path),
    }
}

/// Manifest slides with resolved audio and their timeline.
struct LoadedRun {
    manifest: Manifest,
    slides: Vec<SlideNarration>,
    timelines: Vec<TimelineEntry>,
}

fn load_run(manifest_path: &Path, config: &NarrationConfig) -> Result<LoadedRun> {
    let manifest = Manifest::load(manifest_path)?;
    if manifest.slides.is_empty() {
        bail!("Manifest {} contains no slides", manifest_path.display());
    }
    let slides = manifest.to_slides(&FfprobeResolver);
    let timelines = build_timeline(&slides, &config.timeline_settings())
        .with_context(|| format!("building timeline for {}", manifest_path.display()))?;
    Ok(LoadedRun {
        manifest,
        slides,
        timelines,
    })
}

fn load_config(config_path: Option<&Path>, language: Option<Language>) -> Result<NarrationConfig> {
    let mut config = NarrationConfig::load(config_path)?;
    if let Some(language) = language {
        config.language = language;
    }
    Ok(config)
}

fn check_output_file(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Output file {} already exists. Use --force to overwrite.",
            path.display()
        );
    }
    Ok(())
}

/// Write through a temporary file in the target directory, so an existing
/// file is only replaced by complete new contents.
fn write_output_file(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create output directory {}", parent.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp_file
        .write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    temp_file
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn handle_timeline(args: TimelineArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, args.language)?;
    let run = load_run(&args.manifest, &config)?;

    let slides: HashMap<u32, &SlideNarration> =
        run.slides.iter().map(|s| (s.slide_index, s)).collect();
    for entry in &run.timelines {
        if !entry.has_audio() {
            if let Some(slide) = slides.get(&entry.slide_index) {
                let estimate = WordTimings::estimate(&slide.narration_text, config.words_per_minute)?;
                emit(
                    Level::Debug,
                    "narration.timeline.estimate",
                    &format!(
                        "Slide {}: about {:.1}s of speech at {} wpm once recorded",
                        entry.slide_index,
                        estimate.governing_duration(),
                        config.words_per_minute
                    ),
                    None,
                );
            }
        }
        emit(
            Level::Info,
            "narration.timeline.slide",
            &format!(
                "Slide {:>3}: {:>7.2}s  audio {:>6.2}s  {}",
                entry.slide_index,
                entry.total_duration,
                entry.audio_duration_used,
                entry.source_label()
            ),
            serde_json::to_value(entry).ok(),
        );
    }
    emit(
        Level::Success,
        "narration.timeline.total",
        &format!(
            "{} slides, {:.2}s total ({} audio)",
            run.timelines.len(),
            total_runtime(&run.timelines),
            config.language
        ),
        None,
    );
    Ok(())
}

fn handle_subtitles(args: SubtitlesArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, args.language)?;
    let out_file = args
        .out_file
        .clone()
        .unwrap_or_else(|| args.manifest.with_extension(args.format.extension()));
    check_output_file(&out_file, args.force)?;

    let run = load_run(&args.manifest, &config)?;
    let use_translation = match (args.text, args.format) {
        (Some(text), _) => text == Language::Translated,
        (None, SubtitleFormat::Srt) => config.captions_use_translation,
        (None, SubtitleFormat::Ass) => config.karaoke_use_translation,
    };
    let settings = config.subtitle_settings(use_translation);

    let contents = match args.format {
        SubtitleFormat::Srt => {
            let pb = create_slide_progress(run.slides.len(), "Subtitles");
            let entries = generate_subtitles(&run.slides, &run.timelines, &settings, &mut |done, _| {
                pb.set_position(done as u64)
            })?;
            finish_progress_with_success(
                pb,
                "narration.subtitles.generated",
                format!("Generated {} subtitle cues", entries.len()),
            );
            write_srt(&entries)
        }
        SubtitleFormat::Ass => {
            let layout = config.layout()?;
            let cues = generate_karaoke_cues(
                &run.slides,
                &run.timelines,
                &settings,
                config.min_visible_seconds,
            )?;
            emit(
                Level::Success,
                "narration.subtitles.generated",
                &format!("Generated {} karaoke cues", cues.len()),
                None,
            );
            generate_ass_file(
                &cues,
                &AssStyle::for_layout(&layout),
                &layout.highlight,
                layout.canvas_size(),
            )
        }
    };

    write_output_file(&out_file, &contents)
        .with_context(|| format!("writing subtitles to {}", out_file.display()))?;
    emit(
        Level::Success,
        "narration.subtitles.written",
        &format!("Wrote {}", out_file.display()),
        None,
    );
    Ok(())
}

fn handle_frames(args: FramesArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path, args.language)?;
    if let Some(mode) = args.mode {
        config.frame_mode = mode;
    }
    let out_file = args
        .out_file
        .clone()
        .unwrap_or_else(|| args.manifest.with_extension("frames.json"));
    check_output_file(&out_file, args.force)?;

    let run = load_run(&args.manifest, &config)?;
    let layout = config.layout()?;
    let settings = config.frame_settings();
    let measurer = EstimatedWidthMeasurer::default();
    let images = run.manifest.images();
    let ctx = FrameContext {
        settings: &settings,
        compositor: CaptionCompositor::new(&measurer, &layout),
        images: &images,
    };

    let pb = create_slide_progress(run.slides.len(), "Frames");
    let frames = generate_karaoke_frames(&run.slides, &run.timelines, &ctx, &mut |done, _| {
        pb.set_position(done as u64)
    })?;
    let frame_count: usize = frames.values().map(Vec::len).sum();
    finish_progress_with_success(
        pb,
        "narration.frames.generated",
        format!(
            "Generated {frame_count} {} frames for {} slides",
            config.frame_mode,
            frames.len()
        ),
    );

    let plan = FramePlan::new(config.frame_mode, layout.canvas_size(), &frames);
    let json = serde_json::to_string_pretty(&plan).context("serializing frame plan")?;
    write_output_file(&out_file, &json)
        .with_context(|| format!("writing frame plan to {}", out_file.display()))?;
    emit(
        Level::Success,
        "narration.frames.plan_written",
        &format!("Wrote frame plan to {}", out_file.display()),
        None,
    );

    if let Some(render_dir) = args.render {
        let renderer = FfmpegFrameRenderer::new(SystemFfmpegRunner, layout.clone());
        let pb = create_slide_progress(frames.len(), "Rendering");
        let concat = render_frames(&frames, &renderer, &render_dir, args.force, &mut |done, _| {
            pb.set_position(done as u64)
        })?;
        finish_progress_with_success(
            pb,
            "narration.frames.concat_written",
            format!("Wrote {}", concat.display()),
        );
    }
    Ok(())
}

fn handle_export(args: ExportArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, args.language)?;
    let out_file = args
        .out_file
        .clone()
        .unwrap_or_else(|| args.manifest.with_extension("presentation.json"));
    check_output_file(&out_file, args.force)?;

    let run = load_run(&args.manifest, &config)?;
    let use_translation = match args.text {
        Some(text) => text == Language::Translated,
        None => config.karaoke_use_translation,
    };
    let title = args
        .manifest
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let settings = config.export_settings(title, use_translation)?;
    let images = run.manifest.images();

    let pb = create_slide_progress(run.slides.len(), "Export");
    let presentation = build_presentation(
        &run.slides,
        &run.timelines,
        &images,
        &settings,
        &mut |done, _| pb.set_position(done as u64),
    )?;
    let word_count: usize = presentation.slides.iter().map(|s| s.words.len()).sum();
    finish_progress_with_success(
        pb,
        "narration.export.generated",
        format!(
            "Timed {word_count} words over {} slides ({:.2}s)",
            presentation.slides.len(),
            presentation.total_duration
        ),
    );

    let json = serde_json::to_string_pretty(&presentation).context("serializing presentation")?;
    write_output_file(&out_file, &json)
        .with_context(|| format!("writing presentation to {}", out_file.display()))?;
    emit(
        Level::Success,
        "narration.export.written",
        &format!("Wrote {}", out_file.display()),
        None,
    );
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read subtitle file {}", args.file.display()))?;
    let cues = parse_srt(&contents)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    let issues = check_track(&cues, args.line_width);

    for issue in &issues {
        emit(Level::Warn, "narration.check.issue", &issue.to_string(), None);
    }
    if !issues.is_empty() {
        bail!(
            "{} has {} problem(s) in {} cues",
            args.file.display(),
            issues.len(),
            cues.len()
        );
    }

    let duration = cues.last().map(|cue| cue.end.as_secs_f64()).unwrap_or(0.0);
    emit(
        Level::Success,
        "narration.check.valid",
        &format!(
            "{} is valid: {} cues, {:.2}s",
            args.file.display(),
            cues.len(),
            duration
        ),
        None,
    );
    Ok(())
}

fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => <NarrationConfig as DocumentedConfig>::config_path(),
    }
}

fn handle_config(command: ConfigCommands, config_path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = NarrationConfig::load(config_path)?;
            match get_output_format() {
                OutputFormat::Json => emit(
                    Level::Info,
                    "narration.config.show",
                    "Narration config",
                    serde_json::to_value(&config).ok(),
                ),
                OutputFormat::Text => print!("{}", config.to_documented_toml()),
            }
        }
        ConfigCommands::Path => {
            let path = resolve_config_path(config_path)?;
            emit(
                Level::Info,
                "narration.config.path",
                &path.display().to_string(),
                None,
            );
        }
        ConfigCommands::Init { force } => {
            let path = resolve_config_path(config_path)?;
            if path.exists() && !force {
                bail!(
                    "Config {} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            NarrationConfig::default().save_with_documentation(&path)?;
            emit(
                Level::Success,
                "narration.config.initialized",
                &format!("Wrote default config to {}", path.display()),
                None,
            );
        }
    }
    Ok(())
}
