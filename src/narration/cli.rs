use clap::{Args, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

use super::frames::FrameMode;
use super::model::Language;

#[derive(Subcommand, Debug, Clone)]
pub enum NarrationCommands {
    /// Show how long each slide stays on screen and which audio drives it
    Timeline(TimelineArgs),
    /// Write a subtitle track (SRT, or ASS with karaoke highlighting)
    Subtitles(SubtitlesArgs),
    /// Build the frame plan and optionally render the frames with ffmpeg
    Frames(FramesArgs),
    /// Export presentation data (slides, audio, texts and timed words) as JSON
    Export(ExportArgs),
    /// Validate an SRT file: numbering, ordering, overlaps and line layout
    Check(CheckArgs),
    /// Inspect or create the narration config
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TimelineArgs {
    /// Slide manifest (TOML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Audio track that drives slide timing (overrides the config)
    #[arg(long, value_enum)]
    pub language: Option<Language>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleFormat {
    #[default]
    Srt,
    Ass,
}

impl SubtitleFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SubtitlesArgs {
    /// Slide manifest (TOML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Output file; defaults to the manifest path with a .srt/.ass extension
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SubtitleFormat::Srt)]
    pub format: SubtitleFormat,

    /// Audio track that drives slide timing (overrides the config)
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Text shown in the subtitles; defaults to the translation when present
    /// for SRT and to the narration text for ASS karaoke
    #[arg(long, value_enum)]
    pub text: Option<Language>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FramesArgs {
    /// Slide manifest (TOML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Frame plan output; defaults to <manifest>.frames.json
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Frame sequence style (overrides the config)
    #[arg(long, value_enum)]
    pub mode: Option<FrameMode>,

    /// Audio track that drives slide timing (overrides the config)
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Rasterise the frames into this directory and write an ffconcat list
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub render: Option<PathBuf>,

    /// Overwrite existing outputs
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Slide manifest (TOML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Output file; defaults to <manifest>.presentation.json
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Audio track that drives slide timing (overrides the config)
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Text the word timings follow; defaults to the karaoke setting
    #[arg(long, value_enum)]
    pub text: Option<Language>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// SRT file to validate
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Also flag lines longer than this many characters
    #[arg(long)]
    pub line_width: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective config with field descriptions
    Show,
    /// Print the config file location
    Path,
    /// Write a documented default config
    Init {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
}
