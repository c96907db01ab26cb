mod common;
mod narration;
mod ui;

use clap::Parser;
use std::path::PathBuf;

use crate::narration::{NarrationCommands, handle_narration_command};
use crate::ui::prelude::{Level, OutputFormat, emit};

/// Slidecast: timing, karaoke frames and subtitles for narrated slides
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug events
    #[arg(short, long, global = true)]
    debug: bool,

    /// Event output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Narration config file (defaults to <config dir>/slidecast/narration.toml)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: NarrationCommands,
}

fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = handle_narration_command(cli.command, cli.config.as_deref()) {
        emit(Level::Error, "slidecast.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
