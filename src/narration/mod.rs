//! Narrated slide engine: slide timing, caption segmentation, word timing,
//! caption layout, karaoke frame sequencing, subtitle tracks and
//! presentation export.

pub mod audio;
pub mod cli;
pub mod commands;
pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod frames;
mod logging;
pub mod manifest;
pub mod model;
pub mod render;
pub mod segmenter;
pub mod subtitles;
pub mod timeline;
pub mod word_timing;

pub use cli::NarrationCommands;
pub use commands::handle_narration_command;
