use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

/// Progress bar counting finished slides; hidden in JSON mode.
pub fn create_slide_progress(total: usize, message: impl Into<String>) -> ProgressBar {
    if get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:30}] {pos}/{len} slides")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_message(message.into());
    pb
}

/// Finish a progress bar and report success as an event
pub fn finish_progress_with_success(pb: ProgressBar, code: &str, message: impl Into<String>) {
    pb.finish_and_clear();
    emit(Level::Success, code, &message.into(), None);
}
