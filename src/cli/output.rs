//! Output formatting and progress indicators

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::progress::{ProgressEvent, ProgressSink};

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Renders progress events on a spinner
///
/// Named events replace the spinner message; messages and completed steps
/// are printed above it. In quiet mode nothing is drawn.
#[derive(Debug)]
pub struct SpinnerProgress {
    spinner: Option<ProgressBar>,
}

impl SpinnerProgress {
    pub fn new(message: &str, quiet: bool) -> Self {
        Self {
            spinner: (!quiet).then(|| create_spinner(message)),
        }
    }

    /// Clear the spinner
    pub fn finish(self) {
        if let Some(spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl ProgressSink for SpinnerProgress {
    fn on_progress(&mut self, event: ProgressEvent) {
        let Some(spinner) = &self.spinner else {
            return;
        };
        if let Some(message) = &event.message {
            spinner.println(format!("{} {message}", status::INFO));
        }
        if let Some(name) = event.name {
            if event.completed {
                spinner.println(format!("{} {name}", status::SUCCESS));
            } else {
                spinner.set_message(name);
            }
        }
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
