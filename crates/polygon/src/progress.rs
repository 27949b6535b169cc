use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a long terraform operation runs
pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    /// Hidden spinners keep verbose log output readable.
    pub fn start(message: impl Into<String>, hidden: bool) -> Self {
        let pb = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    pub fn finish_success(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} ✓", message));
    }

    pub fn finish_error(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} ✗", message));
    }
}
