//! Terminal progress reporting.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use meetnotes_core::{ProgressReporter, SynthesisResult};
use meetnotes_shared::SourceRecord;

/// CLI progress reporter using an indicatif spinner on stderr.
pub(crate) struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_ready(&self, record: &SourceRecord, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Read [{current}/{total}] {} {} ({})",
            record.provenance(),
            record.origin(),
            record.status()
        ));
    }

    fn done(&self, _result: &SynthesisResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Failed runs never reach `done`.
        self.spinner.finish_and_clear();
    }
}
