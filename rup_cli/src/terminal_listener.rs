use indicatif::{ProgressBar, ProgressStyle};

use rup_core::progress::{format_bytes, ProgressListener, UploadProgress};

/// Renders upload progress as an indicatif bar, or a spinner when the body
/// size is unknown.
pub struct TerminalProgressListener {
    bar: ProgressBar,
}

impl TerminalProgressListener {
    pub fn new(total_bytes: Option<u64>) -> Self {
        let bar = match total_bytes {
            Some(total) => {
                let style = ProgressStyle::with_template(
                    "[{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) ETA {eta} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-");
                let pb = ProgressBar::new(total.max(1));
                pb.set_style(style);
                pb
            }
            None => {
                let style = ProgressStyle::with_template(
                    "{spinner} {bytes} sent ({binary_bytes_per_sec}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
                let pb = ProgressBar::new_spinner();
                pb.set_style(style);
                pb
            }
        };
        Self { bar }
    }

    /// Leaves the bar on screen with the failure reason.
    pub fn fail(&self, error: &str) {
        self.bar.abandon_with_message(format!("Failed: {}", error));
    }
}

impl ProgressListener for TerminalProgressListener {
    fn on_progress(&self, bytes_written: u64, _total_bytes: Option<u64>, done: bool) {
        self.bar.set_position(bytes_written);
        if done {
            self.bar
                .finish_with_message(format!("Sent {}", format_bytes(bytes_written)));
        }
    }
}

/// Prints one JSON object per notification, for scripts.
pub struct JsonLinesListener;

impl ProgressListener for JsonLinesListener {
    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>, done: bool) {
        match json_line(bytes_written, total_bytes, done) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to serialize progress event: {}", e),
        }
    }
}

fn json_line(bytes_written: u64, total_bytes: Option<u64>, done: bool) -> serde_json::Result<String> {
    serde_json::to_string(&UploadProgress::new(bytes_written, total_bytes, done))
}
