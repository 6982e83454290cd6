use tokio::sync::watch;

use super::listener::ProgressListener;
use super::snapshot::UploadProgress;

/// Publishes every notification to a `watch` channel so any number of
/// receivers (UI tasks, SSE handlers) can follow the latest state.
///
/// `send` on a watch channel never blocks, which keeps the write path fast.
pub struct WatchProgressListener {
    tx: watch::Sender<UploadProgress>,
}

impl WatchProgressListener {
    /// Creates the listener together with a receiver that can be cloned and
    /// handed to consumers.
    pub fn new() -> (Self, watch::Receiver<UploadProgress>) {
        let (tx, rx) = watch::channel(UploadProgress::default());
        (Self { tx }, rx)
    }
}

impl ProgressListener for WatchProgressListener {
    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>, done: bool) {
        // send_replace keeps the value current even with no receiver left.
        self.tx
            .send_replace(UploadProgress::new(bytes_written, total_bytes, done));
    }
}
