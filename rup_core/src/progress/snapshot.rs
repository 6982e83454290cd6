use serde::Serialize;

/// One progress notification, in a form that can be stored or sent elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
    pub done: bool,
}

impl UploadProgress {
    pub fn new(bytes_written: u64, total_bytes: Option<u64>, done: bool) -> Self {
        Self {
            bytes_written,
            total_bytes,
            done,
        }
    }

    /// Percentage in `0.0..=100.0`, or `None` when the total is unknown or zero.
    pub fn percent(&self) -> Option<f64> {
        self.total_bytes
            .filter(|&t| t > 0)
            .map(|t| (self.bytes_written as f64 / t as f64) * 100.0)
    }
}

/// Human-readable byte formatting.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
