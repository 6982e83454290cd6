pub mod listener;
pub mod snapshot;
pub mod watch_listener;

pub use listener::ProgressListener;
pub use snapshot::{format_bytes, UploadProgress};
pub use watch_listener::WatchProgressListener;
