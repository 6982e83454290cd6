/// Receives upload progress while a request body is being written.
///
/// Called synchronously on the task that drives the write, once per chunk
/// that reached the destination. Implementations must return quickly: a slow
/// listener stalls the transport.
///
/// - `bytes_written` is cumulative and never decreases.
/// - `total_bytes` is the body's declared length, `None` when unknown.
/// - `done` is true exactly when `bytes_written` first equals a known total.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>, done: bool);
}

impl<F> ProgressListener for F
where
    F: Fn(u64, Option<u64>, bool) + Send + Sync,
{
    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>, done: bool) {
        self(bytes_written, total_bytes, done)
    }
}
