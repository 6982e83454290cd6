use std::io;
use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::progress_sink::ProgressSink;
use super::request_body::RequestBody;
use crate::progress::listener::ProgressListener;
use crate::types::types::MediaType;

/// Capacity of the buffered wrapper, one transport segment.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Wraps a [`RequestBody`] and reports upload progress to a single
/// [`ProgressListener`] while the body is written, without touching the bytes.
///
/// One instance serves one request. The buffered wrapper around the
/// destination is created on the first `write_to` and reused afterwards, so
/// byte counters keep running across calls on the same instance.
pub struct ProgressRequestBody<B> {
    body: Arc<B>,
    listener: Arc<dyn ProgressListener>,
    buffered: Option<BufWriter<ProgressSink<B>>>,
    buffer_capacity: usize,
    suppressed_flush_error: Option<io::Error>,
}

impl<B: RequestBody> ProgressRequestBody<B> {
    pub fn new(body: B, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            body: Arc::new(body),
            listener,
            buffered: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            suppressed_flush_error: None,
        }
    }

    /// Overrides the buffer capacity. Only affects a wrapper not yet created.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    pub fn content_type(&self) -> Option<MediaType> {
        self.body.content_type()
    }

    pub fn content_length(&self) -> io::Result<Option<u64>> {
        self.body.content_length()
    }

    /// The last flush failure swallowed because the destination was closed.
    pub fn suppressed_flush_error(&self) -> Option<&io::Error> {
        self.suppressed_flush_error.as_ref()
    }

    /// Writes the wrapped body into `destination`, reporting progress per chunk.
    ///
    /// Errors from the body and from chunk writes are returned unchanged. A
    /// flush that fails because the destination was already closed is logged
    /// and ignored; see [`suppressed_flush_error`](Self::suppressed_flush_error).
    pub async fn write_to<W>(&mut self, destination: W) -> io::Result<()>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let buffered = match &mut self.buffered {
            Some(buffered) => {
                debug!("Reusing buffered sink; the new destination is ignored");
                buffered
            }
            slot @ None => {
                let sink = ProgressSink::new(
                    Box::new(destination),
                    Arc::clone(&self.body),
                    Arc::clone(&self.listener),
                );
                slot.insert(BufWriter::with_capacity(self.buffer_capacity, sink))
            }
        };

        self.body.write_to(buffered).await?;

        // The sink cannot be asked whether it is closed, so classify the error instead.
        if let Err(e) = buffered.flush().await {
            if !is_closed_destination(&e) {
                return Err(e);
            }
            warn!("Destination closed before final flush, ignoring: {}", e);
            self.suppressed_flush_error = Some(e);
        }
        Ok(())
    }
}

/// Error kinds a transport reports once it has closed the stream under us.
fn is_closed_destination(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::ConnectionAborted
    )
}
