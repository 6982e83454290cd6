use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::ready;
use tokio::io::AsyncWrite;

use super::request_body::RequestBody;
use crate::progress::listener::ProgressListener;

/// Destination sinks are type-erased so one decorator can serve any transport.
pub(crate) type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TotalLength {
    Unresolved,
    Known(u64),
    Unknown,
}

/// Forwards every write to `destination` unchanged and reports cumulative
/// progress for each chunk that got through.
pub(crate) struct ProgressSink<B> {
    destination: BoxedSink,
    body: Arc<B>,
    listener: Arc<dyn ProgressListener>,
    bytes_written: u64,
    total: TotalLength,
}

impl<B: RequestBody> ProgressSink<B> {
    pub(crate) fn new(
        destination: BoxedSink,
        body: Arc<B>,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            destination,
            body,
            listener,
            bytes_written: 0,
            total: TotalLength::Unresolved,
        }
    }

    /// Asks the body for its length on the first chunk only.
    fn total_bytes(&mut self) -> io::Result<Option<u64>> {
        if self.total == TotalLength::Unresolved {
            self.total = match self.body.content_length()? {
                Some(len) => TotalLength::Known(len),
                None => TotalLength::Unknown,
            };
        }
        Ok(match self.total {
            TotalLength::Known(len) => Some(len),
            _ => None,
        })
    }

    fn record(&mut self, written: usize) -> io::Result<()> {
        let total = self.total_bytes()?;
        self.bytes_written += written as u64;
        let done = total == Some(self.bytes_written);
        self.listener.on_progress(self.bytes_written, total, done);
        Ok(())
    }
}

impl<B: RequestBody> AsyncWrite for ProgressSink<B> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let written = ready!(Pin::new(&mut self.destination).poll_write(cx, buf))?;
        // A zero-length write carried no chunk, so there is nothing to report.
        if written > 0 {
            self.record(written)?;
        }
        Poll::Ready(Ok(written))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.destination).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.destination).poll_shutdown(cx)
    }
}
