use std::io;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::types::types::MediaType;

/// A request payload that can describe itself and stream its own bytes.
///
/// `write_to` is expected to push the whole payload into `sink`; it may do so
/// in as many writes as it likes. Implementations that can be written more
/// than once (retries, redirects) should produce the same bytes every time.
#[async_trait]
pub trait RequestBody: Send + Sync {
    fn content_type(&self) -> Option<MediaType>;

    /// Total payload size, or `None` when the body cannot know it up front.
    fn content_length(&self) -> io::Result<Option<u64>> {
        Ok(None)
    }

    async fn write_to(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()>;
}
