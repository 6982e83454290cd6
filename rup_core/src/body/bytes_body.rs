use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::request_body::RequestBody;
use crate::types::types::MediaType;

/// Default write granularity, one transport segment.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// An in-memory payload, written in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BytesBody {
    content: Vec<u8>,
    content_type: Option<MediaType>,
    chunk_size: usize,
}

impl BytesBody {
    pub fn new(content: impl Into<Vec<u8>>, content_type: Option<MediaType>) -> Self {
        Self {
            content: content.into(),
            content_type,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// A UTF-8 `text/plain` body.
    pub fn text(text: impl Into<String>) -> Self {
        let content_type = MediaType::parse("text/plain; charset=utf-8").ok();
        Self::new(text.into().into_bytes(), content_type)
    }

    /// Sets how many bytes each `write` to the sink carries. Clamped to at least 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl RequestBody for BytesBody {
    fn content_type(&self) -> Option<MediaType> {
        self.content_type.clone()
    }

    fn content_length(&self) -> io::Result<Option<u64>> {
        Ok(Some(self.content.len() as u64))
    }

    async fn write_to(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        for chunk in self.content.chunks(self.chunk_size) {
            sink.write_all(chunk).await?;
        }
        Ok(())
    }
}
