use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::bytes_body::DEFAULT_CHUNK_SIZE;
use super::request_body::RequestBody;
use crate::types::types::MediaType;

/// Streams a file from disk. The length is captured when the body is opened
/// and the file is re-opened on every `write_to`, so the body is replayable.
#[derive(Debug, Clone)]
pub struct FileBody {
    path: PathBuf,
    len: u64,
    content_type: Option<MediaType>,
    chunk_size: usize,
}

impl FileBody {
    pub async fn open(
        path: impl Into<PathBuf>,
        content_type: Option<MediaType>,
    ) -> io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }

        Ok(Self {
            path,
            len: metadata.len(),
            content_type,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl RequestBody for FileBody {
    fn content_type(&self) -> Option<MediaType> {
        self.content_type.clone()
    }

    fn content_length(&self) -> io::Result<Option<u64>> {
        Ok(Some(self.len))
    }

    async fn write_to(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        // Never send more than the length announced at open time.
        let mut file = File::open(&self.path).await?.take(self.len);
        let mut buf = vec![0u8; self.chunk_size];
        let mut sent: u64 = 0;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await?;
            sent += n as u64;
        }

        if sent < self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} shrank during upload: sent {} of {} bytes",
                    self.path.display(),
                    sent,
                    self.len
                ),
            ));
        }
        Ok(())
    }
}
