use std::io;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use log::{debug, info, warn};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::body::progress_request_body::ProgressRequestBody;
use crate::body::request_body::RequestBody;
use crate::progress::listener::ProgressListener;
use crate::progress::snapshot::format_bytes;
use crate::types::types::{UploadError, UploadResponse};
use crate::uploader::config::UploadConfig;

/// How long a rejected upload waits for the server's explanation.
const REJECTION_BODY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends request bodies over HTTP while reporting upload progress.
pub struct HttpUploader {
    client: Client,
    config: UploadConfig,
}

/// Validates the configured headers and applies them to the request.
/// `Content-Type` and `Content-Length` are skipped: they come from the body,
/// and a second copy would make the request ambiguous.
fn apply_headers(
    mut builder: reqwest::RequestBuilder,
    config: &UploadConfig,
    precomputed_auth: Option<&str>,
) -> Result<reqwest::RequestBuilder, UploadError> {
    for (key, values) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| UploadError::InvalidHeader(key.clone()))?;
        if name == CONTENT_TYPE || name == CONTENT_LENGTH {
            continue;
        }
        for value in values {
            let value = HeaderValue::from_str(value)
                .map_err(|_| UploadError::InvalidHeader(format!("{}: {}", key, value)))?;
            builder = builder.header(name.clone(), value);
        }
    }
    if let Some(auth_value) = precomputed_auth {
        builder = builder.header("Authorization", auth_value);
    }
    Ok(builder)
}

/// Pre-computes the Basic auth header value, if authentication is configured.
fn precompute_auth(config: &UploadConfig) -> Option<String> {
    config.authentication.as_ref().map(|auth| {
        let credentials = format!("{}:{}", auth.username, auth.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&credentials);
        format!("Basic {}", encoded)
    })
}

/// Cancels the body writer once its outcome no longer matters. A write error
/// caused by the closed pipe is only logged.
async fn stop_writer(
    writer_task: JoinHandle<io::Result<()>>,
    upload_id: Uuid,
) -> Result<(), UploadError> {
    writer_task.abort();
    match writer_task.await {
        Ok(Err(body_err)) => {
            debug!("[{}] body writer stopped: {}", upload_id, body_err);
            Ok(())
        }
        Err(join_err) if !join_err.is_cancelled() => Err(join_err.into()),
        _ => Ok(()),
    }
}

impl HttpUploader {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Uses a caller-provided client, e.g. one shared across uploads.
    pub fn with_client(client: Client, config: UploadConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Uploads `body`, notifying `listener` as bytes are handed to the connection.
    ///
    /// The body is written on a separate task into an in-memory pipe whose
    /// read half is the reqwest request body. If the request itself fails,
    /// its error is returned even though the writer will also have failed
    /// once the pipe closed. A non-2xx answer stops the writer, whether or
    /// not the server read the whole body.
    pub async fn upload<B>(
        &self,
        body: B,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<UploadResponse, UploadError>
    where
        B: RequestBody + 'static,
    {
        let upload_id = Uuid::new_v4();
        let content_length = body.content_length().map_err(UploadError::Body)?;
        let content_type = body.content_type();

        let auth_header = precompute_auth(&self.config);
        let mut builder = apply_headers(
            self.client
                .request(self.config.method.clone(), &self.config.url),
            &self.config,
            auth_header.as_deref(),
        )?;
        if let Some(content_type) = &content_type {
            builder = builder.header(CONTENT_TYPE, content_type.to_string());
        }
        if let Some(len) = content_length {
            builder = builder.header(CONTENT_LENGTH, len);
        }

        let (writer, reader) = tokio::io::duplex(self.config.pipe_capacity);
        let builder = builder.body(reqwest::Body::wrap_stream(ReaderStream::new(reader)));

        let mut progress_body = ProgressRequestBody::new(body, listener)
            .with_buffer_capacity(self.config.buffer_capacity);
        // Dropping the body at the end of the task drops the pipe writer,
        // which ends the request stream.
        let writer_task = tokio::spawn(async move { progress_body.write_to(writer).await });

        info!(
            "[{}] {} {} ({})",
            upload_id,
            self.config.method,
            self.config.url,
            content_length.map_or_else(|| "unknown size".to_string(), format_bytes)
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                // The request error wins over anything the writer reports.
                if let Err(writer_err) = stop_writer(writer_task, upload_id).await {
                    debug!("[{}] {}", upload_id, writer_err);
                }
                warn!("[{}] request failed: {}", upload_id, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            // The server may answer before reading the body and then stop
            // reading, which leaves the writer parked on a full pipe.
            let body = match timeout(REJECTION_BODY_TIMEOUT, response.text()).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    debug!("[{}] could not read rejection body: {}", upload_id, e);
                    String::new()
                }
                Err(_) => {
                    debug!("[{}] gave up reading rejection body", upload_id);
                    String::new()
                }
            };
            stop_writer(writer_task, upload_id).await?;
            warn!("[{}] server answered {}", upload_id, status);
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        writer_task.await?.map_err(UploadError::Body)?;
        let body = response.text().await?;

        info!("[{}] upload finished with {}", upload_id, status);
        Ok(UploadResponse {
            status: status.as_u16(),
            body,
        })
    }
}
