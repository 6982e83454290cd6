use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;

use crate::body::progress_request_body::DEFAULT_BUFFER_CAPACITY;
use crate::types::types::AuthenticationInfo;

/// Default size of the in-memory pipe between the body writer and reqwest.
const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to send one upload.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, Vec<String>>,
    pub authentication: Option<AuthenticationInfo>,
    pub pipe_capacity: usize,
    pub buffer_capacity: usize,
    pub connect_timeout: Duration,
}

pub struct UploadConfigBuilder {
    config: UploadConfig,
}

impl UploadConfig {
    pub fn builder(url: impl Into<String>) -> UploadConfigBuilder {
        UploadConfigBuilder::new(url)
    }
}

impl UploadConfigBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            config: UploadConfig {
                url: url.into(),
                method: Method::POST,
                headers: HashMap::new(),
                authentication: None,
                pipe_capacity: DEFAULT_PIPE_CAPACITY,
                buffer_capacity: DEFAULT_BUFFER_CAPACITY,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            },
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.config.method = method;
        self
    }

    /// Adds a header value; repeated names keep every value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.authentication = Some(AuthenticationInfo {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.config.pipe_capacity = capacity.max(1);
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> UploadConfig {
        self.config
    }
}
