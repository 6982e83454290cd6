pub mod config;
pub mod http_uploader;

pub use config::{UploadConfig, UploadConfigBuilder};
pub use http_uploader::HttpUploader;
pub use reqwest::Method;
