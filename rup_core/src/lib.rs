pub mod body;
pub mod progress;
pub mod types;
pub mod uploader;
