pub mod bytes_body;
pub mod file_body;
pub mod progress_request_body;
mod progress_sink;
pub mod request_body;

pub use bytes_body::BytesBody;
pub use file_body::FileBody;
pub use progress_request_body::ProgressRequestBody;
pub use request_body::RequestBody;
