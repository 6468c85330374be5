mod http;
pub mod types;

pub use http::{HttpPushClientError, HttpUploader, Result};
