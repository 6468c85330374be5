//! HTTP uploader for pushing combined records to the bus.

use leo_combiner::{Batch, SendResult, Uploader, UploaderOptions};
use reqwest::StatusCode;
use snafu::{ResultExt, Snafu};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::types::{ErrorResponse, PushRecordsRequest};

/// An uploader that POSTs batches to `<base_url>/v1/records`.
///
/// The [`Uploader`] methods block on the runtime captured at construction,
/// so they must be called from a blocking thread such as one started with
/// [`tokio::task::spawn_blocking`].
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: String,
    options: UploaderOptions,
    runtime: Handle,
}

#[derive(Debug, Snafu)]
pub enum HttpPushClientError {
    #[snafu(display("No tokio runtime available"))]
    Runtime {
        source: tokio::runtime::TryCurrentError,
    },
    #[snafu(display("Request error"))]
    Request { source: reqwest::Error },
    #[snafu(display("Response error: status={status}, message={message}"))]
    Response { status: StatusCode, message: String },
}

pub type Result<T, E = HttpPushClientError> = std::result::Result<T, E>;

impl HttpUploader {
    /// Create a new HTTP uploader on the current tokio runtime.
    pub fn new(base_url: impl Into<String>, options: UploaderOptions) -> Result<Self> {
        let runtime = Handle::try_current().context(RuntimeSnafu {})?;
        Ok(Self::with_handle(base_url, options, runtime))
    }

    pub fn with_handle(
        base_url: impl Into<String>,
        options: UploaderOptions,
        runtime: Handle,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            runtime,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the records to the server.
    pub async fn push(&self, request: &PushRecordsRequest) -> Result<SendResult> {
        let url = format!("{}/v1/records", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context(RequestSnafu {})?;

        let status = response.status();
        if status.is_success() {
            return response.json::<SendResult>().await.context(RequestSnafu {});
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(HttpPushClientError::Response { status, message })
    }
}

impl HttpPushClientError {
    /// The message reported to the combiner when a push fails.
    pub fn send_error_message(&self) -> String {
        match self {
            Self::Response { message, .. } => message.clone(),
            Self::Request { source } => format!("request failed: {source}"),
            Self::Runtime { source } => source.to_string(),
        }
    }
}

impl Uploader for HttpUploader {
    fn options(&self) -> &UploaderOptions {
        &self.options
    }

    fn send_records(&self, batch: &Batch) -> SendResult {
        let request = PushRecordsRequest::from(batch);

        debug!(
            url = %self.base_url,
            records = request.records.len(),
            bytes = batch.len(),
            "pushing records"
        );

        match self.runtime.block_on(self.push(&request)) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "failed to push records");
                SendResult::failed(err.send_error_message())
            }
        }
    }

    fn end(&self) {
        debug!(url = %self.base_url, "http uploader ended");
    }
}
