use std::{io::Write, sync::Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{batch::Batch, options::UploaderOptions};

/// The outcome of submitting a batch.
///
/// The whole value, including any transport specific details, is handed to
/// the [`Checkpointer`] when it carries a checkpoint token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    /// Checkpoint token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid: Option<String>,
    #[serde(
        default,
        rename = "errorMessage",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
    /// Any other field reported by the transport.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Trait for the transports that deliver batches to the bus.
///
/// Calls are blocking. The combiner never retries a failed call.
pub trait Uploader: Send + Sync + 'static {
    /// Returns the limits and capabilities of the transport.
    fn options(&self) -> &UploaderOptions;

    /// Sends a batch.
    fn send_records(&self, batch: &Batch) -> SendResult;

    /// Releases the transport resources.
    fn end(&self);
}

/// Trait for persisting the checkpoint of a successful submission.
pub trait Checkpointer: Send + Sync + 'static {
    fn checkpoint(&self, result: &SendResult);
}

/// An uploader writing each event as a JSON line to a writer.
///
/// The checkpoint token is the number of events written so far.
pub struct WriterUploader<W> {
    options: UploaderOptions,
    inner: Mutex<WriterState<W>>,
}

struct WriterState<W> {
    writer: W,
    events_written: u64,
}

impl SendResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn with_checkpoint(eid: impl Into<String>) -> Self {
        Self {
            success: true,
            eid: Some(eid.into()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the checkpoint token, ignoring empty tokens.
    pub fn checkpoint(&self) -> Option<&str> {
        self.eid.as_deref().filter(|eid| !eid.is_empty())
    }
}

impl<F> Checkpointer for F
where
    F: Fn(&SendResult) + Send + Sync + 'static,
{
    fn checkpoint(&self, result: &SendResult) {
        self(result)
    }
}

impl<W: Write + Send + 'static> WriterUploader<W> {
    pub fn new(writer: W, options: UploaderOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(WriterState {
                writer,
                events_written: 0,
            }),
        }
    }

    /// Returns the number of events written so far.
    pub fn events_written(&self) -> u64 {
        self.inner
            .lock()
            .map(|state| state.events_written)
            .unwrap_or_default()
    }
}

impl<W: Write + Send + 'static> Uploader for WriterUploader<W> {
    fn options(&self) -> &UploaderOptions {
        &self.options
    }

    fn send_records(&self, batch: &Batch) -> SendResult {
        let Ok(mut state) = self.inner.lock() else {
            return SendResult::failed("writer lock poisoned");
        };

        for record in batch.records() {
            if let Err(err) = state.writer.write_all(&record.data) {
                return SendResult::failed(format!("failed to write records: {err}"));
            }
        }

        if let Err(err) = state.writer.flush() {
            return SendResult::failed(format!("failed to flush records: {err}"));
        }

        state.events_written += batch.cnt() as u64;

        SendResult::with_checkpoint(state.events_written.to_string())
            .with_detail("records", batch.num_records())
            .with_detail("bytes", batch.len())
    }

    fn end(&self) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };

        if let Err(err) = state.writer.flush() {
            warn!(error = %err, "failed to flush writer");
        }
    }
}
