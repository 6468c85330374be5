use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use serde_json::{Value, json};

use crate::{
    batch::Batch,
    correlation::CorrelationInput,
    options::UploaderOptions,
    record::{EventOptions, WireRecord},
    uploader::{Checkpointer, SendResult, Uploader},
};

pub const TEST_ID: &str = "test-bot";
pub const TEST_TIMESTAMP: u64 = 1_700_000_000_000;

/// An uploader that records every batch it receives.
///
/// Responses are taken from a queue, falling back to the default response
/// once the queue is empty.
pub struct RecordingUploader {
    options: UploaderOptions,
    batches: Mutex<Vec<Batch>>,
    responses: Mutex<VecDeque<SendResult>>,
    default_response: Mutex<SendResult>,
    end_calls: AtomicUsize,
}

/// A checkpointer that records every result it receives.
#[derive(Default)]
pub struct RecordingCheckpointer {
    results: Mutex<Vec<SendResult>>,
}

impl RecordingUploader {
    pub fn new(options: UploaderOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            batches: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(SendResult::ok()),
            end_calls: AtomicUsize::new(0),
        })
    }

    pub fn push_response(&self, response: SendResult) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn set_default_response(&self, response: SendResult) {
        *self.default_response.lock().unwrap() = response;
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn end_calls(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }
}

impl Uploader for RecordingUploader {
    fn options(&self) -> &UploaderOptions {
        &self.options
    }

    fn send_records(&self, batch: &Batch) -> SendResult {
        self.batches.lock().unwrap().push(batch.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
    }

    fn end(&self) {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingCheckpointer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn results(&self) -> Vec<SendResult> {
        self.results.lock().unwrap().clone()
    }
}

impl Checkpointer for RecordingCheckpointer {
    fn checkpoint(&self, result: &SendResult) {
        self.results.lock().unwrap().push(result.clone());
    }
}

/// Payload used by tests. All payloads have the same encoded size.
pub fn test_payload(n: u32) -> Value {
    json!({ "n": n % 10 })
}

pub fn test_options() -> EventOptions {
    EventOptions {
        timestamp: Some(TEST_TIMESTAMP),
        ..Default::default()
    }
}

/// Returns the encoded size of a test event.
pub fn test_line_len(correlation: &CorrelationInput) -> usize {
    WireRecord::new(TEST_ID, "ev", &test_payload(0), correlation, &test_options())
        .encode()
        .expect("encode test event")
        .len()
}
