//! Events, their wire encoding and the records they are combined into.
//!
//! ## Data flow
//!
//! **Encoding**: event -> [`WireRecord`] -> one JSON line.
//!
//! **Accumulation**: JSON lines -> [`CurrentRecord`].
//!
//! **Batching**: [`CurrentRecord`] -> [`CombinedRecord`] -> [`Batch`](crate::Batch).
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ResultExt;

use crate::{
    correlation::{Correlation, CorrelationInput},
    error::{Result, SerializationSnafu},
};

/// Per event options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventOptions {
    /// Event source timestamp, in milliseconds since the Unix epoch.
    ///
    /// If None, the current time is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Value>,
}

/// An owned event, as read from a JSON line or sent to the combiner service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, alias = "correlation_id")]
    pub correlation: CorrelationInput,
    #[serde(flatten)]
    pub options: EventOptions,
}

/// The serialized form of one event.
///
/// Field order and presence are part of the contract with the uploader.
#[derive(Debug, Serialize)]
pub struct WireRecord<'a, P: ?Sized> {
    pub id: &'a str,
    pub event: &'a str,
    pub payload: &'a P,
    pub correlation_id: &'a CorrelationInput,
    pub event_source_timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<&'a Value>,
}

/// The record being filled with encoded events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentRecord {
    data: BytesMut,
    correlation: Option<Correlation>,
    cnt: usize,
}

/// A finished record, ready to be added to a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    /// One JSON line per event.
    pub data: Bytes,
    /// Correlation of the last event folded into the record.
    pub correlation: Correlation,
    /// Number of events in the record.
    pub cnt: usize,
}

impl Event {
    pub fn new(event: impl Into<String>, payload: Value, correlation: CorrelationInput) -> Self {
        Self {
            event: event.into(),
            payload,
            correlation,
            options: EventOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EventOptions) -> Self {
        self.options = options;
        self
    }
}

impl<'a, P: Serialize + ?Sized> WireRecord<'a, P> {
    pub fn new(
        id: &'a str,
        event: &'a str,
        payload: &'a P,
        correlation: &'a CorrelationInput,
        options: &'a EventOptions,
    ) -> Self {
        Self {
            id,
            event,
            payload,
            correlation_id: correlation,
            event_source_timestamp: options.timestamp.unwrap_or_else(now_millis),
            schedule: options.schedule.as_ref(),
            units: options.units.as_ref(),
        }
    }

    /// Encodes the record as a newline terminated JSON line.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self).context(SerializationSnafu { event: self.event })?;
        line.push(b'\n');
        Ok(line)
    }
}

impl CurrentRecord {
    /// Returns the size of the record in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of events in the record.
    pub fn cnt(&self) -> usize {
        self.cnt
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn correlation(&self) -> Option<&Correlation> {
        self.correlation.as_ref()
    }

    /// Appends an encoded event.
    ///
    /// The record correlation is replaced by the event's one.
    pub fn append(&mut self, line: &[u8], correlation: Correlation) {
        self.data.extend_from_slice(line);
        self.cnt += 1;
        self.correlation = Some(correlation);
    }

    /// Replaces the record content with a single encoded event.
    pub fn replace(&mut self, line: &[u8], correlation: Correlation) {
        self.clear();
        self.append(line, correlation);
    }

    /// Takes the record content, leaving an empty record behind.
    ///
    /// Returns None if the record is empty.
    pub fn take(&mut self) -> Option<CombinedRecord> {
        if self.is_empty() {
            return None;
        }

        let correlation = self.correlation.take()?;
        let data = std::mem::take(&mut self.data).freeze();
        let cnt = std::mem::take(&mut self.cnt);

        Some(CombinedRecord {
            data,
            correlation,
            cnt,
        })
    }

    /// Empties the record and releases its buffer.
    pub fn clear(&mut self) {
        self.data = BytesMut::new();
        self.correlation = None;
        self.cnt = 0;
    }
}

impl CombinedRecord {
    /// Returns the size of the record in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
