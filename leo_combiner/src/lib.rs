//! Combines application events into size- and count-bounded batches.
//!
//! Callers write many small events to a [`Combiner`]. Events are encoded as
//! JSON lines, folded into records up to the uploader's maximum record size,
//! and records are folded into batches up to the maximum batch size or record
//! count. Full batches are handed to an [`Uploader`], and successful
//! submissions carrying a checkpoint token are reported to a
//! [`Checkpointer`].
pub mod accumulator;
pub mod batch;
pub mod combiner;
pub mod correlation;
pub mod error;
pub mod metrics;
pub mod options;
pub mod record;
pub mod service;
pub mod uploader;

#[cfg(test)]
pub mod test_utils;

pub use accumulator::{AccumulationMode, Admission};
pub use batch::Batch;
pub use combiner::{Combiner, CombinerStats};
pub use correlation::{Correlation, CorrelationInput};
pub use error::{CombinerError, Result};
pub use options::{CombinerConfig, CombinerOptions, UploaderOptions};
pub use record::{CombinedRecord, CurrentRecord, Event, EventOptions, WireRecord};
pub use service::{CombinerClient, CombinerService};
pub use uploader::{Checkpointer, SendResult, Uploader, WriterUploader};
