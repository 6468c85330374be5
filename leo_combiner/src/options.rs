//! Batching limits.
//!
//! Limits come from two places. The uploader exposes the limits imposed by
//! its transport through [`UploaderOptions`], and the caller may override any
//! of them through [`CombinerOptions`]. [`CombinerOptions::resolve`] merges the
//! two into the [`CombinerConfig`] used by the combiner.
use std::time::Duration;

use bytesize::ByteSize;

use crate::error::{InvalidOptionsSnafu, Result};

/// Fallback throughput used when neither the caller nor the uploader set one.
pub const DEFAULT_BYTES_PER_SECOND: u64 = 1024 * 1024 * 3 / 2;

/// Limits and capabilities exposed by an uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct UploaderOptions {
    /// Maximum size of a batch, in bytes.
    pub batch_size: ByteSize,
    /// Maximum size of a single record, in bytes.
    pub record_size: ByteSize,
    /// Maximum number of records in a batch.
    pub max_records: usize,
    /// How long the uploader is willing to buffer data.
    ///
    /// Accepted for compatibility, the combiner does not flush on a timer.
    pub duration: Duration,
    /// Expected throughput of the uploader.
    pub bytes_per_second: Option<ByteSize>,
    /// Whether the uploader accepts multiple events combined into one record.
    pub combine: bool,
}

/// Caller overrides for the uploader limits.
///
/// Unset fields inherit the uploader's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinerOptions {
    pub batch_size: Option<ByteSize>,
    pub record_size: Option<ByteSize>,
    pub max_records: Option<usize>,
    pub duration: Option<Duration>,
    pub bytes_per_second: Option<ByteSize>,
    /// Correlation source used when an event does not carry its own.
    ///
    /// Defaults to the combiner id.
    pub source: Option<String>,
}

/// Resolved combiner configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinerConfig {
    pub batch_size: u64,
    pub record_size: u64,
    pub max_records: usize,
    pub duration: Duration,
    pub bytes_per_second: u64,
    pub source: String,
}

impl Default for UploaderOptions {
    fn default() -> Self {
        Self {
            batch_size: ByteSize::mib(4),
            record_size: ByteSize::kib(1000),
            max_records: 500,
            duration: Duration::from_secs(1),
            bytes_per_second: None,
            combine: true,
        }
    }
}

impl UploaderOptions {
    pub fn with_batch_size(mut self, batch_size: ByteSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_record_size(mut self, record_size: ByteSize) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_bytes_per_second(mut self, bytes_per_second: ByteSize) -> Self {
        self.bytes_per_second = Some(bytes_per_second);
        self
    }

    pub fn with_combine(mut self, combine: bool) -> Self {
        self.combine = combine;
        self
    }
}

impl CombinerOptions {
    pub fn with_batch_size(mut self, batch_size: ByteSize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_record_size(mut self, record_size: ByteSize) -> Self {
        self.record_size = Some(record_size);
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_bytes_per_second(mut self, bytes_per_second: ByteSize) -> Self {
        self.bytes_per_second = Some(bytes_per_second);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Merges the overrides over the uploader options.
    pub fn resolve(&self, uploader: &UploaderOptions, id: &str) -> Result<CombinerConfig> {
        let config = CombinerConfig {
            batch_size: self.batch_size.unwrap_or(uploader.batch_size).as_u64(),
            record_size: self.record_size.unwrap_or(uploader.record_size).as_u64(),
            max_records: self.max_records.unwrap_or(uploader.max_records),
            duration: self.duration.unwrap_or(uploader.duration),
            bytes_per_second: self
                .bytes_per_second
                .or(uploader.bytes_per_second)
                .map(|b| b.as_u64())
                .unwrap_or(DEFAULT_BYTES_PER_SECOND),
            source: self.source.clone().unwrap_or_else(|| id.to_string()),
        };

        config.validate()?;

        Ok(config)
    }
}

impl CombinerConfig {
    fn validate(&self) -> Result<()> {
        if self.record_size == 0 {
            return InvalidOptionsSnafu {
                message: "record_size must be greater than zero",
            }
            .fail();
        }

        if self.batch_size == 0 {
            return InvalidOptionsSnafu {
                message: "batch_size must be greater than zero",
            }
            .fail();
        }

        if self.max_records == 0 {
            return InvalidOptionsSnafu {
                message: "max_records must be greater than zero",
            }
            .fail();
        }

        Ok(())
    }
}
