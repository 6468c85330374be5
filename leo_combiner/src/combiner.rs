use std::sync::Arc;

use serde::Serialize;
use snafu::ensure;
use tracing::{debug, error, info};

use crate::{
    accumulator::{AccumulationMode, Admission},
    batch::Batch,
    correlation::{Correlation, CorrelationInput},
    error::{CombinerError, DEFAULT_SUBMISSION_ERROR, EndedSnafu, Result, SubmissionSnafu},
    metrics::CombinerMetrics,
    options::{CombinerConfig, CombinerOptions},
    record::{CurrentRecord, Event, EventOptions, WireRecord},
    uploader::{Checkpointer, Uploader},
};

/// Running totals of a combiner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombinerStats {
    /// Bytes of encoded events written.
    pub bytes_written: u64,
    pub events_written: u64,
    pub batches_submitted: u64,
    pub records_submitted: u64,
    pub checkpoints: u64,
}

/// Combines events into records and records into batches.
///
/// Events are encoded as JSON lines. When the uploader accepts combined
/// records, lines are concatenated into a current record until the maximum
/// record size is reached. Otherwise every line is a record of its own.
/// Records are collected into a batch until the maximum batch size or record
/// count is reached, at which point the batch is sent to the uploader.
///
/// All operations are blocking: a write that fills a batch waits for the
/// uploader to accept it.
pub struct Combiner {
    id: String,
    config: CombinerConfig,
    mode: AccumulationMode,
    current: CurrentRecord,
    batch: Batch,
    uploader: Arc<dyn Uploader>,
    mass_uploader: Option<Arc<dyn Uploader>>,
    checkpointer: Arc<dyn Checkpointer>,
    stats: CombinerStats,
    metrics: CombinerMetrics,
    ended: bool,
}

impl Combiner {
    /// Creates a new combiner.
    ///
    /// Limits not set in `options` are taken from the uploader. The mass
    /// uploader is kept for callers that select transports themselves, the
    /// combiner always submits to `uploader`.
    pub fn new(
        id: impl Into<String>,
        options: CombinerOptions,
        uploader: Arc<dyn Uploader>,
        mass_uploader: Option<Arc<dyn Uploader>>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<Self> {
        let id = id.into();
        let uploader_options = uploader.options();
        let config = options.resolve(uploader_options, &id)?;
        let mode = AccumulationMode::from_combine(uploader_options.combine);

        debug!(id = %id, ?mode, ?config, "created combiner");

        Ok(Self {
            id,
            config,
            mode,
            current: CurrentRecord::default(),
            batch: Batch::default(),
            uploader,
            mass_uploader,
            checkpointer,
            stats: CombinerStats::default(),
            metrics: CombinerMetrics::default(),
            ended: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &CombinerConfig {
        &self.config
    }

    pub fn mode(&self) -> AccumulationMode {
        self.mode
    }

    pub fn current_record(&self) -> &CurrentRecord {
        &self.current
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn stats(&self) -> CombinerStats {
        self.stats
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn mass_uploader(&self) -> Option<&Arc<dyn Uploader>> {
        self.mass_uploader.as_ref()
    }

    /// Writes one event.
    ///
    /// Fails if the encoded event is larger than the maximum record size
    /// (combine mode only), if the correlation has no start marker, or if a
    /// batch submission triggered by this write fails.
    pub fn write<P: Serialize + ?Sized>(
        &mut self,
        event: &str,
        payload: &P,
        correlation: &CorrelationInput,
        options: &EventOptions,
    ) -> Result<()> {
        ensure!(!self.ended, EndedSnafu);

        let resolved = Correlation::resolve(correlation, &self.config.source, event)?;
        let line = WireRecord::new(&self.id, event, payload, correlation, options).encode()?;

        let admission = self
            .mode
            .admit(&self.current, line.len(), self.config.record_size)
            .inspect_err(|err| {
                if let CombinerError::OversizedRecord { size, max_size } = err {
                    error!(event, size, max_size, "record size exceeds max record size");
                }
            })?;

        match admission {
            Admission::Append => {
                self.current.append(&line, resolved);
                self.count_written(line.len());
            }
            Admission::FlushThenAppend => {
                self.add_current_record()?;
                self.current.append(&line, resolved);
                self.count_written(line.len());
            }
            Admission::Replace => {
                // The event is held by the current record even if the flush fails.
                self.current.replace(&line, resolved);
                self.count_written(line.len());
                self.add_current_record()?;
            }
        }

        Ok(())
    }

    /// Writes one owned event.
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        self.write(
            &event.event,
            &event.payload,
            &event.correlation,
            &event.options,
        )
    }

    /// Flushes the pending record and batch, then ends the uploader.
    ///
    /// Calling `end` again after it succeeded does nothing. If the final
    /// submission fails, the pending batch is kept and `end` can be retried.
    pub fn end(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }

        self.add_current_record()?;
        self.submit_batch()?;
        self.reset();
        self.ended = true;

        self.uploader.end();

        info!(
            id = %self.id,
            events = self.stats.events_written,
            bytes = self.stats.bytes_written,
            batches = self.stats.batches_submitted,
            "combiner ended"
        );

        Ok(())
    }

    /// Moves the current record to the batch, submitting the batch first if full.
    fn add_current_record(&mut self) -> Result<()> {
        if self.current.is_empty() {
            return Ok(());
        }

        if self.batch.is_at_capacity(
            self.current.len(),
            self.config.batch_size,
            self.config.max_records,
        ) {
            self.submit_batch()?;
            self.batch.clear();
        }

        if let Some(record) = self.current.take() {
            debug!(size = record.len(), cnt = record.cnt, "added record to batch");
            self.batch.push(record);
        }

        Ok(())
    }

    /// Sends the batch to the uploader.
    ///
    /// The batch is left untouched, callers reset it after a success.
    fn submit_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let result = self.uploader.send_records(&self.batch);

        if !result.success {
            let message = result
                .error_message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_SUBMISSION_ERROR.to_string());
            error!(
                records = self.batch.num_records(),
                events = self.batch.cnt(),
                error = %message,
                "failed to submit batch"
            );
            return SubmissionSnafu { message }.fail();
        }

        info!(
            eid = ?result.eid,
            records = self.batch.num_records(),
            events = self.batch.cnt(),
            bytes = self.batch.len(),
            details = ?result.details,
            "submitted batch"
        );

        let records = self.batch.num_records() as u64;
        self.stats.batches_submitted += 1;
        self.stats.records_submitted += records;
        self.metrics.submitted_batches.add(1, &[]);
        self.metrics.submitted_records.add(records, &[]);

        if result.checkpoint().is_some() {
            self.stats.checkpoints += 1;
            self.checkpointer.checkpoint(&result);
        }

        Ok(())
    }

    fn count_written(&mut self, size: usize) {
        let size = size as u64;
        self.stats.bytes_written += size;
        self.stats.events_written += 1;
        self.metrics.written_bytes.add(size, &[]);
        self.metrics.written_events.add(1, &[]);
    }

    fn reset(&mut self) {
        self.current.clear();
        self.batch.clear();
    }
}
