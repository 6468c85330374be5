use snafu::Snafu;

/// The message used when the uploader rejects a batch without saying why.
pub const DEFAULT_SUBMISSION_ERROR: &str = "Unable to write events to the bus.";

/// Combiner error types.
///
/// Every error is returned to the caller of [`Combiner::write`] or
/// [`Combiner::end`]. The combiner never retries and never rolls back:
/// the state that led to the error is left as it was.
///
/// [`Combiner::write`]: crate::Combiner::write
/// [`Combiner::end`]: crate::Combiner::end
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CombinerError {
    /// A single serialized event is larger than the maximum record size.
    #[snafu(display("record size is too large: {size} > {max_size}"))]
    OversizedRecord { size: usize, max_size: u64 },
    /// The uploader reported that a batch could not be delivered.
    ///
    /// The message is the one provided by the uploader, if any.
    #[snafu(display("{message}"))]
    Submission { message: String },
    /// The correlation carries neither an `id` nor a `start` marker.
    #[snafu(display("correlation for event {event} is missing both id and start"))]
    MissingCorrelationStart { event: String },
    /// The wire record could not be serialized.
    #[snafu(display("failed to serialize event {event}"))]
    Serialization {
        event: String,
        source: serde_json::Error,
    },
    /// The resolved options cannot be used to build batches.
    #[snafu(display("invalid combiner options: {message}"))]
    InvalidOptions { message: String },
    /// The combiner has been ended and does not accept more events.
    #[snafu(display("combiner already ended"))]
    Ended,
    /// The combiner service stopped before replying.
    #[snafu(display("reply channel closed"))]
    ReplyChannelClosed,
}

pub type Result<T, E = CombinerError> = std::result::Result<T, E>;

impl CombinerError {
    /// Returns true if the error was reported by the uploader.
    pub fn is_submission(&self) -> bool {
        matches!(self, CombinerError::Submission { .. })
    }
}
