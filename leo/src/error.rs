use std::path::PathBuf;

use snafu::Snafu;

/// CLI error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    #[snafu(display("Failed to open input file {}", path.display()))]
    OpenInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to open output file {}", path.display()))]
    OpenOutput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },
    #[snafu(display("JSON parse error on line {line}"))]
    JsonParse {
        line: usize,
        source: serde_json::Error,
    },
    #[snafu(display("Combiner error"))]
    Combiner {
        source: leo_combiner::CombinerError,
    },
    #[snafu(display("Push client error"))]
    PushClient {
        source: leo_push_client::HttpPushClientError,
    },
    #[snafu(display("Combiner task failed"))]
    Join { source: tokio::task::JoinError },
    #[snafu(display("Failed to initialize observability"))]
    Observability {
        source: leo_observability::ObservabilityError,
    },
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
