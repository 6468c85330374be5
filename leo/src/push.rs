use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use bytesize::ByteSize;
use clap::Args;
use leo_combiner::{
    Combiner, CombinerClient, CombinerOptions, CombinerService, CombinerStats, Event, SendResult,
    Uploader, UploaderOptions, WriterUploader,
};
use leo_observability::MetricsReader;
use leo_push_client::HttpUploader;
use snafu::ResultExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{
    CombinerSnafu, IoSnafu, JoinSnafu, JsonParseSnafu, OpenInputSnafu, OpenOutputSnafu,
    PushClientSnafu, Result,
};

/// Push newline-delimited JSON events through a combiner
///
/// Each input line is an object with an `event` name, a `payload`, a
/// `correlation` (`source`, `id`, `start`, `end`) and optional `timestamp`,
/// `schedule` and `units` fields.
#[derive(Debug, Args)]
pub struct PushArgs {
    /// Combiner id, written as the `id` of every record.
    #[arg(long)]
    id: String,

    /// Read events from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Append records to this file. Records go to stdout if neither this nor
    /// `--endpoint` is set.
    #[arg(long, conflicts_with = "endpoint")]
    output: Option<PathBuf>,

    /// Push records to this HTTP endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Send every event as a record of its own.
    #[arg(long)]
    no_combine: bool,

    /// Maximum batch size, e.g. `4MiB`.
    #[arg(long)]
    batch_size: Option<ByteSize>,

    /// Maximum record size, e.g. `1000KiB`.
    #[arg(long)]
    record_size: Option<ByteSize>,

    /// Maximum number of records per batch.
    #[arg(long)]
    max_records: Option<usize>,

    /// Correlation source used when an event does not set one.
    #[arg(long)]
    source: Option<String>,
}

impl PushArgs {
    pub async fn run(self, ct: CancellationToken, metrics: MetricsReader) -> Result<()> {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = match &self.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .context(OpenInputSnafu { path: path.clone() })?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(BufReader::new(tokio::io::stdin())),
        };

        let stats = self.push(reader, ct).await?;

        eprintln!(
            "Pushed {} events ({}) in {} batches of {} records, {} checkpoints",
            stats.events_written,
            ByteSize::b(stats.bytes_written),
            stats.batches_submitted,
            stats.records_submitted,
            stats.checkpoints,
        );

        match metrics.counter_totals() {
            Ok(totals) => {
                for (name, value) in totals {
                    info!(metric = %name, value, "counter total");
                }
            }
            Err(err) => warn!(error = %err, "failed to collect metrics"),
        }

        Ok(())
    }

    /// Writes every event read from `reader` and ends the combiner.
    ///
    /// Reading stops at the end of the input, on the first error or when
    /// `ct` is cancelled. Pending events are flushed in all cases.
    pub async fn push<R>(&self, reader: R, ct: CancellationToken) -> Result<CombinerStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let checkpointer = |result: &SendResult| {
            info!(eid = ?result.eid, details = ?result.details, "checkpoint");
        };

        let combiner = Combiner::new(
            self.id.clone(),
            self.combiner_options(),
            self.uploader()?,
            None,
            Arc::new(checkpointer),
        )
        .context(CombinerSnafu {})?;

        let service = CombinerService::new(combiner);
        let client = service.client();
        let task = tokio::task::spawn_blocking(move || service.run());

        let forwarded = forward_events(reader, &client, &ct).await;
        let ended = client.end().await;
        drop(client);

        let stats = task.await.context(JoinSnafu {})?;
        let lines = forwarded?;
        ended.context(CombinerSnafu {})?;
        let stats = stats.context(CombinerSnafu {})?;

        info!(lines, events = stats.events_written, "push finished");

        Ok(stats)
    }

    fn uploader(&self) -> Result<Arc<dyn Uploader>> {
        let options = self.uploader_options();

        if let Some(endpoint) = &self.endpoint {
            let uploader =
                HttpUploader::new(endpoint.clone(), options).context(PushClientSnafu {})?;
            return Ok(Arc::new(uploader));
        }

        if let Some(path) = &self.output {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(OpenOutputSnafu { path: path.clone() })?;
            return Ok(Arc::new(WriterUploader::new(file, options)));
        }

        Ok(Arc::new(WriterUploader::new(std::io::stdout(), options)))
    }

    fn uploader_options(&self) -> UploaderOptions {
        UploaderOptions::default().with_combine(!self.no_combine)
    }

    fn combiner_options(&self) -> CombinerOptions {
        CombinerOptions {
            batch_size: self.batch_size,
            record_size: self.record_size,
            max_records: self.max_records,
            source: self.source.clone(),
            ..Default::default()
        }
    }
}

/// Sends every input line to the combiner. Returns the number of lines read.
async fn forward_events<R>(
    reader: R,
    client: &CombinerClient,
    ct: &CancellationToken,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = ct.cancelled() => {
                warn!(lines = line_no, "push cancelled");
                break;
            }
            line = lines.next_line() => line.context(IoSnafu {})?,
        };

        let Some(line) = line else {
            break;
        };
        line_no += 1;

        let Some(event) = parse_event(line_no, &line)? else {
            continue;
        };

        client.write(event).await.context(CombinerSnafu {})?;
    }

    Ok(line_no)
}

/// Parses one input line. Blank lines are skipped.
fn parse_event(line_no: usize, line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .context(JsonParseSnafu { line: line_no })
}
