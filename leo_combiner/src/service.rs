use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    combiner::{Combiner, CombinerStats},
    error::{CombinerError, ReplyChannelClosedSnafu, Result, SubmissionSnafu},
    record::Event,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

pub type ReplySender = oneshot::Sender<Result<()>>;

/// Owns a [`Combiner`] and serves requests from [`CombinerClient`]s.
///
/// The combiner and its uploader are blocking, so the service runs on a
/// blocking thread, usually through [`tokio::task::spawn_blocking`].
pub struct CombinerService {
    combiner: Combiner,
    tx: mpsc::Sender<CombinerRequest>,
    rx: mpsc::Receiver<CombinerRequest>,
}

#[derive(Clone)]
pub struct CombinerClient {
    tx: mpsc::Sender<CombinerRequest>,
}

pub enum CombinerRequest {
    Write { event: Event, reply: ReplySender },
    End { reply: ReplySender },
}

impl CombinerService {
    pub fn new(combiner: Combiner) -> Self {
        Self::with_capacity(combiner, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(combiner: Combiner, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { combiner, tx, rx }
    }

    pub fn client(&self) -> CombinerClient {
        CombinerClient {
            tx: self.tx.clone(),
        }
    }

    /// Serves requests until a client ends the combiner or all clients are dropped.
    ///
    /// If the clients go away without ever asking to end the combiner, the
    /// combiner is ended here. If an end was requested and failed, the
    /// submission is not attempted again and the last end error is returned.
    /// Returns the final combiner stats.
    pub fn run(self) -> Result<CombinerStats> {
        let CombinerService {
            mut combiner,
            tx,
            mut rx,
        } = self;
        drop(tx);

        let mut end_error: Option<String> = None;

        while let Some(request) = rx.blocking_recv() {
            match request {
                CombinerRequest::Write { event, reply } => {
                    let result = combiner.write_event(&event);
                    if let Err(err) = &result {
                        debug!(event = %event.event, error = %err, "write failed");
                    }
                    let _ = reply.send(result);
                }
                CombinerRequest::End { reply } => {
                    let result = combiner.end();
                    // end only fails on submission, whose message is its display
                    end_error = result.as_ref().err().map(ToString::to_string);
                    let ended = result.is_ok();
                    let _ = reply.send(result);
                    if ended {
                        break;
                    }
                }
            }
        }

        if let Some(message) = end_error {
            warn!(
                id = %combiner.id(),
                error = %message,
                "all clients dropped after a failed end"
            );
            return SubmissionSnafu { message }.fail();
        }

        if !combiner.is_ended() {
            warn!(id = %combiner.id(), "all clients dropped, ending combiner");
            combiner.end()?;
        }

        Ok(combiner.stats())
    }
}

impl CombinerClient {
    pub async fn write(&self, event: Event) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(CombinerRequest::Write { event, reply: tx }, rx)
            .await
    }

    pub async fn end(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(CombinerRequest::End { reply: tx }, rx).await
    }

    async fn send(
        &self,
        request: CombinerRequest,
        rx: oneshot::Receiver<Result<()>>,
    ) -> Result<()> {
        self.tx
            .send(request)
            .await
            .or_else(|_| ReplyChannelClosedSnafu {}.fail())?;

        rx.await
            .unwrap_or_else(|_| Err(CombinerError::ReplyChannelClosed))
    }
}
