use std::mem;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use log_common::metrics::PipelineMetrics;
use log_common::partition::PartitionAssigner;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ProducerError;
use crate::line::LogLine;
use crate::sink::{MessageSink, OutboundMessage};

/// How input lines are grouped and paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub batch_size: NonZeroUsize,
    /// Pause after each full batch. Not a flow-control signal, only a rate limit.
    pub batch_delay: Duration,
    /// Upper bound on the final wait for outstanding deliveries.
    pub flush_timeout: Duration,
}

/// Accumulates lines and hands them out in groups of at most `size`.
#[derive(Debug)]
pub struct Batcher {
    size: NonZeroUsize,
    pending: Vec<LogLine>,
}

impl Batcher {
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            size,
            pending: Vec::with_capacity(size.get()),
        }
    }

    /// Add a line, returning the batch once it is full.
    pub fn push(&mut self, line: LogLine) -> Option<Vec<LogLine>> {
        self.pending.push(line);
        if self.pending.len() >= self.size.get() {
            Some(mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.size.get()),
            ))
        } else {
            None
        }
    }

    /// Return the partial batch left at end of input, if any.
    pub fn finish(self) -> Option<Vec<LogLine>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

/// Counts from one producer run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProduceSummary {
    pub lines: usize,
    pub blank: usize,
    pub malformed: usize,
    pub undecodable: usize,
    pub batches: usize,
    pub sent: usize,
    pub failed: usize,
    /// Set when a shutdown request stopped reading before end of input.
    pub interrupted: bool,
}

pub struct BatchProducer<S> {
    sink: S,
    topic: String,
    assigner: PartitionAssigner,
    policy: BatchPolicy,
    metrics: PipelineMetrics,
}

impl<S: MessageSink> BatchProducer<S> {
    pub fn new(
        sink: S,
        topic: String,
        assigner: PartitionAssigner,
        policy: BatchPolicy,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            sink,
            topic,
            assigner,
            policy,
            metrics,
        }
    }

    /// Open `path` and produce every well-formed line in it.
    pub async fn produce_from_file(
        &self,
        path: &Path,
        shutdown: &CancellationToken,
    ) -> Result<ProduceSummary, ProducerError> {
        let file = File::open(path)
            .await
            .map_err(|source| ProducerError::OpenInput {
                path: path.display().to_string(),
                source,
            })?;
        info!("producing lines from {}", path.display());

        self.produce(BufReader::new(file), shutdown).await
    }

    /// Read `reader` to the end, sending full batches as they fill up and the
    /// partial batch at the end, then wait for outstanding deliveries.
    ///
    /// A cancelled `shutdown` stops reading before the next line or during the
    /// inter-batch pause. Lines already read are still sent and flushed, also
    /// when reading fails with an I/O error, which is returned afterwards.
    pub async fn produce<R>(
        &self,
        mut reader: R,
        shutdown: &CancellationToken,
    ) -> Result<ProduceSummary, ProducerError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = ProduceSummary::default();
        let mut batcher = Batcher::new(self.policy.batch_size);
        let mut buf = Vec::new();
        let mut read_error = None;

        loop {
            if shutdown.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("failed to read input, stopping: {}", e);
                    read_error = Some(e);
                    break;
                }
            }

            summary.lines += 1;
            let Ok(line) = std::str::from_utf8(trim_line_ending(&buf)) else {
                warn!("skipping line {} with invalid UTF-8", summary.lines);
                self.metrics.record_skipped_line("invalid_utf8");
                summary.undecodable += 1;
                continue;
            };

            if line.trim().is_empty() {
                summary.blank += 1;
                continue;
            }

            let Some(log_line) = LogLine::parse(line) else {
                debug!("skipping malformed line: {:?}", line);
                self.metrics.record_skipped_line("malformed");
                summary.malformed += 1;
                continue;
            };

            if let Some(batch) = batcher.push(log_line) {
                self.send_batch(&batch, &mut summary);
                if self.pace(shutdown).await {
                    summary.interrupted = true;
                    break;
                }
            }
        }

        if let Some(batch) = batcher.finish() {
            self.send_batch(&batch, &mut summary);
        }

        self.flush();

        info!(
            "produced {} messages in {} batches ({} failed, {} malformed and {} undecodable lines skipped)",
            summary.sent, summary.batches, summary.failed, summary.malformed, summary.undecodable
        );

        match read_error {
            Some(e) => Err(ProducerError::ReadInput(e)),
            None => Ok(summary),
        }
    }

    /// Send each line of `batch` to its assigned partition. A failure to
    /// enqueue one message is logged and does not stop the batch.
    fn send_batch(&self, batch: &[LogLine], summary: &mut ProduceSummary) {
        for line in batch {
            let partition = self.assigner.assign(&line.service);
            let message = OutboundMessage {
                topic: &self.topic,
                partition,
                key: &line.service,
                payload: &line.message,
            };

            match self.sink.send(message) {
                Ok(()) => {
                    self.metrics.record_produced();
                    summary.sent += 1;
                    info!(
                        "sent to {} {} (partition {}): {}",
                        self.topic, line.service, partition, line.message
                    );
                }
                Err(e) => {
                    self.metrics.record_produce_error();
                    summary.failed += 1;
                    error!("failed to produce message for {}: {}", line.service, e);
                }
            }
        }

        self.metrics.record_batch();
        summary.batches += 1;
    }

    /// Sleep for the inter-batch delay. Returns true if shutdown was requested.
    async fn pace(&self, shutdown: &CancellationToken) -> bool {
        if !self.policy.batch_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.policy.batch_delay) => {},
                _ = shutdown.cancelled() => {},
            }
        }
        shutdown.is_cancelled()
    }

    fn flush(&self) {
        match self.sink.flush(self.policy.flush_timeout) {
            Ok(()) => debug!("all messages acknowledged"),
            Err(e) => warn!(
                "flush did not complete within {:?}, undelivered messages are dropped: {}",
                self.policy.flush_timeout, e
            ),
        }
    }

    pub fn close(self) {
        self.sink.close();
    }
}

/// Strip a trailing `\n` or `\r\n`.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
