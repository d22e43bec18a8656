use std::time::Duration;

use log_common::metrics::PipelineMetrics;
use rdkafka::error::KafkaError;
use rdkafka::message::OwnedMessage;
use rdkafka::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::ConsumerError;

/// One non-empty result of polling the transport.
#[derive(Debug)]
pub enum PolledEvent {
    Message(OwnedMessage),
    Error(KafkaError),
}

/// Where the consumer reads events from.
pub trait EventSource {
    fn subscribe(&mut self, topic: &str) -> Result<(), KafkaError>;

    /// Wait up to `timeout` for the next event. `None` means nothing was ready.
    fn poll_once(&mut self, timeout: Duration) -> Option<PolledEvent>;

    /// Release the subscription and the underlying connection.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Subscribing,
    Polling,
    Draining,
    Terminated,
}

/// Counts from one consumer run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub messages: u64,
    pub errors: u64,
    pub idle_polls: u64,
}

/// Single-threaded poll loop counting consumed messages per service.
pub struct PollConsumer<S> {
    source: S,
    topic: String,
    poll_timeout: Duration,
    metrics: PipelineMetrics,
    state: ConsumerState,
}

impl<S: EventSource> PollConsumer<S> {
    pub fn new(
        source: S,
        topic: String,
        poll_timeout: Duration,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            source,
            topic,
            poll_timeout,
            metrics,
            state: ConsumerState::Subscribing,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Subscribe, then poll until `shutdown` is cancelled.
    ///
    /// The token is checked once per iteration and an in-flight poll is never
    /// interrupted, so shutdown takes at most one poll timeout to be noticed.
    /// Only a failed subscription ends the run with an error.
    pub fn run(&mut self, shutdown: &CancellationToken) -> Result<ConsumeSummary, ConsumerError> {
        if self.state != ConsumerState::Subscribing {
            return Err(ConsumerError::Terminated);
        }

        self.source
            .subscribe(&self.topic)
            .map_err(|source| ConsumerError::Subscribe {
                topic: self.topic.clone(),
                source,
            })?;
        info!("consumer waiting for messages on {}", self.topic);
        self.transition(ConsumerState::Polling);

        let mut summary = ConsumeSummary::default();
        while !shutdown.is_cancelled() {
            match self.source.poll_once(self.poll_timeout) {
                None => summary.idle_polls += 1,
                Some(PolledEvent::Message(message)) => {
                    self.handle_message(&message);
                    summary.messages += 1;
                }
                Some(PolledEvent::Error(e)) => {
                    self.metrics.record_consumer_error();
                    summary.errors += 1;
                    error!("kafka error while polling {}: {}", self.topic, e);
                }
            }
        }

        self.transition(ConsumerState::Draining);
        info!("terminating consumer");
        self.source.close();
        self.transition(ConsumerState::Terminated);

        info!(
            "consumed {} messages ({} transport errors)",
            summary.messages, summary.errors
        );
        Ok(summary)
    }

    fn handle_message(&self, message: &OwnedMessage) {
        let service = message
            .key()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        self.metrics.record_consumed(&service);

        let payload = message
            .payload()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        info!(
            "received message from topic {}: {}: {}",
            message.topic(),
            message.partition(),
            payload
        );
    }

    fn transition(&mut self, next: ConsumerState) {
        debug!("consumer state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
