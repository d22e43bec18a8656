use rdkafka::error::KafkaError;
use thiserror::Error;

/// Errors that stop the stream processor. Transport errors seen while polling
/// are logged and never surface here.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("failed to subscribe to {topic}: {source}")]
    Subscribe { topic: String, source: KafkaError },
    #[error("consumer was already terminated")]
    Terminated,
}
