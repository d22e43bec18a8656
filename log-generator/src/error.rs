use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use thiserror::Error;

/// Errors that stop the log generator. Per-line and per-message failures are
/// logged and skipped instead, and never surface here.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("kafka client error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("failed to create topic {topic}: {code}")]
    TopicCreation {
        topic: String,
        code: RDKafkaErrorCode,
    },
    #[error("{0} partitions do not fit a kafka topic")]
    InvalidTopicLayout(u32),
    #[error("failed to open input file {path}: {source}")]
    OpenInput {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read input: {0}")]
    ReadInput(#[from] std::io::Error),
}
