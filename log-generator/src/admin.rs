use std::num::NonZeroU32;
use std::time::Duration;

use log_common::config::KafkaConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use tracing::info;

use crate::error::ProducerError;

/// Partition count and replication factor of the log topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicLayout {
    pub partitions: NonZeroU32,
    pub replication_factor: NonZeroU32,
}

/// Create `topic` unless it already exists. Any other failure is returned, as
/// nothing downstream can work without the topic.
pub async fn ensure_topic(
    kafka: &KafkaConfig,
    topic: &str,
    layout: TopicLayout,
    timeout: Duration,
) -> Result<(), ProducerError> {
    let partitions = to_i32(layout.partitions)?;
    let replication = to_i32(layout.replication_factor)?;

    let admin_client: AdminClient<DefaultClientContext> = ClientConfig::from(kafka).create()?;

    let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(replication));
    let opts = AdminOptions::new().operation_timeout(Some(timeout));

    let results = admin_client.create_topics(&[new_topic], &opts).await?;
    check_topic_results(results)
}

fn to_i32(count: NonZeroU32) -> Result<i32, ProducerError> {
    i32::try_from(count.get()).map_err(|_| ProducerError::InvalidTopicLayout(count.get()))
}

fn check_topic_results(results: Vec<TopicResult>) -> Result<(), ProducerError> {
    for result in results {
        match result {
            Ok(topic) => info!("topic {} created successfully", topic),
            Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("topic {} already exists", topic)
            }
            Err((topic, code)) => return Err(ProducerError::TopicCreation { topic, code }),
        }
    }
    Ok(())
}
