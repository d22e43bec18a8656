use rdkafka::consumer::ConsumerContext;
use rdkafka::error::KafkaResult;
use rdkafka::producer::{DeliveryResult, ProducerContext};
use rdkafka::{ClientConfig, ClientContext, Message, TopicPartitionList};
use tracing::{debug, error, warn};

use crate::config::KafkaConfig;
use crate::metrics::PipelineMetrics;

/// Base rdkafka configuration shared by producers, consumers and admin clients.
impl From<&KafkaConfig> for ClientConfig {
    fn from(config: &KafkaConfig) -> Self {
        let mut client_config = ClientConfig::new();
        client_config.set("bootstrap.servers", &config.kafka_hosts);

        if config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        client_config
    }
}

/// Client context reporting delivery outcomes into the pipeline metrics.
pub struct KafkaContext {
    metrics: PipelineMetrics,
}

impl From<PipelineMetrics> for KafkaContext {
    fn from(metrics: PipelineMetrics) -> Self {
        KafkaContext { metrics }
    }
}

impl ClientContext for KafkaContext {}

impl ProducerContext for KafkaContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _: Self::DeliveryOpaque) {
        match delivery_result {
            Ok(message) => debug!(
                "delivered message to {} partition {} at offset {}",
                message.topic(),
                message.partition(),
                message.offset()
            ),
            Err((err, message)) => {
                self.metrics.record_delivery_error();
                error!(
                    "failed to deliver message to {} partition {}: {}",
                    message.topic(),
                    message.partition(),
                    err
                );
            }
        }
    }
}

/// Consumer context that logs offset commits.
pub struct ConsumerLogContext;

impl ClientContext for ConsumerLogContext {}

impl ConsumerContext for ConsumerLogContext {
    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        match result {
            Ok(_) => debug!("committed offsets for {} partitions", offsets.count()),
            Err(e) => warn!("failed to commit offsets: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_from_kafka_config() {
        let config = KafkaConfig {
            kafka_hosts: "broker:9092".to_owned(),
            kafka_topic: "logs".to_owned(),
            kafka_tls: false,
        };
        let client_config = ClientConfig::from(&config);

        assert_eq!(client_config.get("bootstrap.servers"), Some("broker:9092"));
        assert_eq!(client_config.get("security.protocol"), None);
        // No context reads statistics, so librdkafka must not emit them
        assert_eq!(client_config.get("statistics.interval.ms"), None);
    }

    #[test]
    fn tls_enables_ssl() {
        let config = KafkaConfig {
            kafka_hosts: "broker:9093".to_owned(),
            kafka_topic: "logs".to_owned(),
            kafka_tls: true,
        };
        let client_config = ClientConfig::from(&config);

        assert_eq!(client_config.get("security.protocol"), Some("ssl"));
    }
}
