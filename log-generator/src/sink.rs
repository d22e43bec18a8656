use std::time::Duration;

use log_common::config::KafkaConfig;
use log_common::kafka::KafkaContext;
use log_common::metrics::PipelineMetrics;
use rdkafka::error::KafkaError;
use rdkafka::producer::{BaseRecord, Producer, ThreadedProducer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use tracing::{debug, info};

use crate::config::KafkaProducerConfig;

/// A keyed message addressed to an explicit partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundMessage<'a> {
    pub topic: &'a str,
    pub partition: i32,
    pub key: &'a str,
    pub payload: &'a str,
}

/// Where the producer writes messages.
pub trait MessageSink {
    /// Enqueue a message without waiting for the broker to acknowledge it.
    fn send(&self, message: OutboundMessage<'_>) -> Result<(), KafkaError>;

    /// Wait until every enqueued message is acknowledged or `timeout` elapses.
    fn flush(&self, timeout: Duration) -> Result<(), KafkaError>;

    fn close(self);
}

/// `MessageSink` backed by an rdkafka producer. Delivery reports are handled by
/// the producer's background thread and logged through `KafkaContext`.
pub struct KafkaSink {
    producer: ThreadedProducer<KafkaContext>,
}

impl KafkaSink {
    pub fn new(
        kafka: &KafkaConfig,
        config: &KafkaProducerConfig,
        metrics: PipelineMetrics,
    ) -> Result<KafkaSink, KafkaError> {
        info!("connecting to Kafka brokers at {}...", kafka.kafka_hosts);

        let mut client_config = ClientConfig::from(kafka);
        client_config
            .set("linger.ms", config.kafka_producer_linger_ms.to_string())
            .set(
                "message.timeout.ms",
                config.kafka_message_timeout_ms.to_string(),
            )
            .set(
                "compression.codec",
                config.kafka_compression_codec.to_owned(),
            );

        debug!("rdkafka configuration: {:?}", client_config);
        let producer: ThreadedProducer<KafkaContext> =
            client_config.create_with_context(metrics.into())?;

        // Ping the cluster to make sure we can reach brokers, fail after 10 seconds
        drop(
            producer
                .client()
                .fetch_metadata(None, Timeout::After(Duration::new(10, 0)))?,
        );
        info!("connected to Kafka brokers");

        Ok(KafkaSink { producer })
    }
}

impl MessageSink for KafkaSink {
    fn send(&self, message: OutboundMessage<'_>) -> Result<(), KafkaError> {
        let record = BaseRecord::to(message.topic)
            .partition(message.partition)
            .key(message.key)
            .payload(message.payload);

        self.producer.send(record).map_err(|(e, _)| e)
    }

    fn flush(&self, timeout: Duration) -> Result<(), KafkaError> {
        self.producer.flush(Timeout::After(timeout))
    }

    fn close(self) {
        let in_flight = self.producer.in_flight_count();
        if in_flight > 0 {
            debug!("closing producer with {} undelivered messages", in_flight);
        }
        drop(self.producer);
        info!("kafka producer closed");
    }
}

#[cfg(test)]
mod tests {
    use rdkafka::mocking::MockCluster;
    use rdkafka::producer::DefaultProducerContext;

    use super::*;

    fn start_on_mocked_sink() -> (MockCluster<'static, DefaultProducerContext>, KafkaSink) {
        let cluster = MockCluster::new(1).expect("failed to create mock brokers");
        cluster
            .create_topic("stream-Topic", 2, 1)
            .expect("failed to create mock topic");

        let kafka = KafkaConfig {
            kafka_hosts: cluster.bootstrap_servers(),
            kafka_topic: "stream-Topic".to_owned(),
            kafka_tls: false,
        };
        let config = KafkaProducerConfig {
            kafka_producer_linger_ms: 0,
            kafka_message_timeout_ms: 5000,
            kafka_compression_codec: "none".to_owned(),
        };
        let sink =
            KafkaSink::new(&kafka, &config, PipelineMetrics::new()).expect("failed to create sink");
        (cluster, sink)
    }

    #[test]
    fn kafka_sink_sends_and_flushes() {
        let (_cluster, sink) = start_on_mocked_sink();

        for (partition, key) in [(0, "svc1"), (1, "svc2")] {
            sink.send(OutboundMessage {
                topic: "stream-Topic",
                partition,
                key,
                payload: "hello",
            })
            .expect("failed to enqueue message");
        }

        sink.flush(Duration::from_secs(5))
            .expect("failed to flush messages");
        sink.close();
    }
}
