use std::time::Duration;

use log_common::config::KafkaConfig;
use log_common::kafka::ConsumerLogContext;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use tracing::{debug, info};

use crate::config::ConsumerConfig;
use crate::consumer::{EventSource, PolledEvent};

/// `EventSource` backed by an rdkafka consumer polled from the calling thread.
pub struct KafkaSource {
    consumer: BaseConsumer<ConsumerLogContext>,
}

impl KafkaSource {
    pub fn new(kafka: &KafkaConfig, config: &ConsumerConfig) -> Result<KafkaSource, KafkaError> {
        info!("connecting to Kafka brokers at {}...", kafka.kafka_hosts);

        let mut client_config = ClientConfig::from(kafka);
        client_config
            .set("group.id", &config.kafka_consumer_group)
            .set("auto.offset.reset", &config.kafka_consumer_offset_reset);

        debug!("rdkafka configuration: {:?}", client_config);
        let consumer: BaseConsumer<ConsumerLogContext> =
            client_config.create_with_context(ConsumerLogContext)?;

        // Ping the cluster to make sure we can reach brokers, fail after 10 seconds
        drop(consumer.fetch_metadata(None, Timeout::After(Duration::new(10, 0)))?);
        info!("connected to Kafka brokers");

        Ok(KafkaSource { consumer })
    }
}

impl EventSource for KafkaSource {
    fn subscribe(&mut self, topic: &str) -> Result<(), KafkaError> {
        self.consumer.subscribe(&[topic])
    }

    fn poll_once(&mut self, timeout: Duration) -> Option<PolledEvent> {
        match self.consumer.poll(timeout)? {
            Ok(message) => Some(PolledEvent::Message(message.detach())),
            Err(e) => Some(PolledEvent::Error(e)),
        }
    }

    fn close(&mut self) {
        self.consumer.unsubscribe();
        info!("kafka consumer closed");
    }
}

#[cfg(test)]
mod tests {
    use rdkafka::mocking::MockCluster;
    use rdkafka::producer::{BaseRecord, DefaultProducerContext, Producer, ThreadedProducer};
    use rdkafka::Message;

    use super::*;

    #[test]
    fn kafka_source_receives_produced_messages() {
        let cluster: MockCluster<'static, DefaultProducerContext> =
            MockCluster::new(1).expect("failed to create mock brokers");
        cluster
            .create_topic("stream-Topic", 2, 1)
            .expect("failed to create mock topic");

        let kafka = KafkaConfig {
            kafka_hosts: cluster.bootstrap_servers(),
            kafka_topic: "stream-Topic".to_owned(),
            kafka_tls: false,
        };
        let producer: ThreadedProducer<DefaultProducerContext> = ClientConfig::from(&kafka)
            .create()
            .expect("failed to create producer");
        producer
            .send(
                BaseRecord::to("stream-Topic")
                    .partition(1)
                    .key("svcA")
                    .payload("hello"),
            )
            .map_err(|(e, _)| e)
            .expect("failed to enqueue message");
        producer
            .flush(Duration::from_secs(5))
            .expect("failed to flush message");

        let config = ConsumerConfig {
            kafka_consumer_group: "stream-consumers-test".to_owned(),
            kafka_consumer_offset_reset: "earliest".to_owned(),
        };
        let mut source = KafkaSource::new(&kafka, &config).expect("failed to create source");
        source.subscribe("stream-Topic").expect("failed to subscribe");

        // Joining the group takes a few seconds on the mock cluster
        let mut received = None;
        for _ in 0..300 {
            if let Some(PolledEvent::Message(message)) = source.poll_once(Duration::from_millis(100))
            {
                received = Some(message);
                break;
            }
        }
        source.close();

        let message = received.expect("no message received");
        assert_eq!(message.key(), Some(&b"svcA"[..]));
        assert_eq!(message.payload(), Some(&b"hello"[..]));
        assert_eq!(message.partition(), 1);
    }
}
