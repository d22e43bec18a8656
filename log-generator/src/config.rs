use std::num::{NonZeroU32, NonZeroUsize};

use envconfig::Envconfig;
use log_common::config::{bind_address, EnvMsDuration, KafkaConfig};

use crate::admin::TopicLayout;
use crate::producer::BatchPolicy;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "METRICS_PORT", default = "2113")]
    pub metrics_port: u16,

    #[envconfig(default = "/app/input.log")]
    pub input_file: String,

    #[envconfig(default = "2")]
    pub kafka_topic_partitions: NonZeroU32,

    #[envconfig(default = "2")]
    pub kafka_replication_factor: NonZeroU32,

    #[envconfig(default = "2")]
    pub batch_size: NonZeroUsize,

    #[envconfig(default = "2000")]
    pub batch_delay_ms: EnvMsDuration, // Pause between batches, a crude rate limit

    #[envconfig(default = "5000")]
    pub flush_timeout_ms: EnvMsDuration, // Time to wait for outstanding deliveries at the end

    #[envconfig(default = "30000")]
    pub admin_timeout_ms: EnvMsDuration,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub producer: KafkaProducerConfig,
}

impl Config {
    pub fn bind(&self) -> String {
        bind_address(&self.host, self.metrics_port)
    }

    pub fn topic_layout(&self) -> TopicLayout {
        TopicLayout {
            partitions: self.kafka_topic_partitions,
            replication_factor: self.kafka_replication_factor,
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay_ms.0,
            flush_timeout: self.flush_timeout_ms.0,
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct KafkaProducerConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();

        assert_eq!(config.bind(), "0.0.0.0:2113");
        assert_eq!(config.input_file, "/app/input.log");
        assert_eq!(config.topic_layout().partitions.get(), 2);
        assert_eq!(config.topic_layout().replication_factor.get(), 2);
        assert_eq!(config.kafka.kafka_topic, "stream-Topic");

        let policy = config.batch_policy();
        assert_eq!(policy.batch_size.get(), 2);
        assert_eq!(policy.batch_delay, Duration::from_secs(2));
        assert_eq!(policy.flush_timeout, Duration::from_secs(5));
    }

    #[test]
    fn metrics_port_override() {
        let env = HashMap::from([("METRICS_PORT".to_owned(), "9102".to_owned())]);
        let config = Config::init_from_hashmap(&env).unwrap();

        assert_eq!(config.bind(), "0.0.0.0:9102");
    }

    #[test]
    fn zero_partitions_is_rejected() {
        let env = HashMap::from([("KAFKA_TOPIC_PARTITIONS".to_owned(), "0".to_owned())]);

        assert!(Config::init_from_hashmap(&env).is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let env = HashMap::from([("BATCH_SIZE".to_owned(), "0".to_owned())]);

        assert!(Config::init_from_hashmap(&env).is_err());
    }
}
