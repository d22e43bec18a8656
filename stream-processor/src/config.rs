use envconfig::Envconfig;
use log_common::config::{bind_address, EnvMsDuration, KafkaConfig};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "METRICS_PORT", default = "2114")]
    pub metrics_port: u16,

    #[envconfig(default = "100")]
    pub poll_timeout_ms: EnvMsDuration,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub consumer: ConsumerConfig,
}

impl Config {
    pub fn bind(&self) -> String {
        bind_address(&self.host, self.metrics_port)
    }
}

#[derive(Envconfig, Clone)]
pub struct ConsumerConfig {
    #[envconfig(default = "stream-consumers")]
    pub kafka_consumer_group: String,

    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();

        assert_eq!(config.bind(), "0.0.0.0:2114");
        assert_eq!(config.poll_timeout_ms.0, Duration::from_millis(100));
        assert_eq!(config.consumer.kafka_consumer_group, "stream-consumers");
        assert_eq!(config.consumer.kafka_consumer_offset_reset, "earliest");
        assert_eq!(config.kafka.kafka_topic, "stream-Topic");
    }

    #[test]
    fn overrides() {
        let env = HashMap::from([
            ("METRICS_PORT".to_owned(), "9200".to_owned()),
            ("KAFKA_TOPIC".to_owned(), "logs".to_owned()),
            ("POLL_TIMEOUT_MS".to_owned(), "250".to_owned()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();

        assert_eq!(config.bind(), "0.0.0.0:9200");
        assert_eq!(config.kafka.kafka_topic, "logs");
        assert_eq!(config.poll_timeout_ms.0, Duration::from_millis(250));
    }
}
