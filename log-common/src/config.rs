use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

/// Kafka settings shared by the log generator and the stream processor.
#[derive(Envconfig, Clone, Debug)]
pub struct KafkaConfig {
    #[envconfig(default = "kafka1:19092,kafka2:19093")]
    pub kafka_hosts: String,

    #[envconfig(default = "stream-Topic")]
    pub kafka_topic: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,
}

/// A `Duration` parsed from an environment variable holding milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

/// Produce a host:port address for binding the metrics listener.
pub fn bind_address(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}
