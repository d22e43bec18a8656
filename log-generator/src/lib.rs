//! Ship `service:message` lines from a file to a partitioned Kafka topic.
pub mod admin;
pub mod config;
pub mod error;
pub mod line;
pub mod producer;
pub mod sink;
