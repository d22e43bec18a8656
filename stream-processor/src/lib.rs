//! Consume log messages from Kafka and count them per service.
pub mod config;
pub mod consumer;
pub mod error;
pub mod source;
