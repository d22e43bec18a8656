pub mod config;
pub mod kafka;
pub mod metrics;
pub mod partition;
pub mod shutdown;
