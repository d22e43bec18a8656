//! Consume the log topic and count messages per service until interrupted.
use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use log_common::metrics::{setup_metrics_router, start_metrics_server, PipelineMetrics};
use log_common::shutdown::install_shutdown_handler;
use stream_processor::config::Config;
use stream_processor::consumer::PollConsumer;
use stream_processor::source::KafkaSource;

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = Config::init_from_env().wrap_err("invalid configuration")?;
    let shutdown = install_shutdown_handler().wrap_err("failed to register signal handlers")?;

    let metrics = PipelineMetrics::register()?;
    let router = setup_metrics_router(metrics.clone(), "stream processor");
    start_metrics_server(router, &config.bind()).await?;

    let source = KafkaSource::new(&config.kafka, &config.consumer)
        .wrap_err("failed to create kafka consumer")?;
    let mut consumer = PollConsumer::new(
        source,
        config.kafka.kafka_topic.clone(),
        config.poll_timeout_ms.0,
        metrics,
    );

    // The poll loop blocks on the client, keep it off the runtime's workers.
    let summary = tokio::task::spawn_blocking(move || consumer.run(&shutdown))
        .await
        .wrap_err("consumer loop panicked")??;

    info!("exiting consumer after {} messages", summary.messages);

    Ok(())
}
