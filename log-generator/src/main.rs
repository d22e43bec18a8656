//! Produce `service:message` lines from a file to Kafka, keyed and partitioned by service.
use std::path::Path;

use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use log_common::metrics::{setup_metrics_router, start_metrics_server, PipelineMetrics};
use log_common::partition::PartitionAssigner;
use log_common::shutdown::install_shutdown_handler;
use log_generator::admin::ensure_topic;
use log_generator::config::Config;
use log_generator::producer::BatchProducer;
use log_generator::sink::KafkaSink;

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
    let router = setup_metrics_router(metrics.clone(), "log generator");
    start_metrics_server(router, &config.bind()).await?;

    let topic = config.kafka.kafka_topic.clone();
    ensure_topic(
        &config.kafka,
        &topic,
        config.topic_layout(),
        config.admin_timeout_ms.0,
    )
    .await
    .wrap_err_with(|| format!("failed to set up topic {}", topic))?;

    let sink = KafkaSink::new(&config.kafka, &config.producer, metrics.clone())
        .wrap_err("failed to create kafka producer")?;
    let producer = BatchProducer::new(
        sink,
        topic,
        PartitionAssigner::new(config.kafka_topic_partitions),
        config.batch_policy(),
        metrics,
    );

    let summary = producer
        .produce_from_file(Path::new(&config.input_file), &shutdown)
        .await?;

    if !summary.interrupted {
        info!("input shipped, serving metrics until shutdown");
        shutdown.cancelled().await;
    }

    producer.close();
    info!("exiting producer");

    Ok(())
}
