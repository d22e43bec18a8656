use std::future::ready;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use metrics::{Counter, Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const PRODUCED_MESSAGES: &str = "kafka_produced_messages_total";
pub const PRODUCE_ERRORS: &str = "kafka_produce_errors_total";
pub const DELIVERY_ERRORS: &str = "kafka_delivery_errors_total";
pub const PRODUCER_BATCHES: &str = "producer_batches_total";
pub const SKIPPED_LINES: &str = "log_lines_skipped_total";
pub const CONSUMED_LOGS: &str = "logs_consumed_total";
pub const CONSUMER_ERRORS: &str = "kafka_consumer_errors_total";

static REGISTERED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("pipeline metrics were already registered in this process")]
    AlreadyRegistered,
    #[error("failed to bind metrics listener on {bind}: {source}")]
    Bind {
        bind: String,
        source: std::io::Error,
    },
}

/// Counter registry shared by the producer and the consumer.
///
/// The registry owns its Prometheus recorder instead of installing a global
/// one, so a single instance is built at startup and handed to every component
/// that reports. Clones share the same counters.
#[derive(Clone)]
pub struct PipelineMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    produced: Counter,
    produce_errors: Counter,
    delivery_errors: Counter,
    batches: Counter,
    consumer_errors: Counter,
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

impl PipelineMetrics {
    /// Build the registry for this process. Only the first call succeeds: a
    /// second registration means two components think they own the exporter.
    pub fn register() -> Result<Self, MetricsError> {
        if REGISTERED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MetricsError::AlreadyRegistered);
        }
        Ok(Self::new())
    }

    /// Build a standalone registry, not tied to the process-wide registration.
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        recorder.describe_counter(
            PRODUCED_MESSAGES.into(),
            None,
            "Total messages produced to Kafka".into(),
        );
        recorder.describe_counter(
            CONSUMED_LOGS.into(),
            None,
            "Total logs consumed from Kafka".into(),
        );
        recorder.describe_counter(
            SKIPPED_LINES.into(),
            None,
            "Input lines dropped before producing".into(),
        );

        let counter =
            |name: &'static str| recorder.register_counter(&Key::from_name(name), &metadata());
        let produced = counter(PRODUCED_MESSAGES);
        let produce_errors = counter(PRODUCE_ERRORS);
        let delivery_errors = counter(DELIVERY_ERRORS);
        let batches = counter(PRODUCER_BATCHES);
        let consumer_errors = counter(CONSUMER_ERRORS);

        Self {
            inner: Arc::new(Inner {
                recorder,
                handle,
                produced,
                produce_errors,
                delivery_errors,
                batches,
                consumer_errors,
            }),
        }
    }

    pub fn record_produced(&self) {
        self.inner.produced.increment(1);
    }

    pub fn record_produce_error(&self) {
        self.inner.produce_errors.increment(1);
    }

    pub fn record_delivery_error(&self) {
        self.inner.delivery_errors.increment(1);
    }

    pub fn record_batch(&self) {
        self.inner.batches.increment(1);
    }

    pub fn record_skipped_line(&self, reason: &'static str) {
        self.labeled_counter(SKIPPED_LINES, "reason", reason.to_owned())
            .increment(1);
    }

    pub fn record_consumed(&self, service: &str) {
        self.labeled_counter(CONSUMED_LOGS, "service", service.to_owned())
            .increment(1);
    }

    pub fn record_consumer_error(&self) {
        self.inner.consumer_errors.increment(1);
    }

    /// Render every counter in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    fn labeled_counter(&self, name: &'static str, label: &'static str, value: String) -> Counter {
        let key = Key::from_parts(name, vec![Label::new(label, value)]);
        self.inner.recorder.register_counter(&key, &metadata())
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a Router exposing `metrics` on `/metrics`, with `banner` on `/`.
pub fn setup_metrics_router(metrics: PipelineMetrics, banner: &'static str) -> Router {
    Router::new()
        .route("/", get(move || ready(banner)))
        .route("/metrics", get(move || ready(metrics.render())))
}

/// Serve a `Router` on an already bound listener.
pub async fn serve(router: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await?;

    Ok(())
}

/// Bind `bind` and serve `router` on a background task. Binding happens before
/// returning so that a taken port fails startup instead of a detached task.
pub async fn start_metrics_server(
    router: Router,
    bind: &str,
) -> Result<JoinHandle<()>, MetricsError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| MetricsError::Bind {
            bind: bind.to_owned(),
            source,
        })?;
    info!("serving metrics on {}/metrics", bind);

    Ok(tokio::spawn(async move {
        if let Err(e) = serve(router, listener).await {
            error!("metrics http server error: {}", e);
        }
    }))
}
