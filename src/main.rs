//! JetStream Kubernetes Operator
//!
//! This operator manages streams on a JetStream server from `Stream`
//! custom resources.
//!
//! ## Usage
//!
//! ```bash
//! # Run the operator (requires kubeconfig)
//! jetstream-operator --server-url http://nats:8222
//!
//! # Run with custom log level
//! RUST_LOG=debug jetstream-operator
//! ```

use clap::Parser;
use jetstream_operator::events::KubeEventSink;
use jetstream_operator::jetstream::HttpStreamClient;
use jetstream_operator::queue::{ExponentialBackoff, WorkQueue};
use jetstream_operator::writer::KubeStreamWriter;
use jetstream_operator::{Context, OperatorConfig, Stream, StreamController, MAX_RETRIES};
use kube::api::Api;
use kube::runtime::reflector;
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// JetStream Kubernetes Operator
#[derive(Parser, Debug)]
#[command(name = "jetstream-operator")]
#[command(version, about = "Kubernetes Operator for JetStream streams")]
struct Args {
    /// Base URL of the stream server's management API
    #[arg(long, env = "JETSTREAM_SERVER_URL", default_value = "http://nats:8222")]
    server_url: String,

    /// Namespace to watch (empty for all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    namespace: String,

    /// Number of concurrent reconcile workers
    #[arg(long, env = "WORKERS", default_value_t = 2)]
    workers: usize,

    /// Requeues allowed per stream before it is dropped
    #[arg(long, env = "MAX_RETRIES", default_value_t = MAX_RETRIES)]
    max_retries: u32,

    /// First retry delay in milliseconds
    #[arg(long, env = "BACKOFF_BASE_MS", default_value_t = 5)]
    backoff_base_ms: u64,

    /// Maximum retry delay in seconds
    #[arg(long, env = "BACKOFF_MAX_SECS", default_value_t = 1000)]
    backoff_max_secs: u64,

    /// Timeout for requests to the stream server in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    request_timeout_secs: u64,
}

impl From<Args> for OperatorConfig {
    fn from(args: Args) -> Self {
        Self {
            server_url: args.server_url,
            namespace: args.namespace,
            workers: args.workers,
            max_retries: args.max_retries,
            backoff_base_ms: args.backoff_base_ms,
            backoff_max_secs: args.backoff_max_secs,
            request_timeout_secs: args.request_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = OperatorConfig::from(Args::parse());
    config.validate()?;

    info!("Starting JetStream Kubernetes Operator");
    info!("Stream server: {}", config.server_url);
    info!(
        "Watching namespace: {}",
        config.watch_namespace().unwrap_or("all")
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let streams: Api<Stream> = match config.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let (reader, writer) = reflector::store::<Stream>();

    let ctx = Context::new(
        Arc::new(reader),
        Arc::new(KubeStreamWriter::new(client.clone())),
        Arc::new(KubeEventSink::new(client.clone(), "jetstream-operator")),
        Arc::new(HttpStreamClient::new(
            &config.server_url,
            config.request_timeout(),
        )?),
    );
    let queue = WorkQueue::new(ExponentialBackoff::new(
        config.backoff_base(),
        config.backoff_max(),
    ));
    let controller = Arc::new(StreamController::new(ctx, queue, config.max_retries));

    let workers = tokio::spawn(Arc::clone(&controller).run(config.workers));
    let watch = tokio::spawn(Arc::clone(&controller).watch(streams, writer));

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = watch => {
            if let Err(e) = result {
                error!("Stream watch task failed: {}", e);
            }
        }
    }

    // Let in-flight reconciles finish before exiting
    controller.shutdown();
    if let Err(e) = workers.await {
        error!("Stream workers failed: {}", e);
    }

    info!("JetStream Operator shutting down");
    Ok(())
}
