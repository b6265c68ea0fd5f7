mod config;

use common::nats::NatsClient;
use common::telemetry::{TelemetryConfig, TelemetryProviders, init_telemetry, shutdown_telemetry};
use config::ServiceConfig;
use docfeed_runner::Runner;
use feed_worker::domain::FeedConfig;
use feed_worker::feed_worker::{FeedWorker, FeedWorkerConfig};
use feed_worker::nats::{DemoWriterConfig, run_demo_writer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        database = %config.database_name,
        collection = %config.collection_name,
        "Starting docfeed service"
    );
    debug!("Configuration: {:?}", config);

    // Connect to NATS, the change-feed delivery collaborator
    let nats_client = match NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.startup_timeout_secs),
    )
    .await
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to connect to NATS: {}", e);
            std::process::exit(1);
        }
    };

    // Auto-create feed resources when configured; otherwise the stream and
    // lease consumer must already exist
    if config.create_lease_resources {
        if let Err(e) = nats_client.ensure_stream(&config.database_name).await {
            error!("Failed to ensure feed stream: {}", e);
            std::process::exit(1);
        }
    }

    let feed_config = FeedConfig {
        database_name: config.database_name.clone(),
        collection_name: config.collection_name.clone(),
        lease_consumer_name: config.lease_consumer_name.clone(),
        create_lease_resources: config.create_lease_resources,
        batch_size: config.feed_batch_size,
        max_wait_secs: config.feed_max_wait_secs,
    };
    let collection_subject = feed_config.collection_subject();

    let feed_worker = FeedWorker::new(nats_client.clone(), FeedWorkerConfig { feed_config });

    // Build runner with all processes
    let mut runner = Runner::new();
    runner = runner.with_named_process("feed_worker", feed_worker.into_runner_process());

    // Optional demo writer playing the part of a client application
    if config.demo_writer_enabled {
        let publisher = nats_client.create_publisher_client();
        let writer_config = DemoWriterConfig {
            interval: Duration::from_secs(config.demo_writer_interval_secs),
            collection_subject,
        };
        runner = runner.with_named_process(
            "demo_writer",
            Box::new(move |ctx| Box::pin(run_demo_writer(ctx, writer_config, publisher))),
        );
    }

    // Cleanup handlers
    runner = runner
        .with_closer({
            let nats_for_close = Arc::clone(&nats_client);
            move || {
                Box::pin(async move {
                    info!("Running cleanup tasks...");
                    nats_for_close.close().await;

                    // Shutdown telemetry and flush pending spans
                    shutdown_telemetry(telemetry_providers);

                    info!("Cleanup complete");
                    Ok(())
                })
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    // Run the service
    runner.run().await;
}
