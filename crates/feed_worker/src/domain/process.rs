use crate::domain::{ChangeHandler, DocumentChangeHandler, FeedConfig, TracingInvocationLog};
use crate::nats::ChangeFeedService;

use anyhow::Result;
use common::nats::{
    FeedConsumer, FeedLoggingLayer, FeedLoggingService, FeedTracingConfig, FeedTracingLayer,
    FeedTracingService, NatsClient,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::debug;

/// Type alias for the layered change-feed service stack
type LayeredChangeFeedService = FeedTracingService<FeedLoggingService<ChangeFeedService>>;

/// Long-running process that owns the change-feed delivery loop.
///
/// Builds the handler, wraps it in the middleware stack, and drives the
/// durable consumer until cancelled. All checkpoint state stays with the
/// broker; this process is stateless.
pub struct FeedProcess {
    config: FeedConfig,
    nats_client: Arc<NatsClient>,
    cancellation_token: CancellationToken,
}

impl FeedProcess {
    pub fn new(
        config: FeedConfig,
        nats_client: Arc<NatsClient>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            nats_client,
            cancellation_token,
        }
    }

    pub async fn run(self) -> Result<()> {
        debug!(
            database = %self.config.database_name,
            collection = %self.config.collection_name,
            "starting feed process"
        );

        let handler: Arc<dyn ChangeHandler> = Arc::new(DocumentChangeHandler::new(Arc::new(
            TracingInvocationLog::new(),
        )));

        let layered_service: LayeredChangeFeedService = ServiceBuilder::new()
            .layer(FeedTracingLayer::new(FeedTracingConfig::new(
                "process_document_changes",
            )))
            .layer(FeedLoggingLayer::new())
            .service(ChangeFeedService::new(handler));

        let consumer_client = self.nats_client.create_consumer_client();
        let consumer = FeedConsumer::new(
            consumer_client,
            &self.config.database_name,
            &self.config.lease_consumer_name,
            &self.config.collection_subject(),
            self.config.batch_size,
            self.config.max_wait_secs,
            self.config.create_lease_resources,
            layered_service,
        )
        .await?;

        consumer.run(self.cancellation_token).await
    }
}
