use crate::domain::{FeedConfig, FeedProcess};
use common::nats::NatsClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct FeedWorkerConfig {
    pub feed_config: FeedConfig,
}

pub struct FeedWorker {
    feed_config: FeedConfig,
    nats_client: Arc<NatsClient>,
}

impl FeedWorker {
    pub fn new(nats_client: Arc<NatsClient>, config: FeedWorkerConfig) -> Self {
        debug!("initializing change-feed worker module");
        Self {
            feed_config: config.feed_config,
            nats_client,
        }
    }

    #[allow(clippy::type_complexity)]
    pub fn into_runner_process(
        self,
    ) -> Box<
        dyn FnOnce(
                CancellationToken,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
            > + Send,
    > {
        Box::new({
            let feed_config = self.feed_config;
            let nats_client = self.nats_client;
            move |ctx| {
                let process = FeedProcess::new(feed_config, nats_client, ctx);
                Box::pin(async move { process.run().await })
            }
        })
    }
}
