use crate::nats::{FeedMessage, FeedRequest, FeedResponse, JetStreamConsumer, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info, warn};

/// A change-feed consumer that delivers whole batches through a Tower
/// service stack.
///
/// The durable pull consumer owns all checkpoint/lease state: messages are
/// acknowledged only after the service returns `Ack`, and a `Nak` leaves the
/// batch to be redelivered by the broker. The service never touches delivery
/// state itself.
pub struct FeedConsumer<S> {
    consumer: Box<dyn PullConsumer>,
    stream_name: String,
    consumer_name: String,
    batch_size: usize,
    max_wait: Duration,
    service: S,
}

impl<S> FeedConsumer<S>
where
    S: Service<FeedRequest, Response = FeedResponse, Error = anyhow::Error> + Send + 'static,
    S::Future: Send + 'static,
{
    /// Create a feed consumer.
    ///
    /// When `create_if_missing` is set the durable consumer is created (or
    /// updated) on the stream; otherwise the consumer binds to an existing
    /// durable and fails fast if it is absent.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        create_if_missing: bool,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            filter_subject = %subject_filter,
            create_if_missing = create_if_missing,
            "creating feed consumer"
        );

        let consumer = if create_if_missing {
            let config = jetstream::consumer::pull::Config {
                name: Some(consumer_name.to_string()),
                durable_name: Some(consumer_name.to_string()),
                filter_subject: subject_filter.to_string(),
                ack_policy: jetstream::consumer::AckPolicy::Explicit,
                ..Default::default()
            };

            jetstream
                .create_consumer(config, stream_name)
                .await
                .context("failed to create feed consumer")?
        } else {
            jetstream
                .get_consumer(consumer_name, stream_name)
                .await
                .context("failed to bind to feed consumer")?
        };

        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            "feed consumer ready"
        );

        Ok(Self {
            consumer,
            stream_name: stream_name.to_string(),
            consumer_name: consumer_name.to_string(),
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            service,
        })
    }

    /// Run the delivery loop until cancellation
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        debug!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "starting feed consumer"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        stream = %self.stream_name,
                        consumer = %self.consumer_name,
                        "received shutdown signal, stopping feed consumer"
                    );
                    break;
                }
                result = self.fetch_and_deliver_batch() => {
                    if let Err(e) = result {
                        error!(
                            stream = %self.stream_name,
                            consumer = %self.consumer_name,
                            error = %e,
                            "error delivering batch"
                        );
                        // Continue consuming despite errors
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        debug!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "feed consumer stopped gracefully"
        );
        Ok(())
    }

    async fn fetch_and_deliver_batch(&mut self) -> Result<()> {
        debug!(
            batch_size = self.batch_size,
            max_wait_secs = self.max_wait.as_secs(),
            "fetching change batch"
        );

        let raw_messages = self
            .consumer
            .fetch_messages(self.batch_size, self.max_wait)
            .await?;

        if raw_messages.is_empty() {
            debug!("no changes in batch");
            return Ok(());
        }

        debug!(message_count = raw_messages.len(), "received change batch");

        // Convert NATS messages to an owned batch request
        let request = FeedRequest::new(
            raw_messages
                .iter()
                .map(|msg| {
                    FeedMessage::new(
                        msg.subject.to_string(),
                        Bytes::copy_from_slice(&msg.payload),
                        msg.headers.clone(),
                    )
                })
                .collect(),
        );

        // Deliver the whole batch through the Tower service
        let response = match self.service.call(request).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    stream = %self.stream_name,
                    error = %e,
                    "service error delivering batch"
                );
                FeedResponse::nak(e.to_string())
            }
        };

        // The handler either consumed the whole batch or it did not; the
        // checkpoint advances only on Ack.
        match response {
            FeedResponse::Ack => {
                for msg in &raw_messages {
                    if let Err(e) = msg.ack().await {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to acknowledge message"
                        );
                    }
                }
            }
            FeedResponse::Nak(reason) => {
                match &reason {
                    Some(r) => warn!(
                        message_count = raw_messages.len(),
                        reason = %r,
                        "rejecting batch for redelivery"
                    ),
                    None => warn!(
                        message_count = raw_messages.len(),
                        "rejecting batch for redelivery"
                    ),
                }

                for msg in &raw_messages {
                    if let Err(e) = msg.ack_with(jetstream::AckKind::Nak(None)).await {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to reject message"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nats::traits::{MockJetStreamConsumer, MockPullConsumer};
    use futures::future::BoxFuture;
    use std::task::{Context, Poll};

    /// Simple test service that acks every batch
    #[derive(Clone)]
    struct AckAllService;

    impl Service<FeedRequest> for AckAllService {
        type Response = FeedResponse;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<FeedResponse, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: FeedRequest) -> Self::Future {
            Box::pin(async move { Ok(FeedResponse::Ack) })
        }
    }

    #[tokio::test]
    async fn test_feed_consumer_creates_durable_consumer() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .withf(
                |config: &jetstream::consumer::pull::Config, stream_name: &str| {
                    config.durable_name.as_deref() == Some("docfeed-lease")
                        && config.filter_subject == "appdata.items"
                        && stream_name == "appdata"
                },
            )
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let result = FeedConsumer::new(
            Arc::new(mock_jetstream),
            "appdata",
            "docfeed-lease",
            "appdata.items",
            10,
            5,
            true,
            AckAllService,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_feed_consumer_binds_existing_consumer() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_get_consumer()
            .withf(|consumer_name: &str, stream_name: &str| {
                consumer_name == "docfeed-lease" && stream_name == "appdata"
            })
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let result = FeedConsumer::new(
            Arc::new(mock_jetstream),
            "appdata",
            "docfeed-lease",
            "appdata.items",
            10,
            5,
            false,
            AckAllService,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_feed_consumer_fails_fast_when_lease_consumer_missing() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_get_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("consumer not found")));

        let result = FeedConsumer::new(
            Arc::new(mock_jetstream),
            "appdata",
            "docfeed-lease",
            "appdata.items",
            10,
            5,
            false,
            AckAllService,
        )
        .await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("failed to bind to feed consumer"));
    }

    #[tokio::test]
    async fn test_feed_consumer_creation_failure() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("stream not found")));

        let result = FeedConsumer::new(
            Arc::new(mock_jetstream),
            "appdata",
            "docfeed-lease",
            "appdata.items",
            10,
            5,
            true,
            AckAllService,
        )
        .await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("failed to create feed consumer"));
    }

    #[tokio::test]
    async fn test_empty_fetch_skips_delivery() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages()
                    .times(1)
                    .returning(|_, _| Ok(vec![]));
                Ok(Box::new(mock))
            });

        let mut consumer = FeedConsumer::new(
            Arc::new(mock_jetstream),
            "appdata",
            "docfeed-lease",
            "appdata.items",
            10,
            5,
            true,
            AckAllService,
        )
        .await
        .unwrap();

        let result = consumer.fetch_and_deliver_batch().await;
        assert!(result.is_ok());
    }
}
