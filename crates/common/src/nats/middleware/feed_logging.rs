use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::nats::{FeedRequest, FeedResponse};
use tower::{Layer, Service};
use tracing::{Instrument, Span, error, info};

/// Tower layer that logs the outcome of each change-feed delivery
#[derive(Clone, Default)]
pub struct FeedLoggingLayer;

impl FeedLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for FeedLoggingLayer {
    type Service = FeedLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        FeedLoggingService { inner: service }
    }
}

/// Service that logs batch deliveries
#[derive(Clone)]
pub struct FeedLoggingService<S> {
    inner: S,
}

impl<S> Service<FeedRequest> for FeedLoggingService<S>
where
    S: Service<FeedRequest, Response = FeedResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: FeedRequest) -> Self::Future {
        let batch_size = req.batch_size();
        let start = Instant::now();
        let mut inner = self.inner.clone();

        let span = Span::current();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let duration_ms = start.elapsed().as_millis();

                match &result {
                    Ok(response) => {
                        let outcome = if response.is_ack() { "ack" } else { "nak" };

                        info!(
                            batch_size = batch_size,
                            outcome = %outcome,
                            duration_ms = %duration_ms,
                            "delivered batch of {batch_size} in {duration_ms}ms [{outcome}]"
                        );
                    }
                    Err(e) => {
                        error!(
                            batch_size = batch_size,
                            duration_ms = %duration_ms,
                            error = %e,
                            "failed to deliver batch of {batch_size} in {duration_ms}ms: {e}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
