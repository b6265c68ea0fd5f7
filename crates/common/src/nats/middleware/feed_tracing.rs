use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::nats::trace_context::extract_trace_context;
use crate::nats::{FeedRequest, FeedResponse};
use tower::{Layer, Service};
use tracing::{Instrument, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Configuration for the feed tracing layer
#[derive(Clone)]
pub struct FeedTracingConfig {
    /// Operation name recorded on the delivery span
    pub operation: String,
}

impl FeedTracingConfig {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

/// Tower layer that opens a span per change-feed delivery
#[derive(Clone)]
pub struct FeedTracingLayer {
    config: FeedTracingConfig,
}

impl FeedTracingLayer {
    pub fn new(config: FeedTracingConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for FeedTracingLayer {
    type Service = FeedTracingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        FeedTracingService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

/// Service that adds a root span to each delivery
#[derive(Clone)]
pub struct FeedTracingService<S> {
    inner: S,
    config: FeedTracingConfig,
}

impl<S> Service<FeedRequest> for FeedTracingService<S>
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
        let operation = self.config.operation.clone();

        // Root span per delivery - break from any inherited trace context
        let span = info_span!(
            target: "nats",
            parent: None,
            "feed_delivery",
            otel.name = %operation,
            messaging.system = "nats",
            messaging.operation = "receive",
            messaging.batch.message_count = batch_size,
        );

        // Continue the publisher's trace when the first message carries one
        if let Some(headers) = req.messages.first().and_then(|m| m.headers.as_ref()) {
            span.set_parent(extract_trace_context(headers));
        }

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let result = inner.call(req).await;

                if let Err(e) = &result {
                    tracing::error!(error = %e, "feed delivery failed");
                }

                result
            }
            .instrument(span),
        )
    }
}
