use crate::domain::ChangeHandler;
use common::domain::{ChangeBatch, Document};
use common::nats::{FeedRequest, FeedResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, error};

/// Tower service for one change-feed delivery.
///
/// This service:
/// 1. Decodes each raw payload into a Document
/// 2. Delegates the assembled ChangeBatch to the ChangeHandler
/// 3. Returns Ack on success, Nak on failure
#[derive(Clone)]
pub struct ChangeFeedService {
    handler: Arc<dyn ChangeHandler>,
}

impl ChangeFeedService {
    pub fn new(handler: Arc<dyn ChangeHandler>) -> Self {
        Self { handler }
    }
}

impl Service<FeedRequest> for ChangeFeedService {
    type Response = FeedResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FeedRequest) -> Self::Future {
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let mut documents = Vec::with_capacity(req.messages.len());
            for msg in &req.messages {
                match Document::from_json_bytes(&msg.payload) {
                    Ok(document) => documents.push(document),
                    Err(e) => {
                        error!(
                            subject = %msg.subject,
                            error = %e,
                            "failed to decode changed document"
                        );
                        return Ok(FeedResponse::nak(format!("decode error: {}", e)));
                    }
                }
            }

            let batch = ChangeBatch::from(documents);

            debug!(batch_size = batch.len(), "invoking change handler");

            match handler.on_changes(&batch).await {
                Ok(()) => Ok(FeedResponse::Ack),
                Err(e) => {
                    error!(
                        batch_size = batch.len(),
                        error = %e,
                        "change handler failed"
                    );
                    Ok(FeedResponse::nak(format!("handler error: {}", e)))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockChangeHandler;
    use bytes::Bytes;
    use common::domain::DomainError;
    use common::nats::FeedMessage;

    fn request_with_payloads(payloads: Vec<&str>) -> FeedRequest {
        FeedRequest::new(
            payloads
                .into_iter()
                .map(|p| {
                    FeedMessage::new(
                        "appdata.items".to_string(),
                        Bytes::copy_from_slice(p.as_bytes()),
                        None,
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_successful_delivery_acks() {
        let mut handler = MockChangeHandler::new();
        handler
            .expect_on_changes()
            .withf(|batch| batch.len() == 2)
            .times(1)
            .returning(|_| Ok(()));

        let mut service = ChangeFeedService::new(Arc::new(handler));
        let response = service
            .call(request_with_payloads(vec![
                r#"{"id":"doc-001","Text":"hi"}"#,
                r#"{"id":"doc-002"}"#,
            ]))
            .await
            .unwrap();

        assert!(response.is_ack());
    }

    #[tokio::test]
    async fn test_handler_error_naks() {
        let mut handler = MockChangeHandler::new();
        handler.expect_on_changes().times(1).returning(|_| {
            Err(DomainError::InvalidDocument(
                "handler rejected batch".to_string(),
            ))
        });

        let mut service = ChangeFeedService::new(Arc::new(handler));
        let response = service
            .call(request_with_payloads(vec![r#"{"id":"doc-001"}"#]))
            .await
            .unwrap();

        assert!(response.is_nak());
        if let FeedResponse::Nak(Some(reason)) = response {
            assert!(reason.contains("handler error"));
        } else {
            panic!("Expected Nak with reason");
        }
    }

    #[tokio::test]
    async fn test_decode_failure_naks_without_invoking_handler() {
        let mut handler = MockChangeHandler::new();
        handler.expect_on_changes().times(0);

        let mut service = ChangeFeedService::new(Arc::new(handler));
        let response = service
            .call(request_with_payloads(vec![
                r#"{"id":"doc-001"}"#,
                "not json at all",
            ]))
            .await
            .unwrap();

        assert!(response.is_nak());
        if let FeedResponse::Nak(Some(reason)) = response {
            assert!(reason.contains("decode error"));
        } else {
            panic!("Expected Nak with reason");
        }
    }

    #[tokio::test]
    async fn test_empty_request_delivers_empty_batch() {
        let mut handler = MockChangeHandler::new();
        handler
            .expect_on_changes()
            .withf(|batch| batch.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let mut service = ChangeFeedService::new(Arc::new(handler));
        let response = service.call(FeedRequest::default()).await.unwrap();

        assert!(response.is_ack());
    }
}
