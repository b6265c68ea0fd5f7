use crate::domain::InvocationLog;
use async_trait::async_trait;
use common::domain::{ChangeBatch, DomainResult};
use std::sync::Arc;

/// Contract for handling one change-feed delivery.
///
/// Implementations are stateless and reentrant: each invocation is
/// independent and may run concurrently with others. Errors propagate to
/// the delivery layer, which rejects the batch for redelivery.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_changes(&self, batch: &ChangeBatch) -> DomainResult<()>;
}

/// Handler that logs the count and contents of changed documents.
///
/// Logging is the only side effect: no transformation, filtering,
/// persistence, or downstream call is performed.
pub struct DocumentChangeHandler {
    log: Arc<dyn InvocationLog>,
}

impl DocumentChangeHandler {
    pub fn new(log: Arc<dyn InvocationLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl ChangeHandler for DocumentChangeHandler {
    async fn on_changes(&self, batch: &ChangeBatch) -> DomainResult<()> {
        if batch.is_empty() {
            self.log.log("no documents modified");
            return Ok(());
        }

        self.log.log(&format!("documents modified: {}", batch.len()));

        for document in batch.iter() {
            self.log
                .log(&format!("document: {}", document.to_json_string()?));

            if let Some(id) = document.id() {
                self.log.log(&format!("document id: {id}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::Document;
    use std::sync::Mutex;

    /// Invocation log that records every line for assertions
    #[derive(Default)]
    struct RecordingLog {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingLog {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl InvocationLog for RecordingLog {
        fn log(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    fn handler_with_log() -> (DocumentChangeHandler, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        (DocumentChangeHandler::new(log.clone()), log)
    }

    fn document(json: &str) -> Document {
        Document::from_json_bytes(json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_logs_only_no_documents_notice() {
        let (handler, log) = handler_with_log();

        handler.on_changes(&ChangeBatch::default()).await.unwrap();

        assert_eq!(log.lines(), vec!["no documents modified".to_string()]);
    }

    #[tokio::test]
    async fn test_single_document_batch() {
        let (handler, log) = handler_with_log();
        let doc = document(r#"{"id":"doc-001","Text":"hi","Number":1}"#);
        let serialized = doc.to_json_string().unwrap();
        let batch = ChangeBatch::from(vec![doc]);

        handler.on_changes(&batch).await.unwrap();

        assert_eq!(
            log.lines(),
            vec![
                "documents modified: 1".to_string(),
                format!("document: {serialized}"),
                "document id: doc-001".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_count_matches_batch_size() {
        let (handler, log) = handler_with_log();
        let batch = ChangeBatch::from(vec![
            document(r#"{"id":"a"}"#),
            document(r#"{"id":"b"}"#),
            document(r#"{"id":"c"}"#),
        ]);

        handler.on_changes(&batch).await.unwrap();

        let lines = log.lines();
        assert_eq!(lines[0], "documents modified: 3");
        let id_lines: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("document id: "))
            .collect();
        assert_eq!(id_lines.len(), 3);
    }

    #[tokio::test]
    async fn test_document_without_id_gets_no_identifier_line() {
        let (handler, log) = handler_with_log();
        let doc = document(r#"{"Text":"no identity"}"#);
        let serialized = doc.to_json_string().unwrap();
        let batch = ChangeBatch::from(vec![doc]);

        handler.on_changes(&batch).await.unwrap();

        assert_eq!(
            log.lines(),
            vec![
                "documents modified: 1".to_string(),
                format!("document: {serialized}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_mixed_batch_only_identified_documents_get_id_lines() {
        let (handler, log) = handler_with_log();
        let batch = ChangeBatch::from(vec![
            document(r#"{"id":"doc-001","Text":"hi"}"#),
            document(r#"{"Text":"anonymous"}"#),
        ]);

        handler.on_changes(&batch).await.unwrap();

        let lines = log.lines();
        assert_eq!(lines[0], "documents modified: 2");
        let id_lines: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("document id: "))
            .collect();
        assert_eq!(id_lines, vec!["document id: doc-001"]);
        let doc_lines = lines.iter().filter(|l| l.starts_with("document: ")).count();
        assert_eq!(doc_lines, 2);
    }

    #[tokio::test]
    async fn test_repeated_invocation_is_idempotent() {
        let (handler, log) = handler_with_log();
        let batch = ChangeBatch::from(vec![document(r#"{"id":"doc-001","Text":"hi"}"#)]);

        handler.on_changes(&batch).await.unwrap();
        let first = log.lines();

        handler.on_changes(&batch).await.unwrap();
        let all = log.lines();

        assert_eq!(all.len(), first.len() * 2);
        assert_eq!(&all[..first.len()], first.as_slice());
        assert_eq!(&all[first.len()..], first.as_slice());
    }
}
