use crate::domain::result::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A changed document as delivered by the feed.
///
/// Documents are opaque JSON objects with dynamic shape. The only field this
/// code gives meaning to is the optional string `id`; everything else is
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Decode a document from a raw feed payload.
    ///
    /// Payloads must be JSON objects; anything else is rejected as an
    /// invalid document.
    pub fn from_json_bytes(payload: &[u8]) -> DomainResult<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DomainError::InvalidDocument(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// The document identity, when the `id` field is present and a string.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Full serialized form of the document.
    pub fn to_json_string(&self) -> DomainResult<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// An ordered batch of changed documents delivered in one handler
/// invocation. May be empty; no ordering is guaranteed across batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    documents: Vec<Document>,
}

impl ChangeBatch {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl From<Vec<Document>> for ChangeBatch {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_from_json_bytes() {
        let doc = Document::from_json_bytes(br#"{"id":"doc-001","Text":"hi","Number":1}"#).unwrap();
        assert_eq!(doc.id(), Some("doc-001"));
        assert_eq!(doc.get("Text"), Some(&json!("hi")));
        assert_eq!(doc.get("Number"), Some(&json!(1)));
    }

    #[test]
    fn test_document_without_id() {
        let doc = Document::from_json_bytes(br#"{"Text":"hi"}"#).unwrap();
        assert_eq!(doc.id(), None);
    }

    #[test]
    fn test_document_non_string_id() {
        let doc = Document::from_json_bytes(br#"{"id":42}"#).unwrap();
        assert_eq!(doc.id(), None);
    }

    #[test]
    fn test_document_rejects_non_object_payload() {
        let result = Document::from_json_bytes(br#"[1,2,3]"#);
        assert!(matches!(result, Err(DomainError::InvalidDocument(_))));
    }

    #[test]
    fn test_document_rejects_malformed_json() {
        let result = Document::from_json_bytes(b"not json");
        assert!(matches!(result, Err(DomainError::SerializationError(_))));
    }

    #[test]
    fn test_document_round_trips_serialized_form() {
        let payload = br#"{"id":"doc-001","Text":"hi"}"#;
        let doc = Document::from_json_bytes(payload).unwrap();
        let serialized = doc.to_json_string().unwrap();
        let reparsed = Document::from_json_bytes(serialized.as_bytes()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_change_batch_len_and_iter() {
        let docs = vec![
            Document::from_json_bytes(br#"{"id":"a"}"#).unwrap(),
            Document::from_json_bytes(br#"{"id":"b"}"#).unwrap(),
        ];
        let batch = ChangeBatch::from(docs);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());

        let ids: Vec<_> = batch.iter().filter_map(Document::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_change_batch_empty() {
        let batch = ChangeBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
