use anyhow::Result;
use bytes::Bytes;
use common::nats::JetStreamPublisher;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Configuration for the demo document writer
pub struct DemoWriterConfig {
    /// Interval between document writes
    pub interval: Duration,
    /// Subject of the monitored collection to write into
    pub collection_subject: String,
}

impl Default for DemoWriterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            collection_subject: "appdata.items".to_string(),
        }
    }
}

/// Run a demo writer that plays the part of a client application mutating
/// the monitored collection.
///
/// It publishes a sample document at the configured interval until a
/// cancellation signal is received, so a fresh deployment has changes to
/// observe in the handler's log output.
pub async fn run_demo_writer(
    ctx: CancellationToken,
    config: DemoWriterConfig,
    publisher: Arc<dyn JetStreamPublisher>,
) -> Result<()> {
    info!(
        subject = %config.collection_subject,
        "Demo writer started"
    );

    let mut sequence: u64 = 0;

    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                info!("Received shutdown signal, stopping demo writer");
                break;
            }
            _ = tokio::time::sleep(config.interval) => {
                sequence += 1;
                let id = xid::new().to_string();

                let mut fields = serde_json::Map::new();
                fields.insert("id".to_string(), serde_json::json!(id));
                fields.insert("Text".to_string(), serde_json::json!("sample document"));
                fields.insert("Number".to_string(), serde_json::json!(sequence));
                fields.insert(
                    "created_at".to_string(),
                    serde_json::json!(chrono::Utc::now().to_rfc3339()),
                );

                let payload = match serde_json::to_vec(&fields) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize demo document");
                        continue;
                    }
                };

                match publisher
                    .publish(config.collection_subject.clone(), payload)
                    .await
                {
                    Ok(_) => {
                        debug!(
                            document_id = %id,
                            sequence = sequence,
                            "Published demo document"
                        );
                    }
                    Err(e) => {
                        error!(
                            document_id = %id,
                            error = %e,
                            "Failed to publish demo document"
                        );
                    }
                }
            }
        }
    }

    info!("Demo writer stopped gracefully");
    Ok(())
}
