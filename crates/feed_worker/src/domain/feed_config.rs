/// Configuration for the change-feed worker.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Monitored database; maps to the JetStream stream name
    pub database_name: String,
    /// Monitored collection; maps to a subject under the database stream
    pub collection_name: String,
    /// Durable consumer that persists checkpoint/lease state
    pub lease_consumer_name: String,
    /// Whether the durable (lease) consumer is auto-created on startup
    pub create_lease_resources: bool,
    /// Max documents per delivered batch
    pub batch_size: usize,
    /// Max seconds to wait when filling a batch
    pub max_wait_secs: u64,
}

impl FeedConfig {
    /// The subject the monitored collection's changes arrive on.
    pub fn collection_subject(&self) -> String {
        format!("{}.{}", self.database_name, self.collection_name)
    }
}
