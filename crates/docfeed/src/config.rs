use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL (the connection reference for the change feed)
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Change feed configuration
    /// Monitored database name (JetStream stream)
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Monitored collection name (subject under the database stream)
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Durable consumer name holding checkpoint/lease state
    #[serde(default = "default_lease_consumer_name")]
    pub lease_consumer_name: String,

    /// Auto-create the stream and lease consumer on startup
    #[serde(default = "default_create_lease_resources")]
    pub create_lease_resources: bool,

    /// Max documents per delivered batch
    #[serde(default = "default_feed_batch_size")]
    pub feed_batch_size: usize,

    /// Max seconds to wait when filling a batch
    #[serde(default = "default_feed_max_wait_secs")]
    pub feed_max_wait_secs: u64,

    // Demo writer configuration
    /// Run the demo document writer alongside the feed worker
    #[serde(default = "default_demo_writer_enabled")]
    pub demo_writer_enabled: bool,

    /// Interval between demo document writes in seconds
    #[serde(default = "default_demo_writer_interval_secs")]
    pub demo_writer_interval_secs: u64,

    // OpenTelemetry configuration
    /// OpenTelemetry OTLP endpoint (gRPC)
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    /// Enable OpenTelemetry export
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    /// Service name for OpenTelemetry resource
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// Change feed defaults
fn default_database_name() -> String {
    "appdata".to_string()
}

fn default_collection_name() -> String {
    "items".to_string()
}

fn default_lease_consumer_name() -> String {
    "docfeed-lease".to_string()
}

fn default_create_lease_resources() -> bool {
    true
}

fn default_feed_batch_size() -> usize {
    100
}

fn default_feed_max_wait_secs() -> u64 {
    5
}

// Demo writer defaults
fn default_demo_writer_enabled() -> bool {
    false
}

fn default_demo_writer_interval_secs() -> u64 {
    5
}

// OpenTelemetry defaults
fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_service_name() -> String {
    "docfeed".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("DOCFEED"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("DOCFEED_DATABASE_NAME");
            std::env::remove_var("DOCFEED_CREATE_LEASE_RESOURCES");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_name, "appdata");
        assert_eq!(config.collection_name, "items");
        assert_eq!(config.lease_consumer_name, "docfeed-lease");
        assert!(config.create_lease_resources);
        assert!(!config.demo_writer_enabled);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("DOCFEED_DATABASE_NAME", "inventory");
            std::env::set_var("DOCFEED_CREATE_LEASE_RESOURCES", "false");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.database_name, "inventory");
        assert!(!config.create_lease_resources);

        // Clean up
        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("DOCFEED_DATABASE_NAME");
            std::env::remove_var("DOCFEED_CREATE_LEASE_RESOURCES");
        }
    }
}
