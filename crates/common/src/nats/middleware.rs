mod feed_logging;
mod feed_tracing;
mod feed_types;

pub use feed_logging::*;
pub use feed_tracing::*;
pub use feed_types::*;
