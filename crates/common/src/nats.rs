mod client;
mod feed_consumer;
mod middleware;
mod trace_context;
mod traits;

pub use client::*;
pub use feed_consumer::*;
pub use middleware::*;
pub use trace_context::*;
pub use traits::*;
