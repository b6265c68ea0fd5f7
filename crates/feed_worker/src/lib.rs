pub mod domain;
pub mod feed_worker;
pub mod nats;

pub use domain::*;
pub use feed_worker::*;
pub use nats::*;
