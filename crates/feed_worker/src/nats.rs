mod change_feed_service;
mod demo_writer;

pub use change_feed_service::*;
pub use demo_writer::*;
