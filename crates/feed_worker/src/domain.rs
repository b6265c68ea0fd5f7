mod change_handler;
mod change_log;
mod feed_config;
mod process;

pub use change_handler::*;
pub use change_log::*;
pub use feed_config::*;
pub use process::*;
