use tracing::info;

/// Logging capability of the invocation context.
///
/// The hosting process injects an implementation into the handler instead of
/// the handler reaching for a global logger, which keeps the handler's
/// output observable in tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait InvocationLog: Send + Sync {
    fn log(&self, line: &str);
}

/// Production invocation log that emits through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingInvocationLog;

impl TracingInvocationLog {
    pub fn new() -> Self {
        Self
    }
}

impl InvocationLog for TracingInvocationLog {
    fn log(&self, line: &str) {
        info!(target: "change_handler", "{line}");
    }
}
