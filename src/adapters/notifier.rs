use crate::core::Notifier;

/// Prints notifications to stderr for interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_error(&self, message: &str) {
        tracing::debug!("Notifying user: {}", message);
        eprintln!("❌ {}", message);
    }
}

/// Routes notifications into the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!(notification = true, "{}", message);
    }
}
