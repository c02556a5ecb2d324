//! # User Notifications
//!
//! Toast-style messages surfaced by flows. The engine emits them through a
//! trait so a UI can render them; the default sink is the log.

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Sink for user-facing messages
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }
}

/// Routes notifications to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "store::notify", "{message}"),
            Severity::Success => tracing::info!(target: "store::notify", ok = true, "{message}"),
            Severity::Error => tracing::warn!(target: "store::notify", "{message}"),
        }
    }
}
