/// User-facing notification seam
///
/// Mutating operations report success or failure through a collaborator so
/// the delivery channel (flash message, toast, log line) stays outside the
/// core logic. The default implementation emits structured log events.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyKind::Success => write!(f, "success"),
            NotifyKind::Error => write!(f, "error"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, message: &str);
}

/// Notifier that emits tracing events.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Success => tracing::info!(kind = %kind, "{}", message),
            NotifyKind::Error => tracing::warn!(kind = %kind, "{}", message),
        }
    }
}
