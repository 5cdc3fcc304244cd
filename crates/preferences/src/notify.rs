//! User-facing notification channel
//!
//! Failures that are swallowed by the preference layer (serialization errors,
//! unsupported import entries) are reported here as short human-readable
//! messages. The channel is advisory; nothing depends on delivery.

use tokio::sync::broadcast;

/// Sink for transient user-facing messages
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Surface a message
    fn notify(&self, message: &str);
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Notifier that fans messages out to any number of subscribers
///
/// Messages sent while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive future messages
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, message: &str) {
        tracing::debug!("Broadcasting notification: {}", message);
        let _ = self.tx.send(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();

        notifier.notify("Error importing preference: Type not supported");

        assert_eq!(rx.try_recv().unwrap(), "Error importing preference: Type not supported");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::default();
        notifier.notify("nobody listening");

        let mut rx = notifier.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_tracing_notifier_does_not_panic() {
        TracingNotifier.notify("logged only");
    }
}
