use time::OffsetDateTime;
use tokio::sync::broadcast;

/// Recovery lifecycle notifications for anything outside the auth core
/// (admin views, audit sinks). Never carries raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryEvent {
    ResetIssued {
        account_id: String,
        superseded: u64,
        expires_at: OffsetDateTime,
    },
    ResetLinkDelivered {
        account_id: String,
        provider: &'static str,
    },
    DeliveryFailed {
        account_id: String,
        provider: &'static str,
        timestamp: OffsetDateTime,
    },
    PasswordReset {
        account_id: String,
        siblings_invalidated: u64,
        timestamp: OffsetDateTime,
    },
    TokensSwept {
        deleted: u64,
        timestamp: OffsetDateTime,
    },
}

/// Event bus for publishing and subscribing to recovery events
#[derive(Clone)]
pub struct RecoveryEventBus {
    tx: broadcast::Sender<RecoveryEvent>,
}

impl RecoveryEventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers (non-blocking, fire-and-forget)
    pub fn publish(&self, event: RecoveryEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Recovery event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RecoveryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
