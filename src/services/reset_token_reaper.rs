use std::sync::Arc;
use std::time::Duration as StdDuration;

use metrics::counter;
use time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::{
    config::StoreConfig,
    domain::{
        errors::{ResetResult, StoreError, StoreResult},
        ports::{password_reset_repository::PasswordResetRepository, time_service::TimeService},
    },
    events::{RecoveryEvent, RecoveryEventBus},
};

#[derive(Clone, Debug)]
pub struct ReaperSettings {
    /// How long expired rows are kept for inspection
    pub retention: Duration,
    pub interval: StdDuration,
    pub store_timeout: StdDuration,
}

impl ReaperSettings {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            retention: Duration::minutes(config.token_retention_minutes as i64),
            interval: StdDuration::from_secs(config.sweep_interval_secs.max(1)),
            store_timeout: StdDuration::from_millis(config.store_timeout_ms),
        }
    }
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            retention: Duration::hours(1),
            interval: StdDuration::from_secs(300),
            store_timeout: StdDuration::from_secs(5),
        }
    }
}

/// Deletes used reset tokens and tokens expired past the retention margin.
/// Rows that could still authorize a reset are never touched.
#[derive(Clone)]
pub struct ResetTokenReaper {
    tokens: Arc<dyn PasswordResetRepository>,
    clock: Arc<dyn TimeService>,
    events: RecoveryEventBus,
    settings: ReaperSettings,
}

impl ResetTokenReaper {
    pub fn new(
        tokens: Arc<dyn PasswordResetRepository>,
        clock: Arc<dyn TimeService>,
        settings: ReaperSettings,
    ) -> Self {
        Self {
            tokens,
            clock,
            events: RecoveryEventBus::default(),
            settings,
        }
    }

    pub fn with_events(mut self, events: RecoveryEventBus) -> Self {
        self.events = events;
        self
    }

    /// One sweep; returns the number of deleted rows
    pub async fn sweep(&self) -> ResetResult<u64> {
        Ok(self.try_sweep().await?)
    }

    /// Same as [`sweep`](Self::sweep) but keeps the store error, for operators
    pub async fn try_sweep(&self) -> StoreResult<u64> {
        let now = self.clock.now();
        let tokens = self.tokens.clone();
        let retention = self.settings.retention;

        // Detached so an abandoned caller cannot interrupt the delete
        let handle =
            tokio::spawn(async move { tokens.delete_sweepable(now, retention).await });

        let deleted = match tokio::time::timeout(self.settings.store_timeout, handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => return Err(StoreError::Aborted(join_err.to_string())),
            Err(_) => return Err(StoreError::Timeout(self.settings.store_timeout)),
        };

        counter!("password_reset_tokens_swept_total").increment(deleted);
        if deleted > 0 {
            tracing::info!(deleted, "Password reset token sweep completed");
        } else {
            tracing::debug!("Password reset token sweep found nothing to delete");
        }
        self.events.publish(RecoveryEvent::TokensSwept {
            deleted,
            timestamp: now,
        });

        Ok(deleted)
    }

    /// Sweep forever on the configured interval
    pub async fn run(self) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Reset token reaper started ({}s interval, {} minute retention)",
            self.settings.interval.as_secs(),
            self.settings.retention.whole_minutes()
        );

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep().await {
                tracing::error!("Reset token sweep failed: {}", e);
            }
        }
    }
}
