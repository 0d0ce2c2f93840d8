/// Password Reset Service
///
/// Issuer and redeemer for password reset tokens:
/// - Token generation, keyed hashing and validation
/// - Email enumeration prevention (uniform response, decoy work, timing floor)
/// - Atomic redemption with single-use claim
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use metrics::counter;
use time::Duration;

use crate::{
    config::Config,
    domain::{
        errors::{ResetError, ResetResult, StoreError, StoreResult},
        ports::{
            account_repository::AccountRepository,
            password_policy::PasswordPolicy,
            password_reset_repository::{PasswordResetRepository, RedeemOutcome},
            time_service::TimeService,
        },
    },
    events::{RecoveryEvent, RecoveryEventBus},
    infrastructure::runtime::TokioTimeService,
    models::{IssuedReset, PasswordResetToken, ResetIssuance},
    services::{
        auth::{hash_password, ComplexityPolicy},
        email_validator::normalize_email,
        reset_token::{generate_reset_token, is_well_formed, ResetTokenHasher},
    },
};

/// Fresh tokens tried before a persistent conflict is reported
const ISSUE_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct ResetSettings {
    pub token_ttl: Duration,
    pub store_timeout: StdDuration,
    /// Floor for `request_reset` so found and not-found take the same time
    pub min_request_duration: StdDuration,
}

impl ResetSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token_ttl: Duration::minutes(config.token_ttl_minutes as i64),
            store_timeout: StdDuration::from_millis(config.store.store_timeout_ms),
            min_request_duration: StdDuration::from_millis(config.request_min_duration_ms),
        }
    }
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::minutes(15),
            store_timeout: StdDuration::from_secs(5),
            min_request_duration: StdDuration::from_millis(250),
        }
    }
}

#[derive(Clone)]
pub struct PasswordResetService {
    tokens: Arc<dyn PasswordResetRepository>,
    accounts: Arc<dyn AccountRepository>,
    hasher: ResetTokenHasher,
    policy: Arc<dyn PasswordPolicy>,
    clock: Arc<dyn TimeService>,
    events: RecoveryEventBus,
    settings: ResetSettings,
}

impl PasswordResetService {
    pub fn new(
        tokens: Arc<dyn PasswordResetRepository>,
        accounts: Arc<dyn AccountRepository>,
        hasher: ResetTokenHasher,
        settings: ResetSettings,
    ) -> Self {
        Self {
            tokens,
            accounts,
            hasher,
            policy: Arc::new(ComplexityPolicy),
            clock: Arc::new(TokioTimeService::new()),
            events: RecoveryEventBus::default(),
            settings,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeService>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: RecoveryEventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &RecoveryEventBus {
        &self.events
    }

    pub fn settings(&self) -> &ResetSettings {
        &self.settings
    }

    /// Request a password reset for an email address.
    ///
    /// Unknown and malformed addresses get the same answer as known ones,
    /// after the same kind of work and no sooner than the configured floor.
    /// Only a store failure is reported as an error.
    pub async fn request_reset(&self, email: &str) -> ResetResult<ResetIssuance> {
        let started = Instant::now();
        counter!("password_reset_requests_total").increment(1);

        let outcome = self.issue(email).await;
        self.pad_request(started).await;

        match outcome {
            Ok(issued) => Ok(ResetIssuance::issued(issued)),
            Err(ResetError::AccountNotFound) => Ok(ResetIssuance::not_issued()),
            Err(err) => Err(err),
        }
    }

    async fn issue(&self, email: &str) -> ResetResult<IssuedReset> {
        let Some(email) = normalize_email(email) else {
            self.decoy_work().await;
            return Err(ResetError::AccountNotFound);
        };

        let Some(account) = self
            .bounded(self.accounts.find_account_by_email(&email))
            .await?
        else {
            tracing::info!("Password reset requested for unknown email");
            self.decoy_work().await;
            return Err(ResetError::AccountNotFound);
        };

        let mut attempt = 1;
        loop {
            let raw = generate_reset_token();
            let now = self.clock.now();
            let record = PasswordResetToken::new(
                account.id.clone(),
                self.hasher.hash(raw.expose()),
                now,
                self.settings.token_ttl,
            );
            let expires_at = record.expires_at;

            let result = self
                .detached(move |tokens| async move { tokens.issue_token(&record, now).await })
                .await;

            match result {
                Ok(superseded) => {
                    tracing::info!(
                        account_id = %account.id,
                        superseded,
                        "Password reset token issued"
                    );
                    counter!("password_reset_tokens_issued_total").increment(1);
                    self.events.publish(RecoveryEvent::ResetIssued {
                        account_id: account.id.clone(),
                        superseded,
                        expires_at,
                    });

                    return Ok(IssuedReset {
                        account_id: account.id,
                        email: account.email,
                        token: raw,
                        issued_at: now,
                        expires_at,
                    });
                }
                Err(StoreError::Conflict(detail)) if attempt < ISSUE_ATTEMPTS => {
                    tracing::warn!(
                        account_id = %account.id,
                        attempt,
                        "Reset token issuance conflicted, retrying: {}",
                        detail
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Mirror the found path: generate and hash a token and hit the store once
    async fn decoy_work(&self) {
        let decoy = generate_reset_token();
        let decoy_hash = self.hasher.hash(decoy.expose());
        if let Err(err) = self.bounded(self.tokens.find_token(&decoy_hash)).await {
            tracing::debug!(error = %err, "Decoy token lookup failed");
        }
    }

    async fn pad_request(&self, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed < self.settings.min_request_duration {
            self.clock
                .sleep(self.settings.min_request_duration - elapsed)
                .await;
        } else {
            tracing::debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Reset request exceeded its timing floor"
            );
        }
    }

    /// Validate a reset token and return the token record if valid
    ///
    /// Token is valid if:
    /// - It is well formed
    /// - It exists in the store
    /// - It has not been used
    /// - It has not expired (expires_at > now)
    pub async fn validate_reset_token(&self, token: &str) -> ResetResult<PasswordResetToken> {
        if !is_well_formed(token) {
            tracing::debug!("Rejected malformed reset token");
            return Err(ResetError::InvalidToken);
        }

        let record = self
            .bounded(self.tokens.find_token(&self.hasher.hash(token)))
            .await?
            .ok_or_else(|| {
                tracing::debug!("Rejected unknown reset token");
                ResetError::InvalidToken
            })?;

        if record.used {
            tracing::debug!(
                account_id = %record.account_id,
                invalidation = ?record.invalidation,
                "Rejected used reset token"
            );
            return Err(ResetError::InvalidToken);
        }

        if record.is_expired(self.clock.now()) {
            tracing::debug!(account_id = %record.account_id, "Rejected expired reset token");
            return Err(ResetError::InvalidToken);
        }

        Ok(record)
    }

    /// Read-only check used by the reset form before asking for a password
    pub async fn verify_token(&self, token: &str) -> ResetResult<()> {
        self.validate_reset_token(token).await.map(|_| ())
    }

    /// Reset password using a valid token
    ///
    /// Password write, token claim and sibling invalidation happen in one
    /// store transaction. Of two concurrent calls with the same token exactly
    /// one succeeds.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ResetResult<()> {
        let result = self.redeem(token, new_password).await;

        let outcome = match &result {
            Ok(()) => "success",
            Err(ResetError::InvalidToken) => "invalid_token",
            Err(ResetError::PolicyViolation(_)) => "policy_violation",
            Err(_) => "error",
        };
        counter!("password_reset_redemptions_total", "outcome" => outcome).increment(1);

        result
    }

    async fn redeem(&self, token: &str, new_password: &str) -> ResetResult<()> {
        let record = self.validate_reset_token(token).await?;

        self.policy
            .check(new_password)
            .map_err(ResetError::PolicyViolation)?;

        let password = new_password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {}", e);
                ResetError::Internal
            })?
            .map_err(|e| {
                tracing::error!("Password hashing failed: {}", e);
                ResetError::Internal
            })?;

        // Hashing is slow; judge expiry at the moment of the claim
        let now = self.clock.now();
        let token_hash = record.token_hash;
        let outcome = self
            .detached(move |tokens| async move {
                tokens.redeem_token(&token_hash, &password_hash, now).await
            })
            .await?;

        match outcome {
            RedeemOutcome::Redeemed {
                account_id,
                siblings_invalidated,
            } => {
                tracing::info!(
                    account_id = %account_id,
                    siblings_invalidated,
                    "Password reset successful"
                );
                self.events.publish(RecoveryEvent::PasswordReset {
                    account_id,
                    siblings_invalidated,
                    timestamp: now,
                });
                Ok(())
            }
            RedeemOutcome::Rejected(reason) => {
                tracing::debug!(
                    account_id = %record.account_id,
                    ?reason,
                    "Reset token claim rejected"
                );
                Err(ResetError::InvalidToken)
            }
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.settings.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.settings.store_timeout)),
        }
    }

    /// Run a store mutation on its own task. The caller waits at most
    /// `store_timeout`; if it gives up or is dropped, the transaction still
    /// commits or rolls back on its own.
    async fn detached<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(Arc<dyn PasswordResetRepository>) -> Fut,
        Fut: Future<Output = StoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(op(self.tokens.clone()));
        match tokio::time::timeout(self.settings.store_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::Aborted(join_err.to_string())),
            Err(_) => Err(StoreError::Timeout(self.settings.store_timeout)),
        }
    }
}
