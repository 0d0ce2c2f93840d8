use crate::domain::errors::StoreResult;
use crate::models::PasswordResetToken;
use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

/// Why a conditional redemption matched nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemRejection {
    NotFound,
    AlreadyUsed,
    Expired,
    AccountMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed {
        account_id: String,
        siblings_invalidated: u64,
    },
    Rejected(RedeemRejection),
}

/// Token store shared by the issuer, the redeemer and the reaper.
///
/// Every mutating method is atomic: it either applies completely or not at all.
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Invalidate every unused token of the account and insert `token`.
    /// Returns how many tokens were superseded. A racing issuance for the same
    /// account or a duplicate hash fails with `StoreError::Conflict`.
    async fn issue_token(&self, token: &PasswordResetToken, now: OffsetDateTime)
        -> StoreResult<u64>;

    async fn find_token(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>>;

    /// Claim the token if it is still unused and unexpired at `now`, write the
    /// new password hash and invalidate the account's other unused tokens.
    async fn redeem_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> StoreResult<RedeemOutcome>;

    /// Delete used tokens and tokens expired for longer than `retention`
    async fn delete_sweepable(&self, now: OffsetDateTime, retention: Duration) -> StoreResult<u64>;

    /// All tokens of an account, newest first
    async fn list_account_tokens(&self, account_id: &str) -> StoreResult<Vec<PasswordResetToken>>;
}
