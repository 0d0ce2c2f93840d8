use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::ports::account_repository::AccountRepository;
use crate::domain::ports::password_reset_repository::{
    PasswordResetRepository, RedeemOutcome, RedeemRejection,
};
use crate::models::{Account, PasswordResetToken, TokenInvalidation};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, PasswordResetToken>,
    unavailable: bool,
    latency: Option<StdDuration>,
}

/// In-process account and token store.
///
/// Every operation runs under one lock, which gives the same all-or-nothing
/// behaviour as the SQL transactions. Used by unit tests and local tooling.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, account: Account) {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.id.clone(), account);
    }

    pub async fn account(&self, account_id: &str) -> Option<Account> {
        self.state.lock().await.accounts.get(account_id).cloned()
    }

    /// Store a token row as-is, bypassing issuance rules
    pub async fn insert_token(&self, token: PasswordResetToken) {
        let mut state = self.state.lock().await;
        state.tokens.insert(token.token_hash.clone(), token);
    }

    pub async fn token_count(&self) -> usize {
        self.state.lock().await.tokens.len()
    }

    /// Make every subsequent call fail like an unreachable database
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Delay every subsequent call, while holding the store lock
    pub async fn set_latency(&self, latency: Option<StdDuration>) {
        self.state.lock().await.latency = latency;
    }

    async fn lock(&self) -> StoreResult<tokio::sync::MutexGuard<'_, MemoryState>> {
        let state = self.state.lock().await;
        if let Some(latency) = state.latency {
            tokio::time::sleep(latency).await;
        }
        if state.unavailable {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(state)
    }
}

fn invalidate_unused(
    state: &mut MemoryState,
    account_id: &str,
    reason: TokenInvalidation,
    now: OffsetDateTime,
) -> u64 {
    let mut count = 0;
    for token in state.tokens.values_mut() {
        if token.account_id == account_id && !token.used {
            token.invalidate(reason, now);
            count += 1;
        }
    }
    count
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let state = self.lock().await?;
        let email = email.to_lowercase();
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.to_lowercase() == email)
            .cloned())
    }

    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> StoreResult<()> {
        let mut state = self.lock().await?;
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl PasswordResetRepository for InMemoryStore {
    async fn issue_token(
        &self,
        token: &PasswordResetToken,
        now: OffsetDateTime,
    ) -> StoreResult<u64> {
        let mut state = self.lock().await?;
        if state.tokens.contains_key(&token.token_hash) {
            return Err(StoreError::Conflict("duplicate reset token hash".to_string()));
        }
        let superseded =
            invalidate_unused(&mut state, &token.account_id, TokenInvalidation::Superseded, now);
        state.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(superseded)
    }

    async fn find_token(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>> {
        let state = self.lock().await?;
        Ok(state.tokens.get(token_hash).cloned())
    }

    async fn redeem_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> StoreResult<RedeemOutcome> {
        let mut state = self.lock().await?;

        let account_id = match state.tokens.get(token_hash) {
            None => return Ok(RedeemOutcome::Rejected(RedeemRejection::NotFound)),
            Some(token) if token.used => {
                return Ok(RedeemOutcome::Rejected(RedeemRejection::AlreadyUsed))
            }
            Some(token) if token.is_expired(now) => {
                return Ok(RedeemOutcome::Rejected(RedeemRejection::Expired))
            }
            Some(token) => token.account_id.clone(),
        };

        match state.accounts.get_mut(&account_id) {
            Some(account) => account.password_hash = password_hash.to_string(),
            None => return Ok(RedeemOutcome::Rejected(RedeemRejection::AccountMissing)),
        }

        if let Some(token) = state.tokens.get_mut(token_hash) {
            token.invalidate(TokenInvalidation::Redeemed, now);
        }
        let siblings_invalidated =
            invalidate_unused(&mut state, &account_id, TokenInvalidation::SiblingRedeemed, now);

        Ok(RedeemOutcome::Redeemed {
            account_id,
            siblings_invalidated,
        })
    }

    async fn delete_sweepable(&self, now: OffsetDateTime, retention: Duration) -> StoreResult<u64> {
        let mut state = self.lock().await?;
        let retention = retention.max(Duration::ZERO);
        let before = state.tokens.len();
        state
            .tokens
            .retain(|_, token| !token.is_sweepable(now, retention));
        Ok((before - state.tokens.len()) as u64)
    }

    async fn list_account_tokens(&self, account_id: &str) -> StoreResult<Vec<PasswordResetToken>> {
        let state = self.lock().await?;
        let mut tokens: Vec<_> = state
            .tokens
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn token(hash: &str, account_id: &str, now: OffsetDateTime) -> PasswordResetToken {
        PasswordResetToken::new(
            account_id.to_string(),
            hash.to_string(),
            now,
            Duration::minutes(15),
        )
    }

    #[tokio::test]
    async fn test_issue_supersedes_previous_unused_token() {
        let store = InMemoryStore::new();
        let now = datetime!(2026-03-01 12:00 UTC);

        assert_eq!(store.issue_token(&token("h1", "a1", now), now).await.unwrap(), 0);
        assert_eq!(store.issue_token(&token("h2", "a1", now), now).await.unwrap(), 1);

        let first = store.find_token("h1").await.unwrap().unwrap();
        assert!(first.used);
        assert_eq!(first.invalidation, Some(TokenInvalidation::Superseded));
        assert!(!store.find_token("h2").await.unwrap().unwrap().used);
    }

    #[tokio::test]
    async fn test_issue_rejects_duplicate_hash() {
        let store = InMemoryStore::new();
        let now = datetime!(2026-03-01 12:00 UTC);
        store.issue_token(&token("h1", "a1", now), now).await.unwrap();

        let result = store.issue_token(&token("h1", "a2", now), now).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_redeem_missing_account_changes_nothing() {
        let store = InMemoryStore::new();
        let now = datetime!(2026-03-01 12:00 UTC);
        store.insert_token(token("h1", "ghost", now)).await;

        let outcome = store.redeem_token("h1", "new-hash", now).await.unwrap();
        assert_eq!(
            outcome,
            RedeemOutcome::Rejected(RedeemRejection::AccountMissing)
        );
        assert!(!store.find_token("h1").await.unwrap().unwrap().used);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true).await;
        assert!(store.find_token("h1").await.is_err());
        assert!(store.find_account_by_email("a@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_email_lookup_ignores_stored_case() {
        let store = InMemoryStore::new();
        let account = Account::new("Dana@Example.com".to_string(), "hash".to_string());
        store.insert_account(account.clone()).await;

        let found = store.find_account_by_email("dana@example.com").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(account.id));
    }

    #[tokio::test]
    async fn test_set_password_hash() {
        let store = InMemoryStore::new();
        let account = Account::new("erin@example.com".to_string(), "old".to_string());
        store.insert_account(account.clone()).await;

        store.set_password_hash(&account.id, "new").await.unwrap();
        assert_eq!(store.account(&account.id).await.unwrap().password_hash, "new");

        assert!(matches!(
            store.set_password_hash("missing", "new").await,
            Err(StoreError::Database(sqlx::Error::RowNotFound))
        ));
    }
}
