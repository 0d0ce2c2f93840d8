use crate::domain::errors::StoreResult;
use crate::models::Account;

/// Account store owned by the surrounding application
#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    /// Lookup by normalized (lowercase) email
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> StoreResult<()>;
}
