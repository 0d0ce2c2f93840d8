use async_trait::async_trait;
use sqlx::{any::AnyRow, Any, Executor, Row};

use crate::database::{from_unix, to_unix, Database};
use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::ports::account_repository::AccountRepository;
use crate::models::Account;

fn account_from_row(row: &AnyRow) -> StoreResult<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: from_unix(row.try_get("created_at")?, "created_at")?,
    })
}

/// Shared by the standalone update and the redemption transaction
pub(crate) async fn update_password_hash<'e, E>(
    executor: E,
    account_id: &str,
    password_hash: &str,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query(
        "UPDATE accounts
         SET password_hash = ?
         WHERE id = ?",
    )
    .bind(password_hash)
    .bind(account_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

impl Database {
    pub async fn create_account(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(to_unix(account.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_account_by_id(&self, account_id: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at
             FROM accounts
             WHERE id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }
}

#[async_trait]
impl AccountRepository for Database {
    /// Case-insensitive: the owning application may store mixed-case addresses
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at
             FROM accounts
             WHERE LOWER(email) = LOWER(?)
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> StoreResult<()> {
        match update_password_hash(&self.pool, account_id, password_hash).await? {
            0 => Err(StoreError::Database(sqlx::Error::RowNotFound)),
            _ => Ok(()),
        }
    }
}
