use async_trait::async_trait;
use sqlx::{any::AnyRow, Row};
use time::{Duration, OffsetDateTime};

use crate::database::accounts::update_password_hash;
use crate::database::{from_unix, to_unix, Database};
use crate::domain::errors::{is_unique_violation, StoreError, StoreResult};
use crate::domain::ports::password_reset_repository::{
    PasswordResetRepository, RedeemOutcome, RedeemRejection,
};
use crate::models::{PasswordResetToken, TokenInvalidation};

fn token_from_row(row: &AnyRow) -> StoreResult<PasswordResetToken> {
    // Nullable columns: the Any driver reports NULL as its own type, so a
    // failed decode means the column is empty
    let invalidation = match row
        .try_get::<Option<String>, _>("invalidation")
        .ok()
        .flatten()
    {
        Some(raw) => Some(
            TokenInvalidation::parse(&raw)
                .ok_or_else(|| StoreError::Corrupt(format!("invalidation: {}", raw)))?,
        ),
        None => None,
    };
    let used_at = row
        .try_get::<Option<i64>, _>("used_at")
        .ok()
        .flatten()
        .map(|value| from_unix(value, "used_at"))
        .transpose()?;

    Ok(PasswordResetToken {
        token_hash: row.try_get("token_hash")?,
        account_id: row.try_get("account_id")?,
        created_at: from_unix(row.try_get("created_at")?, "created_at")?,
        expires_at: from_unix(row.try_get("expires_at")?, "expires_at")?,
        used: row.try_get::<i64, _>("used")? != 0,
        used_at,
        invalidation,
    })
}

#[async_trait]
impl PasswordResetRepository for Database {
    async fn issue_token(
        &self,
        token: &PasswordResetToken,
        now: OffsetDateTime,
    ) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        // Write first so SQLite takes the write lock before anything is read
        let superseded = sqlx::query(
            "UPDATE password_reset_tokens
             SET used = 1, used_at = ?, invalidation = ?
             WHERE account_id = ? AND used = 0",
        )
        .bind(to_unix(now))
        .bind(TokenInvalidation::Superseded.as_str())
        .bind(&token.account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let inserted = sqlx::query(
            "INSERT INTO password_reset_tokens
                (token_hash, account_id, created_at, expires_at, used, used_at, invalidation)
             VALUES (?, ?, ?, ?, 0, NULL, NULL)",
        )
        .bind(&token.token_hash)
        .bind(&token.account_id)
        .bind(to_unix(token.created_at))
        .bind(to_unix(token.expires_at))
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            tx.rollback().await?;
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict(format!(
                    "unused reset token already present for account {}",
                    token.account_id
                )));
            }
            return Err(err.into());
        }

        tx.commit().await?;

        Ok(superseded)
    }

    async fn find_token(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>> {
        let row = sqlx::query(
            "SELECT token_hash, account_id, created_at, expires_at, used, used_at, invalidation
             FROM password_reset_tokens
             WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(token_from_row).transpose()
    }

    /// Redeem in one transaction:
    /// 1. Claim the token (conditional on unused and unexpired)
    /// 2. Update the account password hash
    /// 3. Invalidate sibling tokens
    ///
    /// If any step fails the transaction is rolled back
    async fn redeem_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> StoreResult<RedeemOutcome> {
        let now_unix = to_unix(now);
        let mut tx = self.pool.begin().await?;

        // 1. First writer wins; a concurrent claim sees zero rows here
        let claimed = sqlx::query(
            "UPDATE password_reset_tokens
             SET used = 1, used_at = ?, invalidation = ?
             WHERE token_hash = ? AND used = 0 AND expires_at > ?",
        )
        .bind(now_unix)
        .bind(TokenInvalidation::Redeemed.as_str())
        .bind(token_hash)
        .bind(now_unix)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            let rejection = match self.find_token(token_hash).await? {
                None => RedeemRejection::NotFound,
                Some(token) if token.used => RedeemRejection::AlreadyUsed,
                Some(_) => RedeemRejection::Expired,
            };
            return Ok(RedeemOutcome::Rejected(rejection));
        }

        let account_id: String = sqlx::query(
            "SELECT account_id FROM password_reset_tokens WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_one(&mut *tx)
        .await?
        .try_get("account_id")?;

        // 2. Update password
        if update_password_hash(&mut *tx, &account_id, password_hash).await? == 0 {
            tx.rollback().await?;
            return Ok(RedeemOutcome::Rejected(RedeemRejection::AccountMissing));
        }

        // 3. Invalidate every other unused token for the account
        let siblings_invalidated = sqlx::query(
            "UPDATE password_reset_tokens
             SET used = 1, used_at = ?, invalidation = ?
             WHERE account_id = ? AND used = 0",
        )
        .bind(now_unix)
        .bind(TokenInvalidation::SiblingRedeemed.as_str())
        .bind(&account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Commit transaction - if this fails, all changes are rolled back
        tx.commit().await?;

        Ok(RedeemOutcome::Redeemed {
            account_id,
            siblings_invalidated,
        })
    }

    async fn delete_sweepable(&self, now: OffsetDateTime, retention: Duration) -> StoreResult<u64> {
        let cutoff = now - retention.max(Duration::ZERO);

        let result = sqlx::query(
            "DELETE FROM password_reset_tokens
             WHERE used = 1 OR expires_at <= ?",
        )
        .bind(to_unix(cutoff))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_account_tokens(&self, account_id: &str) -> StoreResult<Vec<PasswordResetToken>> {
        let rows = sqlx::query(
            "SELECT token_hash, account_id, created_at, expires_at, used, used_at, invalidation
             FROM password_reset_tokens
             WHERE account_id = ?
             ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(token_from_row).collect()
    }
}
