use rentalhub_recovery::{
    database::Database,
    domain::ports::password_reset_repository::PasswordResetRepository,
    infrastructure::runtime::ManualTimeService,
    models::{Account, PasswordResetToken},
    services::{
        hash_password, normalize_email, PasswordResetService, ResetSettings, ResetTokenHasher,
    },
};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

pub const TEST_PEPPER: &[u8] = b"integration-test-pepper-0123456789abcdef";
pub const ORIGINAL_PASSWORD: &str = "OriginalPass123!";

pub fn test_hasher() -> ResetTokenHasher {
    ResetTokenHasher::new(TEST_PEPPER).expect("Failed to build token hasher")
}

/// Default settings without the timing floor so tests stay fast
pub fn fast_settings() -> ResetSettings {
    ResetSettings {
        min_request_duration: Duration::ZERO,
        ..ResetSettings::default()
    }
}

pub fn test_service(db: &Database) -> PasswordResetService {
    PasswordResetService::new(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        test_hasher(),
        fast_settings(),
    )
}

pub fn test_service_with_clock(db: &Database, clock: &ManualTimeService) -> PasswordResetService {
    test_service(db).with_clock(Arc::new(clock.clone()))
}

pub async fn create_test_account(db: &Database, email: &str) -> Account {
    let email = normalize_email(email).expect("Invalid test email");
    let password_hash = hash_password(ORIGINAL_PASSWORD).expect("Failed to hash password");
    let account = Account::new(email, password_hash);

    db.create_account(&account)
        .await
        .expect("Failed to create test account");

    account
}

/// Issue a token through the service and return the raw value
pub async fn request_token(service: &PasswordResetService, email: &str) -> String {
    let issuance = service
        .request_reset(email)
        .await
        .expect("request_reset failed");

    issuance
        .reset
        .expect("Expected a token to be issued")
        .token
        .expose()
        .to_string()
}

pub async fn account_tokens(db: &Database, account_id: &str) -> Vec<PasswordResetToken> {
    db.list_account_tokens(account_id)
        .await
        .expect("Failed to list tokens")
}

pub async fn password_hash_of(db: &Database, account_id: &str) -> String {
    db.get_account_by_id(account_id)
        .await
        .expect("Failed to load account")
        .expect("Account missing")
        .password_hash
}

pub fn now() -> OffsetDateTime {
    // Whole seconds, matching what the store keeps
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}
