mod helpers;

use helpers::*;
use rentalhub_recovery::{
    domain::errors::ResetError, infrastructure::runtime::ManualTimeService,
};
use time::Duration;

#[tokio::test]
async fn test_token_valid_until_just_before_expiry() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    create_test_account(db, "expiry1@example.com").await;

    let clock = ManualTimeService::new(now());
    let service = test_service_with_clock(db, &clock);
    let token = request_token(&service, "expiry1@example.com").await;

    clock.advance(Duration::minutes(15) - Duration::seconds(1));
    assert!(service.verify_token(&token).await.is_ok());

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_token_invalid_at_expiry() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    create_test_account(db, "expiry2@example.com").await;

    let clock = ManualTimeService::new(now());
    let service = test_service_with_clock(db, &clock);
    let token = request_token(&service, "expiry2@example.com").await;

    clock.advance(Duration::minutes(15));
    assert_eq!(
        service.verify_token(&token).await,
        Err(ResetError::InvalidToken)
    );

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_expired_token_rejected_and_password_unchanged() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "expiry3@example.com").await;
    let original_hash = password_hash_of(db, &account.id).await;

    let clock = ManualTimeService::new(now());
    let service = test_service_with_clock(db, &clock);
    let token = request_token(&service, "expiry3@example.com").await;

    clock.advance(Duration::hours(2));

    let result = service.reset_password(&token, "NewPassword123!").await;
    assert_eq!(result, Err(ResetError::InvalidToken));
    assert_eq!(result.unwrap_err().to_string(), "Invalid or expired reset token");

    assert_eq!(password_hash_of(db, &account.id).await, original_hash);

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_expired_token_is_left_for_the_reaper() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "expiry4@example.com").await;

    let clock = ManualTimeService::new(now());
    let service = test_service_with_clock(db, &clock);
    let token = request_token(&service, "expiry4@example.com").await;

    clock.advance(Duration::hours(2));
    assert!(service.verify_token(&token).await.is_err());

    // Rejection does not delete or consume the row
    let tokens = account_tokens(db, &account.id).await;
    assert_eq!(tokens.len(), 1);
    assert!(!tokens[0].used);

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_new_request_after_expiry_issues_working_token() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "expiry5@example.com").await;

    let clock = ManualTimeService::new(now());
    let service = test_service_with_clock(db, &clock);
    let expired = request_token(&service, "expiry5@example.com").await;

    clock.advance(Duration::minutes(20));
    let fresh = request_token(&service, "expiry5@example.com").await;

    assert!(service.verify_token(&expired).await.is_err());
    service
        .reset_password(&fresh, "NewPassword123!")
        .await
        .unwrap();

    let tokens = account_tokens(db, &account.id).await;
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| t.used));

    teardown_test_db(test_db).await;
}
