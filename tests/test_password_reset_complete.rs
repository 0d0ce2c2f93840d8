mod helpers;

use helpers::*;
use rentalhub_recovery::{
    domain::errors::ResetError,
    infrastructure::runtime::ManualTimeService,
    models::RESET_REQUEST_MESSAGE,
    services::verify_password,
};
use time::Duration;

#[tokio::test]
async fn test_complete_password_reset_flow() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "user@example.com").await;

    let start = now();
    let clock = ManualTimeService::new(start);
    let service = test_service_with_clock(db, &clock);

    // Request reset
    let issuance = service.request_reset("user@example.com").await.unwrap();
    assert!(issuance.is_issued());
    let reset = issuance.reset.unwrap();
    assert_eq!(reset.expires_at, start + Duration::minutes(15));
    let token = reset.token.expose().to_string();

    // Reset password
    service.reset_password(&token, "Str0ngP@ss!").await.unwrap();

    let hash = password_hash_of(db, &account.id).await;
    assert!(verify_password("Str0ngP@ss!", &hash).unwrap());

    // Token is spent, whatever the new password looks like
    assert_eq!(
        service.reset_password(&token, "Other1!").await,
        Err(ResetError::InvalidToken)
    );

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_complete_flow_for_unknown_account() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    create_test_account(db, "user@example.com").await;
    let service = test_service(db);

    let issuance = service.request_reset("nobody@example.com").await.unwrap();

    assert!(issuance.reset.is_none());
    assert_eq!(issuance.message(), RESET_REQUEST_MESSAGE);
    assert_eq!(
        issuance.message(),
        service.request_reset("user@example.com").await.unwrap().message()
    );

    teardown_test_db(test_db).await;
}
