mod helpers;

use helpers::*;
use rentalhub_recovery::{
    domain::{
        errors::StoreError,
        ports::{
            account_repository::AccountRepository,
            password_reset_repository::PasswordResetRepository,
        },
    },
    models::{Account, PasswordResetToken, TokenInvalidation},
    services::{generate_reset_token, hash_password},
};
use time::Duration;

#[tokio::test]
async fn test_fresh_token_reads_back_with_empty_columns() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "store1@example.com").await;
    let issued_at = now();

    let token = PasswordResetToken::new(
        account.id.clone(),
        test_hasher().hash(generate_reset_token().expose()),
        issued_at,
        Duration::minutes(15),
    );
    db.issue_token(&token, issued_at).await.unwrap();

    let stored = db.find_token(&token.token_hash).await.unwrap().unwrap();
    assert_eq!(stored, token);
    assert!(stored.used_at.is_none());
    assert!(stored.invalidation.is_none());

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_redeemed_token_reads_back_with_filled_columns() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "store2@example.com").await;
    let issued_at = now();

    let token = PasswordResetToken::new(
        account.id.clone(),
        test_hasher().hash(generate_reset_token().expose()),
        issued_at,
        Duration::minutes(15),
    );
    db.issue_token(&token, issued_at).await.unwrap();

    let redeemed_at = issued_at + Duration::minutes(1);
    db.redeem_token(&token.token_hash, "new-hash", redeemed_at)
        .await
        .unwrap();

    let stored = db.find_token(&token.token_hash).await.unwrap().unwrap();
    assert!(stored.used);
    assert_eq!(stored.used_at, Some(redeemed_at));
    assert_eq!(stored.invalidation, Some(TokenInvalidation::Redeemed));

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_mixed_case_stored_email_can_reset() {
    let test_db = setup_test_db().await;
    let db = test_db.db();

    // The owning application stored the address as typed
    let account = Account::new(
        "Dana@Example.com".to_string(),
        hash_password(ORIGINAL_PASSWORD).unwrap(),
    );
    db.create_account(&account).await.unwrap();

    let found = db.find_account_by_email("dana@example.com").await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(account.id.clone()));

    let service = test_service(db);
    for typed in ["Dana@Example.com", "dana@example.com", "DANA@EXAMPLE.COM"] {
        let issuance = service.request_reset(typed).await.unwrap();
        let reset = issuance.reset.expect("token should be issued");
        assert_eq!(reset.account_id, account.id);
        assert_eq!(reset.email, "Dana@Example.com");
    }

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_set_password_hash_updates_account() {
    let test_db = setup_test_db().await;
    let db = test_db.db();
    let account = create_test_account(db, "store3@example.com").await;

    db.set_password_hash(&account.id, "replacement-hash")
        .await
        .unwrap();

    assert_eq!(password_hash_of(db, &account.id).await, "replacement-hash");

    teardown_test_db(test_db).await;
}

#[tokio::test]
async fn test_set_password_hash_unknown_account() {
    let test_db = setup_test_db().await;
    let db = test_db.db();

    let result = db.set_password_hash("no-such-account", "hash").await;
    assert!(matches!(
        result,
        Err(StoreError::Database(sqlx::Error::RowNotFound))
    ));

    teardown_test_db(test_db).await;
}
