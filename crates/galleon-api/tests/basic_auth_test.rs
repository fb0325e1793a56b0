//! Forgotten-password and password-change API tests.
//!
//! Run with: `cargo test -p galleon-api --test basic_auth_test`

mod helpers;

use galleon_plugins::basic_auth::{bcrypt_check_password, FP_TOKEN_NAMESPACE};
use galleon_core::TimedSigner;
use helpers::{setup_test_app, setup_test_app_counting_fake_logins, token_from_email, BASE_URL};
use std::sync::atomic::Ordering;
use serde_json::json;

const FORGOT: &str = "/auth/forgot_password/";
const VERIFY: &str = "/auth/forgot_password/verify/";
const EDIT_PASS: &str = "/edit/password/";

#[tokio::test]
async fn test_forgot_password_sends_reset_email() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);

    let response = app
        .client()
        .post(FORGOT)
        .json(&json!({ "username": "chris" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let sent = app.sent_mail();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![user.email.clone()]);
    assert_eq!(sent[0].subject, "Galleon - Change forgotten password!");
    assert!(sent[0]
        .body
        .contains(&format!("{}{}?token=", BASE_URL, VERIFY)));
    assert!(sent[0].body.contains("chris"));
}

#[tokio::test]
async fn test_forgot_password_accepts_email_address() {
    let app = setup_test_app().await;
    app.add_user("chris", "old-password", true);

    let response = app
        .client()
        .post(FORGOT)
        .json(&json!({ "username": "chris@example.org" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(app.sent_mail().len(), 1);
}

#[tokio::test]
async fn test_forgot_password_is_neutral_for_unknown_and_unverified() {
    let app = setup_test_app().await;
    app.add_user("pending", "old-password", false);

    let known = app
        .client()
        .post(FORGOT)
        .json(&json!({ "username": "pending" }))
        .await;
    let unknown = app
        .client()
        .post(FORGOT)
        .json(&json!({ "username": "nobody" }))
        .await;

    assert_eq!(known.status_code(), 200);
    assert_eq!(unknown.status_code(), 200);
    let known: serde_json::Value = known.json();
    let unknown: serde_json::Value = unknown.json();
    assert_eq!(known, unknown);
    assert!(app.sent_mail().is_empty());
}

#[tokio::test]
async fn test_forgot_password_rejects_malformed_body() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(FORGOT)
        .json(&json!({ "login": "chris" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_verify_token_returns_username() {
    let app = setup_test_app().await;
    app.add_user("chris", "old-password", true);
    app.client()
        .post(FORGOT)
        .json(&json!({ "username": "chris" }))
        .await;
    let token = token_from_email(&app.sent_mail()[0]);

    let response = app
        .client()
        .get(VERIFY)
        .add_query_param("token", &token)
        .await;
    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["username"], "chris");
}

#[tokio::test]
async fn test_verify_rejects_bad_and_missing_tokens() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(VERIFY)
        .add_query_param("token", "not.a.token")
        .await;
    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_TOKEN");

    let response = app.client().get(VERIFY).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_verify_rejects_token_from_other_namespace() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);

    let secret = galleon_core::load_or_create_key(&app.state.config.crypto_path).unwrap();
    let good = TimedSigner::new(&secret, FP_TOKEN_NAMESPACE).dumps(&user.id).unwrap();
    let other = TimedSigner::new(&secret, "session").dumps(&user.id).unwrap();

    let response = app.client().get(VERIFY).add_query_param("token", &good).await;
    assert_eq!(response.status_code(), 200);
    let response = app.client().get(VERIFY).add_query_param("token", &other).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_reset_password_with_token() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);
    app.client()
        .post(FORGOT)
        .json(&json!({ "username": "chris" }))
        .await;
    let token = token_from_email(&app.sent_mail()[0]);

    let response = app
        .client()
        .post(VERIFY)
        .json(&json!({ "token": token, "password": "brand-new-password" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let stored = app.users.user(user.id).unwrap().pw_hash.unwrap();
    assert!(bcrypt_check_password("brand-new-password", &stored, None).unwrap());
    assert!(!bcrypt_check_password("old-password", &stored, None).unwrap());
}

#[tokio::test]
async fn test_reset_password_rejects_short_password() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);
    let secret = galleon_core::load_or_create_key(&app.state.config.crypto_path).unwrap();
    let token = TimedSigner::new(&secret, FP_TOKEN_NAMESPACE).dumps(&user.id).unwrap();

    let response = app
        .client()
        .post(VERIFY)
        .json(&json!({ "token": token, "password": "abc" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let stored = app.users.user(user.id).unwrap().pw_hash.unwrap();
    assert!(bcrypt_check_password("old-password", &stored, None).unwrap());
}

#[tokio::test]
async fn test_change_password() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);

    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "chris",
            "old_password": "old-password",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let stored = app.users.user(user.id).unwrap().pw_hash.unwrap();
    assert!(bcrypt_check_password("new-password", &stored, None).unwrap());
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let app = setup_test_app().await;
    let user = app.add_user("chris", "old-password", true);

    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "chris",
            "old_password": "not-it",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 401);

    let stored = app.users.user(user.id).unwrap().pw_hash.unwrap();
    assert!(bcrypt_check_password("old-password", &stored, None).unwrap());
}

#[tokio::test]
async fn test_change_password_unknown_user() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "nobody",
            "old_password": "whatever",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_change_password_without_stored_hash_costs_a_login_attempt() {
    let (app, fake_logins) = setup_test_app_counting_fake_logins().await;
    let user = app.users.insert_user("nohash", "nohash@example.org", None);
    app.add_user("chris", "old-password", true);

    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "nohash",
            "old_password": "whatever",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(fake_logins.load(Ordering::SeqCst), 1);
    assert!(app.users.user(user.id).unwrap().pw_hash.is_none());

    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "chris",
            "old_password": "not-it",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(fake_logins.load(Ordering::SeqCst), 1);

    let response = app
        .client()
        .post(EDIT_PASS)
        .json(&json!({
            "username": "nobody",
            "old_password": "whatever",
            "new_password": "new-password"
        }))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(fake_logins.load(Ordering::SeqCst), 2);
}
