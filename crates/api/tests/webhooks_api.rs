//! HTTP-level integration tests for the payment and identity webhooks.
//!
//! Transport failures (signature problems, missing secret) are HTTP
//! errors; business rejections acknowledge with 200 and leave the ledger
//! untouched.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use sqlx::PgPool;

use common::{
    build_app_with_config, build_webhook_app, expect_status, paid_balance, post_signed,
    post_unsigned, seed_user, test_config, InMemoryMarker, ScriptedJobs, StaticAdmission,
    IDENTITY_SECRET, PAYMENT_SECRET,
};
use photolift_core::admission::AdmissionDecision;

const PAYMENTS_URI: &str = "/api/v1/webhooks/payments";
const IDENTITY_URI: &str = "/api/v1/webhooks/identity";

/// A well-formed checkout event for the starter package (999 minor units).
fn checkout_event(payment_id: &str, user: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "checkout.session.completed",
        "data": {
            "id": payment_id,
            "amount_subtotal": 999,
            "amount_total": 999,
            "amount_discount": 0,
            "currency": "usd",
            "metadata": {
                "user_id": user,
                "package_id": "starter",
                "credits": "10",
                "price_id": "price_starter_10",
            },
        },
    })
}

async fn purchase_count(pool: &PgPool, payment_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE external_payment_id = $1")
        .bind(payment_id)
        .fetch_one(pool)
        .await
        .expect("count purchases")
}

// ---------------------------------------------------------------------------
// Payment webhook: transport layer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_without_signature_header_returns_400(pool: PgPool) {
    let app = build_webhook_app(pool);
    let response = post_unsigned(app, PAYMENTS_URI, None, &checkout_event("pay_1", "u")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_with_bad_signature_returns_400(pool: PgPool) {
    let app = build_webhook_app(pool);
    let response = post_unsigned(
        app,
        PAYMENTS_URI,
        Some("deadbeef"),
        &checkout_event("pay_1", "u"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_payment_secret_is_a_500(pool: PgPool) {
    let mut config = test_config();
    config.payment_webhook_secret = None;
    let app = build_app_with_config(
        pool,
        config,
        Arc::new(ScriptedJobs::succeeding("https://out/x.png")),
        Arc::new(StaticAdmission(AdmissionDecision::Allowed)),
        Arc::new(InMemoryMarker::default()),
    );

    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &checkout_event("pay_1", "u"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Payment webhook: reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn valid_payment_credits_the_ledger_once(pool: PgPool) {
    seed_user(&pool, "user_buyer", 0).await;

    let event = checkout_event("pay_once", "user_buyer");
    for _ in 0..3 {
        let app = build_webhook_app(pool.clone());
        let response = post_signed(
            app,
            PAYMENTS_URI,
            "x-payment-signature",
            PAYMENT_SECRET,
            &event,
        )
        .await;
        let body = expect_status(response, StatusCode::OK).await;
        assert_eq!(body["received"], true);
    }

    // Replaying three times produced exactly one purchase and one increment.
    assert_eq!(paid_balance(&pool, "user_buyer").await, 10);
    assert_eq!(purchase_count(&pool, "pay_once").await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn discounted_payment_is_accepted(pool: PgPool) {
    seed_user(&pool, "user_coupon", 0).await;

    // 799 charged + 200 coupon = 999 configured price.
    let mut event = checkout_event("pay_coupon", "user_coupon");
    event["data"]["amount_subtotal"] = serde_json::json!(899);
    event["data"]["amount_total"] = serde_json::json!(799);
    event["data"]["amount_discount"] = serde_json::json!(200);

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(paid_balance(&pool, "user_coupon").await, 10);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_amount_is_acknowledged_without_credit(pool: PgPool) {
    seed_user(&pool, "user_cheap", 0).await;

    let mut event = checkout_event("pay_cheap", "user_cheap");
    event["data"]["amount_subtotal"] = serde_json::json!(500);
    event["data"]["amount_total"] = serde_json::json!(500);

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(paid_balance(&pool, "user_cheap").await, 0);
    assert_eq!(purchase_count(&pool, "pay_cheap").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_currency_is_acknowledged_without_credit(pool: PgPool) {
    seed_user(&pool, "user_eur", 0).await;

    let mut event = checkout_event("pay_eur", "user_eur");
    event["data"]["currency"] = serde_json::json!("eur");

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(paid_balance(&pool, "user_eur").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_package_is_acknowledged_without_credit(pool: PgPool) {
    seed_user(&pool, "user_fake_pkg", 0).await;

    let mut event = checkout_event("pay_fake_pkg", "user_fake_pkg");
    event["data"]["metadata"]["package_id"] = serde_json::json!("mega");

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(paid_balance(&pool, "user_fake_pkg").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn incomplete_metadata_is_acknowledged_without_credit(pool: PgPool) {
    seed_user(&pool, "user_incomplete", 0).await;

    let mut event = checkout_event("pay_incomplete", "user_incomplete");
    event["data"]["metadata"]
        .as_object_mut()
        .unwrap()
        .remove("price_id");

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(paid_balance(&pool, "user_incomplete").await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unhandled_event_type_is_acknowledged(pool: PgPool) {
    let app = build_webhook_app(pool);
    let event = serde_json::json!({
        "type": "invoice.paid",
        "data": { "id": "pay_other" },
    });
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &event,
    )
    .await;
    expect_status(response, StatusCode::OK).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_for_unknown_user_is_acknowledged_without_credit(pool: PgPool) {
    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        PAYMENTS_URI,
        "x-payment-signature",
        PAYMENT_SECRET,
        &checkout_event("pay_ghost", "user_nobody"),
    )
    .await;

    expect_status(response, StatusCode::OK).await;
    assert_eq!(purchase_count(&pool, "pay_ghost").await, 0);
}

// ---------------------------------------------------------------------------
// Identity webhook
// ---------------------------------------------------------------------------

fn identity_event(event_type: &str, auth_id: &str, email: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": event_type,
        "data": {
            "id": auth_id,
            "email": email,
        },
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn identity_create_is_idempotent(pool: PgPool) {
    for _ in 0..2 {
        let app = build_webhook_app(pool.clone());
        let response = post_signed(
            app,
            IDENTITY_URI,
            "x-identity-signature",
            IDENTITY_SECRET,
            &identity_event("user.created", "user_new", Some("new@example.com")),
        )
        .await;
        expect_status(response, StatusCode::OK).await;
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE auth_id = 'user_new'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn identity_update_changes_email(pool: PgPool) {
    seed_user(&pool, "user_upd", 0).await;

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        IDENTITY_URI,
        "x-identity-signature",
        IDENTITY_SECRET,
        &identity_event("user.updated", "user_upd", Some("updated@example.com")),
    )
    .await;
    expect_status(response, StatusCode::OK).await;

    let email: Option<String> =
        sqlx::query_scalar("SELECT email FROM users WHERE auth_id = 'user_upd'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(email.as_deref(), Some("updated@example.com"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn identity_update_for_unknown_user_returns_500(pool: PgPool) {
    let app = build_webhook_app(pool);
    let response = post_signed(
        app,
        IDENTITY_URI,
        "x-identity-signature",
        IDENTITY_SECRET,
        &identity_event("user.updated", "user_missing", Some("x@example.com")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn identity_delete_removes_user(pool: PgPool) {
    seed_user(&pool, "user_del", 5).await;

    let app = build_webhook_app(pool.clone());
    let response = post_signed(
        app,
        IDENTITY_URI,
        "x-identity-signature",
        IDENTITY_SECRET,
        &identity_event("user.deleted", "user_del", None),
    )
    .await;
    expect_status(response, StatusCode::OK).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE auth_id = 'user_del'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn identity_with_bad_signature_returns_400(pool: PgPool) {
    let app = build_webhook_app(pool);
    let body = serde_json::to_vec(&identity_event("user.created", "user_x", None)).unwrap();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri(IDENTITY_URI)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .header("x-identity-signature", "deadbeef")
        .body(axum::body::Body::from(body))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
