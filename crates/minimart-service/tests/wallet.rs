//! Wallet, conversion, ad reward, and redeem code integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

// ============================================================================
// Wallet & conversion
// ============================================================================

#[tokio::test]
async fn wallet_reflects_starter_grants() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .get("/v1/wallet")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 500);
    assert_eq!(body["coins"], 100);
    assert_eq!(body["convert_rate"], 10);
}

#[tokio::test]
async fn conversion_conserves_value() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Watch one 5-coin ad first: the worked scenario from the storefront.
    harness
        .server
        .post("/v1/ads/watch")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "network": "adsgram" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/wallet/convert")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "amount": 100 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credited"], 10);
    assert_eq!(body["coins"], 5);
    assert_eq!(body["balance"], 510);
}

#[tokio::test]
async fn conversion_rejects_misaligned_amount() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/wallet/convert")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "amount": 15 }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn conversion_rejects_overdraw_without_mutation() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/wallet/convert")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "amount": 110 }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);

    let response = harness
        .server
        .get("/v1/wallet")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["coins"], 100);
    assert_eq!(body["balance"], 500);
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn transactions_record_economy_events() {
    let harness = TestHarness::new();
    harness.create_account().await;

    harness
        .server
        .post("/v1/ads/watch")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "network": "adsgram" }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/wallet/convert")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "amount": 100 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/wallet/transactions")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    // Newest first: the conversion, then the ad reward.
    assert_eq!(transactions[0]["kind"], "deposit");
    assert_eq!(transactions[1]["kind"], "ad_reward");
    assert_eq!(transactions[1]["amount"], 5);
    assert_eq!(body["has_more"], false);
}

// ============================================================================
// Ad rewards
// ============================================================================

#[tokio::test]
async fn ad_watch_credits_and_caps() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Default config: two networks, cap 5 each, global cap 10, 5 coins per watch.
    for i in 1..=5 {
        let response = harness
            .server
            .post("/v1/ads/watch")
            .add_header("x-telegram-init-data", harness.init_data())
            .json(&json!({ "network": "adsgram" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["watched_today"], i);
        assert_eq!(body["coins_earned"], 5);
    }

    // Network cap hit.
    let response = harness
        .server
        .post("/v1/ads/watch")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "network": "adsgram" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    // The other network still works up to the global cap.
    for _ in 0..5 {
        harness
            .server
            .post("/v1/ads/watch")
            .add_header("x-telegram-init-data", harness.init_data())
            .json(&json!({ "network": "monetag" }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .post("/v1/ads/watch")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "network": "monetag" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    // 10 watches x 5 coins on top of the 100 starter coins.
    let response = harness
        .server
        .get("/v1/wallet")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["coins"], 150);
}

#[tokio::test]
async fn unknown_network_is_bad_request() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/ads/watch")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "network": "mystery" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn daily_bonus_requires_cap_and_claims_once() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Bonus before the cap: conflict.
    let response = harness
        .server
        .post("/v1/ads/bonus")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // Reach the global cap (5 + 5).
    for network in ["adsgram", "monetag"] {
        for _ in 0..5 {
            harness
                .server
                .post("/v1/ads/watch")
                .add_header("x-telegram-init-data", harness.init_data())
                .json(&json!({ "network": network }))
                .await
                .assert_status_ok();
        }
    }

    let response = harness
        .server
        .post("/v1/ads/bonus")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["coins_earned"], 20);
    assert_eq!(body["coins"], 170);

    // Second claim: conflict.
    let response = harness
        .server
        .post("/v1/ads/bonus")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

// ============================================================================
// Redeem codes
// ============================================================================

async fn create_code(harness: &TestHarness, code: &str, reward_type: &str, amount: i64, max_uses: u32) {
    harness
        .server
        .post("/v1/admin/redeem-codes")
        .add_header("x-admin-key", harness.admin_key.clone())
        .json(&json!({
            "code": code,
            "reward_type": reward_type,
            "amount": amount,
            "max_uses": max_uses
        }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn redeem_code_is_single_use_per_account() {
    let harness = TestHarness::new();
    harness.create_account().await;
    create_code(&harness, "WELCOME50", "coins", 50, 10).await;

    // Case-insensitive on entry.
    let response = harness
        .server
        .post("/v1/redeem")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "code": "welcome50" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["reward_type"], "coins");
    assert_eq!(body["coins"], 150);

    let response = harness
        .server
        .post("/v1/redeem")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "code": "WELCOME50" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn redeem_respects_max_uses_across_accounts() {
    let harness = TestHarness::new();
    harness.create_account().await;
    harness.create_account_for(555_003, None).await;
    create_code(&harness, "ONCE", "balance", 25, 1).await;

    harness
        .server
        .post("/v1/redeem")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "code": "ONCE" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/redeem")
        .add_header(
            "x-telegram-init-data",
            harness.init_data_for(555_003, None),
        )
        .json(&json!({ "code": "ONCE" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // Back office sees one use.
    let response = harness
        .server
        .get("/v1/admin/redeem-codes")
        .add_header("x-admin-key", harness.admin_key.clone())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body[0]["current_uses"], 1);
}

#[tokio::test]
async fn unknown_or_deactivated_code_is_invalid() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/redeem")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "code": "NOPE" }))
        .await;
    response.assert_status_bad_request();

    create_code(&harness, "SOON-OFF", "coins", 10, 10).await;
    harness
        .server
        .post("/v1/admin/redeem-codes/SOON-OFF/deactivate")
        .add_header("x-admin-key", harness.admin_key.clone())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/redeem")
        .add_header("x-telegram-init-data", harness.init_data())
        .json(&json!({ "code": "SOON-OFF" }))
        .await;
    response.assert_status_bad_request();
}
