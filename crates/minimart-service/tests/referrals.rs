//! Referral channel-join bonus integration tests.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{StubVerifier, TestHarness};

#[tokio::test]
async fn channel_join_credits_referrer_once() {
    let harness = TestHarness::with_verifier(Some(Arc::new(StubVerifier(true))));
    harness.create_account().await;

    let referred = 555_020;
    harness
        .create_account_for(referred, Some(&harness.referral_code()))
        .await;

    let response = harness
        .server
        .post("/v1/referrals/verify-channel")
        .add_header(
            "x-telegram-init-data",
            harness.init_data_for(referred, None),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_member"], true);
    assert_eq!(body["bonus_granted"], true);

    // Referrer got the 25 balance bonus.
    let response = harness
        .server
        .get("/v1/wallet")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 525);

    // Claiming again is a conflict: the edge is spent.
    let response = harness
        .server
        .post("/v1/referrals/verify-channel")
        .add_header(
            "x-telegram-init-data",
            harness.init_data_for(referred, None),
        )
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn non_member_gets_no_bonus() {
    let harness = TestHarness::with_verifier(Some(Arc::new(StubVerifier(false))));
    harness.create_account().await;

    let referred = 555_021;
    harness
        .create_account_for(referred, Some(&harness.referral_code()))
        .await;

    let response = harness
        .server
        .post("/v1/referrals/verify-channel")
        .add_header(
            "x-telegram-init-data",
            harness.init_data_for(referred, None),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_member"], false);
    assert_eq!(body["bonus_granted"], false);

    // No credit moved.
    let response = harness
        .server
        .get("/v1/wallet")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 500);
}

#[tokio::test]
async fn unreferred_account_cannot_claim() {
    let harness = TestHarness::with_verifier(Some(Arc::new(StubVerifier(true))));
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/referrals/verify-channel")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn unconfigured_verifier_is_surfaced() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/referrals/verify-channel")
        .add_header("x-telegram-init-data", harness.init_data())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
}
