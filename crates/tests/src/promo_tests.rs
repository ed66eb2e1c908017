use crate::fixtures::seed::batch_body;
use crate::fixtures::test_app::TestApp;
use chrono::Duration;
use promokit_db::models::Benefit;

#[tokio::test]
async fn three_code_batch_enforces_global_and_per_user_caps() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(3, 2, 1)).await;
    assert_eq!(codes.len(), 3);
    let code = &codes[0];

    let a = app.create_user("a").await;
    let b = app.create_user("b").await;
    let c = app.create_user("c").await;

    let (status, json) = app.redeem(&a.access_token, code).await;
    assert_eq!(status, 200, "{json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["current_uses"], 1);
    assert_eq!(json["benefit"]["plan_id"], "premium");

    let (status, json) = app.redeem(&a.access_token, code).await;
    assert_eq!(status, 409);
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "ALREADY_REDEEMED");

    let (status, json) = app.redeem(&b.access_token, code).await;
    assert_eq!(status, 200);
    assert_eq!(json["current_uses"], 2);

    let (status, json) = app.redeem(&c.access_token, code).await;
    assert_eq!(status, 409);
    assert_eq!(json["error_code"], "USAGE_LIMIT_REACHED");

    assert_eq!(app.store().code(code).unwrap().current_uses, 2);
}

#[tokio::test]
async fn validate_returns_code_details_without_consuming_it() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let user = app.create_user("alice").await;

    let (status, json) = app.validate(&user.access_token, &codes[0].to_lowercase()).await;
    assert_eq!(status, 200, "{json}");
    assert_eq!(json["valid"], true);
    assert_eq!(json["promotion_code"]["code"], codes[0].as_str());
    assert_eq!(json["promotion_code"]["remaining_uses"], 5);
    assert_eq!(json["promotion_code"]["benefit"]["duration_days"], 30);
    assert!(json.get("error_code").is_none());

    assert_eq!(app.store().code(&codes[0]).unwrap().current_uses, 0);
}

#[tokio::test]
async fn redeemed_benefit_expires_thirty_days_after_redemption() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let user = app.create_user("alice").await;

    let (status, json) = app.redeem(&user.access_token, &codes[0]).await;
    assert_eq!(status, 200);
    assert_eq!(json["benefit"]["is_permanent"], false);
    assert_eq!(json["benefit"]["expires_at"], "2026-03-31T12:00:00Z");

    let account = app.store().user(user.id).unwrap();
    let subscription = account.subscription.unwrap();
    assert_eq!(subscription.source_code, codes[0]);
    assert_eq!(account.redemptions[0].code, codes[0]);
}

#[tokio::test]
async fn permanent_benefit_has_no_expiry() {
    let app = TestApp::spawn().await;
    let mut body = batch_body(1, 5, 1);
    body["benefit"] = serde_json::json!({
        "type": "subscription_upgrade",
        "plan_id": "lifetime",
        "is_permanent": true,
    });
    let codes = app.generate_codes(body).await;
    let user = app.create_user("alice").await;

    let (status, json) = app.redeem(&user.access_token, &codes[0]).await;
    assert_eq!(status, 200);
    assert_eq!(json["benefit"]["is_permanent"], true);
    assert!(json["benefit"]["expires_at"].is_null());

    let stored = app.store().code(&codes[0]).unwrap();
    assert!(matches!(
        stored.benefit,
        Benefit::SubscriptionUpgrade { is_permanent: true, .. }
    ));
}

#[tokio::test]
async fn malformed_code_is_bad_request() {
    let app = TestApp::spawn().await;
    let user = app.create_user("alice").await;

    let (status, json) = app.validate(&user.access_token, "ABC-123").await;
    assert_eq!(status, 400);
    assert_eq!(json["valid"], false);
    assert_eq!(json["error_code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn tampered_code_looks_like_unknown_code() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let user = app.create_user("alice").await;

    let mut record = app.store().code(&codes[0]).unwrap();
    record.integrity_tag = "0".repeat(64);
    app.store().put_code(record);

    let (tampered_status, tampered) = app.validate(&user.access_token, &codes[0]).await;
    let (unknown_status, unknown) = app.validate(&user.access_token, "ZZZZ2222").await;

    assert_eq!(tampered_status, 404);
    assert_eq!(tampered_status, unknown_status);
    assert_eq!(tampered["error_code"], "CODE_NOT_FOUND");
    assert_eq!(tampered, unknown);
}

#[tokio::test]
async fn sixth_attempt_in_window_is_throttled() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let user = app.create_user("alice").await;

    for _ in 0..5 {
        let (status, _) = app.validate(&user.access_token, "NOPE").await;
        assert_eq!(status, 400);
    }
    let (status, json) = app.validate(&user.access_token, &codes[0]).await;
    assert_eq!(status, 429);
    assert_eq!(json["error_code"], "RATE_LIMIT_EXCEEDED");

    // Other users are unaffected
    let other = app.create_user("bob").await;
    let (status, _) = app.validate(&other.access_token, &codes[0]).await;
    assert_eq!(status, 200);

    app.clock().advance(Duration::minutes(16));
    let (status, _) = app.validate(&user.access_token, &codes[0]).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn window_states_are_conflicts() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let user = app.create_user("alice").await;

    app.clock().advance(Duration::days(-1));
    let (status, json) = app.validate(&user.access_token, &codes[0]).await;
    assert_eq!(status, 409);
    assert_eq!(json["error_code"], "CODE_NOT_ACTIVE_YET");
    assert!(json["message"].as_str().unwrap().contains("2026-03-01 00:00 UTC"));

    app.clock().advance(Duration::days(32));
    let (status, json) = app.validate(&user.access_token, &codes[0]).await;
    assert_eq!(status, 409);
    assert_eq!(json["error_code"], "CODE_EXPIRED");
}

#[tokio::test]
async fn redeem_without_account_is_not_found() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 5, 1)).await;
    let token = app.token_for(bson::oid::ObjectId::new(), "ghost@test.com", false);

    let (status, json) = app.redeem(&token, &codes[0]).await;
    assert_eq!(status, 404);
    assert_eq!(json["error_code"], "ACCOUNT_NOT_FOUND");
    assert_eq!(app.store().code(&codes[0]).unwrap().current_uses, 0);
}

#[tokio::test]
async fn promo_routes_require_authentication() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/promo/redeem"))
        .json(&serde_json::json!({ "code": "ABCD2345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .auth_post("/api/promo/validate", "not-a-token")
        .json(&serde_json::json!({ "code": "ABCD2345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn concurrent_redemptions_of_last_use_yield_one_winner() {
    let app = TestApp::spawn().await;
    let codes = app.generate_codes(batch_body(1, 1, 1)).await;
    let a = app.create_user("a").await;
    let b = app.create_user("b").await;

    let ((status_a, _), (status_b, _)) = tokio::join!(
        app.redeem(&a.access_token, &codes[0]),
        app.redeem(&b.access_token, &codes[0]),
    );

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [200, 409]);
    assert_eq!(app.store().code(&codes[0]).unwrap().current_uses, 1);
}
