use crate::fixtures::seed::batch_body;
use crate::fixtures::test_app::TestApp;
use promokit_db::models::CodeStatus;
use serde_json::Value;

#[tokio::test]
async fn generate_returns_created_codes() {
    let app = TestApp::spawn().await;

    let resp = app
        .auth_post("/api/admin/promo-codes", &app.admin_token())
        .json(&batch_body(5, 10, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let json: Value = resp.json().await.unwrap();
    let codes = json["codes"].as_array().unwrap();
    assert_eq!(codes.len(), 5);
    assert_eq!(json["code_ids"].as_array().unwrap().len(), 5);

    for code in codes {
        let code = code.as_str().unwrap();
        assert_eq!(code.len(), 8);
        let stored = app.store().code(code).unwrap();
        assert_eq!(stored.status, CodeStatus::Active);
        assert_eq!(stored.max_uses, 10);
        assert_eq!(stored.current_uses, 0);
    }
}

#[tokio::test]
async fn generate_requires_admin() {
    let app = TestApp::spawn().await;
    let user = app.create_user("alice").await;

    let resp = app
        .auth_post("/api/admin/promo-codes", &user.access_token)
        .json(&batch_body(1, 10, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .client
        .post(app.url("/api/admin/promo-codes"))
        .json(&batch_body(1, 10, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    assert!(app.state.promo.list_all_codes().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_batches_are_unprocessable() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();

    let too_many = batch_body(101, 10, 1);
    let mut backwards = batch_body(1, 10, 1);
    backwards["end_date"] = serde_json::json!("2026-02-01T00:00:00Z");
    let mut zero_uses = batch_body(1, 10, 1);
    zero_uses["max_uses"] = serde_json::json!(0);
    let mut endless = batch_body(1, 10, 1);
    endless["benefit"]["duration_days"] = serde_json::json!(200_000_000);

    for body in [batch_body(0, 10, 1), too_many, backwards, zero_uses, endless] {
        let resp = app
            .auth_post("/api/admin/promo-codes", &token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422, "{body}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["error"], "validation");
    }

    let resp = app
        .auth_get("/api/admin/promo-codes/all", &token)
        .send()
        .await
        .unwrap();
    let all: Vec<Value> = resp.json().await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn list_filters_by_status_and_paginates() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let codes = app.generate_codes(batch_body(5, 10, 1)).await;

    let resp = app
        .auth_post(&format!("/api/admin/promo-codes/{}/deactivate", codes[0]), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = app
        .auth_get("/api/admin/promo-codes?status=active&page=1&per_page=3", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 4);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 3);
    assert!(page["items"][0].get("integrity_tag").is_none());

    let resp = app
        .auth_get("/api/admin/promo-codes?status=inactive", &token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["code"], codes[0].as_str());
    assert_eq!(page["items"][0]["status"], "inactive");

    let resp = app
        .auth_get("/api/admin/promo-codes/all", &token)
        .send()
        .await
        .unwrap();
    let all: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn deactivated_code_can_no_longer_be_redeemed() {
    let app = TestApp::spawn().await;
    let token = app.admin_token();
    let codes = app.generate_codes(batch_body(1, 10, 1)).await;
    let user = app.create_user("alice").await;

    let (status, _) = app.validate(&user.access_token, &codes[0]).await;
    assert_eq!(status, 200);

    let path = format!("/api/admin/promo-codes/{}/deactivate", codes[0].to_lowercase());
    let resp = app.auth_post(&path, &token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    // Repeating is harmless
    let resp = app.auth_post(&path, &token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let (status, json) = app.redeem(&user.access_token, &codes[0]).await;
    assert_eq!(status, 404);
    assert_eq!(json["error_code"], "CODE_NOT_FOUND");
    assert_eq!(app.store().code(&codes[0]).unwrap().current_uses, 0);
}

#[tokio::test]
async fn deactivating_unknown_code_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .auth_post("/api/admin/promo-codes/ZZZZ2222/deactivate", &app.admin_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
