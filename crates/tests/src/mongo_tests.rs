//! End-to-end tests against MongoDB. Redemption uses multi-document
//! transactions, so these need a replica set:
//! `cargo test -p promokit-tests -- --ignored`.

use crate::fixtures::seed::batch_body_between;
use crate::fixtures::test_app::TestApp;
use chrono::{Duration, Utc};
use promokit_services::dao::{DaoError, PromotionCodeDao, UserDao};
use serde_json::Value;

fn open_batch(count: u32, max_uses: i64, max_uses_per_user: u32) -> Value {
    let now = Utc::now();
    batch_body_between(
        now - Duration::hours(1),
        now + Duration::days(7),
        count,
        max_uses,
        max_uses_per_user,
    )
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn mongo_three_code_batch_enforces_caps() {
    let app = TestApp::spawn_mongo().await;
    let db = app.db.clone().unwrap();
    let codes = app.generate_codes(open_batch(3, 2, 1)).await;
    let code = &codes[0];

    let a = app.create_user("a").await;
    let b = app.create_user("b").await;
    let c = app.create_user("c").await;

    assert_eq!(app.redeem(&a.access_token, code).await.0, 200);

    let (status, json) = app.redeem(&a.access_token, code).await;
    assert_eq!(status, 409);
    assert_eq!(json["error_code"], "ALREADY_REDEEMED");

    let (status, json) = app.redeem(&b.access_token, code).await;
    assert_eq!(status, 200);
    assert_eq!(json["current_uses"], 2);

    let (status, json) = app.redeem(&c.access_token, code).await;
    assert_eq!(status, 409);
    assert_eq!(json["error_code"], "USAGE_LIMIT_REACHED");

    let stored = PromotionCodeDao::new(&db).find_by_code(code).await.unwrap().unwrap();
    assert_eq!(stored.current_uses, 2);

    let user = UserDao::new(&db).find_active(a.id).await.unwrap();
    assert_eq!(user.redemption_count(code), 1);
    assert_eq!(user.subscription.unwrap().plan_id, "premium");
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn mongo_concurrent_redemptions_respect_max_uses() {
    let app = TestApp::spawn_mongo().await;
    let db = app.db.clone().unwrap();
    let max_uses = 3;
    let codes = app.generate_codes(open_batch(1, max_uses, 1)).await;

    let mut users = Vec::new();
    for i in 0..10 {
        users.push(app.create_user(&format!("user{i}")).await);
    }

    let results = futures::future::join_all(
        users
            .iter()
            .map(|u| app.redeem(&u.access_token, &codes[0])),
    )
    .await;

    let successes = results.iter().filter(|(status, _)| *status == 200).count();
    assert_eq!(successes as i64, max_uses.min(10));
    for (status, json) in results.iter().filter(|(status, _)| *status != 200) {
        assert_eq!(*status, 409, "{json}");
        assert_eq!(json["error_code"], "USAGE_LIMIT_REACHED");
    }

    let stored = PromotionCodeDao::new(&db)
        .find_by_code(&codes[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_uses, successes as i64);
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn mongo_unique_index_rejects_duplicate_codes() {
    let app = TestApp::spawn_mongo().await;
    let db = app.db.clone().unwrap();
    let codes = app.generate_codes(open_batch(1, 3, 1)).await;

    let dao = PromotionCodeDao::new(&db);
    let mut copy = dao.find_by_code(&codes[0]).await.unwrap().unwrap();
    copy.id = None;

    let err = dao.create(&copy).await.unwrap_err();
    assert!(matches!(err, DaoError::DuplicateKey(_)));
}
