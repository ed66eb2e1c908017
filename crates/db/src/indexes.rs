use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{AttemptState, PromotionCode, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Promotion codes: the code is the lookup key and must never collide
    create_indexes(
        db,
        PromotionCode::COLLECTION,
        vec![
            index_unique(bson::doc! { "code": 1 }),
            index(bson::doc! { "status": 1, "created_at": -1 }),
            index(bson::doc! { "created_by": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index(bson::doc! { "redemptions.code": 1 }),
        ],
    )
    .await?;

    // Redemption attempt counters
    create_indexes(
        db,
        AttemptState::COLLECTION,
        vec![index_unique(bson::doc! { "user_id": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
