use bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use promokit_db::models::{CodeStatus, PromotionCode};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

pub struct PromotionCodeDao {
    pub base: BaseDao<PromotionCode>,
}

impl PromotionCodeDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, PromotionCode::COLLECTION),
        }
    }

    /// Inserts a new code. A clash on the unique `code` index surfaces as
    /// `DaoError::DuplicateKey`.
    pub async fn create(&self, code: &PromotionCode) -> DaoResult<ObjectId> {
        self.base.insert_one(code).await
    }

    pub async fn find_by_code(&self, code: &str) -> DaoResult<Option<PromotionCode>> {
        self.base.find_one(doc! { "code": code }).await
    }

    pub async fn find_active_by_code(&self, code: &str) -> DaoResult<Option<PromotionCode>> {
        self.base
            .find_one(doc! {
                "code": code,
                "status": bson::to_bson(&CodeStatus::Active)?,
            })
            .await
    }

    pub async fn list_all(&self) -> DaoResult<Vec<PromotionCode>> {
        self.base
            .find_many(doc! {}, Some(doc! { "created_at": -1 }))
            .await
    }

    pub async fn list(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<PromotionCode>> {
        let mut filter = Document::new();
        if let Some(status) = status {
            filter.insert("status", bson::to_bson(&status)?);
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": -1 }), params)
            .await
    }

    /// Returns `false` when the code was already inactive.
    pub async fn deactivate(&self, code: &str) -> DaoResult<bool> {
        if self.find_by_code(code).await?.is_none() {
            return Err(DaoError::NotFound);
        }

        self.base
            .update_one(
                doc! {
                    "code": code,
                    "status": bson::to_bson(&CodeStatus::Active)?,
                },
                doc! { "$set": { "status": bson::to_bson(&CodeStatus::Inactive)? } },
            )
            .await
    }
}
