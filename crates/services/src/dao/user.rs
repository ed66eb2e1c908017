use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use promokit_db::models::User;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    /// Provisions the account document for an identity issued elsewhere.
    pub async fn create(
        &self,
        id: Option<ObjectId>,
        email: String,
        username: String,
        display_name: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id,
            email,
            username,
            display_name,
            subscription: None,
            redemptions: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_active(&self, user_id: ObjectId) -> DaoResult<User> {
        self.base
            .find_one(doc! { "_id": user_id, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn redemption_count(&self, user_id: ObjectId, code: &str) -> DaoResult<u32> {
        Ok(self.find_active(user_id).await?.redemption_count(code))
    }
}
