use bson::{doc, oid::ObjectId};
use mongodb::Database;
use promokit_db::models::AttemptState;

use super::base::{BaseDao, DaoResult};

pub struct AttemptDao {
    pub base: BaseDao<AttemptState>,
}

impl AttemptDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, AttemptState::COLLECTION),
        }
    }

    pub async fn find_by_user(&self, user_id: ObjectId) -> DaoResult<Option<AttemptState>> {
        self.base.find_one(doc! { "user_id": user_id }).await
    }

    pub async fn upsert(&self, state: &AttemptState) -> DaoResult<()> {
        self.base
            .collection()
            .update_one(
                doc! { "user_id": state.user_id },
                doc! {
                    "$set": {
                        "attempts": i64::from(state.attempts),
                        "last_attempt": state.last_attempt,
                        "blocked_until": state.blocked_until,
                    }
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}
