//! Persistence seam for the promotion engine.
//!
//! `PromoStore` covers the code collection and the slice of the user
//! account this service owns; `AttemptStore` holds limiter counters.
//! `apply_redemption` is the only operation that mutates usage counters
//! and must run as one atomic unit in every implementation.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use promokit_db::models::{
    AttemptState, CodeStatus, PromotionCode, RedemptionRecord, Subscription,
};

use crate::dao::{DaoResult, PaginatedResult, PaginationParams};

pub use memory::{MemoryAttemptStore, MemoryPromoStore};
pub use mongo::{MongoAttemptStore, MongoPromoStore};

#[async_trait]
pub trait PromoStore: Send + Sync {
    async fn insert_code(&self, code: &PromotionCode) -> DaoResult<ObjectId>;

    async fn find_active_code(&self, code: &str) -> DaoResult<Option<PromotionCode>>;

    async fn list_all_codes(&self) -> DaoResult<Vec<PromotionCode>>;

    async fn list_codes(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<PromotionCode>>;

    /// `Err(NotFound)` for unknown codes, `Ok(false)` if already inactive.
    async fn deactivate_code(&self, code: &str) -> DaoResult<bool>;

    /// Redemptions of `code` in the user's history; zero for unknown users.
    async fn redemption_count(&self, user_id: ObjectId, code: &str) -> DaoResult<u32>;

    /// Re-checks the caps and commits the usage increment together with
    /// the user's benefit and redemption record, or changes nothing.
    async fn apply_redemption(&self, grant: &RedemptionGrant) -> DaoResult<RedemptionCommit>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn load(&self, user_id: ObjectId) -> DaoResult<Option<AttemptState>>;

    async fn save(&self, state: &AttemptState) -> DaoResult<()>;
}

/// Everything the store needs to write for one redemption.
#[derive(Debug, Clone)]
pub struct RedemptionGrant {
    pub user_id: ObjectId,
    pub code: String,
    pub subscription: Subscription,
    pub record: RedemptionRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionCommit {
    Committed { current_uses: i64 },
    /// Deactivated or removed between validation and commit.
    CodeUnavailable,
    UsageLimitReached,
    AlreadyRedeemed,
    AccountNotFound,
}
