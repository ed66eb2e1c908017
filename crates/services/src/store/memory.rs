use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use parking_lot::Mutex;
use promokit_db::models::{AttemptState, CodeStatus, PromotionCode, User};

use super::{AttemptStore, PromoStore, RedemptionCommit, RedemptionGrant};
use crate::dao::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::promo::{Clock, SystemClock};

/// Process-local store for development and tests.
///
/// One mutex guards codes and users together, so `apply_redemption`
/// reads, checks and writes both documents without interleaving.
pub struct MemoryPromoStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryPromoStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

#[derive(Default)]
struct MemoryState {
    codes: HashMap<String, PromotionCode>,
    users: HashMap<ObjectId, User>,
}

impl MemoryPromoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose `updated_at` stamps follow `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    /// Adds an account document, assigning an id when it has none.
    pub fn insert_user(&self, mut user: User) -> ObjectId {
        let id = *user.id.get_or_insert_with(ObjectId::new);
        self.state.lock().users.insert(id, user);
        id
    }

    pub fn user(&self, id: ObjectId) -> Option<User> {
        self.state.lock().users.get(&id).cloned()
    }

    /// Looks a code up regardless of status.
    pub fn code(&self, code: &str) -> Option<PromotionCode> {
        self.state.lock().codes.get(code).cloned()
    }

    /// Overwrites a stored code as-is, bypassing issuance.
    pub fn put_code(&self, code: PromotionCode) {
        self.state.lock().codes.insert(code.code.clone(), code);
    }
}

#[async_trait]
impl PromoStore for MemoryPromoStore {
    async fn insert_code(&self, code: &PromotionCode) -> DaoResult<ObjectId> {
        let mut state = self.state.lock();
        if state.codes.contains_key(&code.code) {
            return Err(DaoError::DuplicateKey(format!("code {}", code.code)));
        }
        let mut stored = code.clone();
        let id = *stored.id.get_or_insert_with(ObjectId::new);
        state.codes.insert(stored.code.clone(), stored);
        Ok(id)
    }

    async fn find_active_code(&self, code: &str) -> DaoResult<Option<PromotionCode>> {
        Ok(self
            .state
            .lock()
            .codes
            .get(code)
            .filter(|c| c.status == CodeStatus::Active)
            .cloned())
    }

    async fn list_all_codes(&self) -> DaoResult<Vec<PromotionCode>> {
        let mut codes: Vec<PromotionCode> = self.state.lock().codes.values().cloned().collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn list_codes(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<PromotionCode>> {
        let params = params.normalized();
        let matching: Vec<PromotionCode> = self
            .list_all_codes()
            .await?
            .into_iter()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(params.skip()).unwrap_or(usize::MAX))
            .take(usize::try_from(params.per_page).unwrap_or(usize::MAX))
            .collect();
        Ok(PaginatedResult::new(items, total, &params))
    }

    async fn deactivate_code(&self, code: &str) -> DaoResult<bool> {
        let mut state = self.state.lock();
        let record = state.codes.get_mut(code).ok_or(DaoError::NotFound)?;
        if record.status == CodeStatus::Inactive {
            return Ok(false);
        }
        record.status = CodeStatus::Inactive;
        record.updated_at = self.clock.now_bson();
        Ok(true)
    }

    async fn redemption_count(&self, user_id: ObjectId, code: &str) -> DaoResult<u32> {
        Ok(self
            .state
            .lock()
            .users
            .get(&user_id)
            .map_or(0, |u| u.redemption_count(code)))
    }

    async fn apply_redemption(&self, grant: &RedemptionGrant) -> DaoResult<RedemptionCommit> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(code) = state
            .codes
            .get_mut(&grant.code)
            .filter(|c| c.status == CodeStatus::Active)
        else {
            return Ok(RedemptionCommit::CodeUnavailable);
        };
        if code.is_exhausted() {
            return Ok(RedemptionCommit::UsageLimitReached);
        }

        let Some(user) = state
            .users
            .get_mut(&grant.user_id)
            .filter(|u| u.deleted_at.is_none())
        else {
            return Ok(RedemptionCommit::AccountNotFound);
        };
        if user.redemption_count(&grant.code) >= code.max_uses_per_user {
            return Ok(RedemptionCommit::AlreadyRedeemed);
        }

        let now = grant.record.redeemed_at;
        code.current_uses += 1;
        code.updated_at = now;
        user.subscription = Some(grant.subscription.clone());
        user.redemptions.push(grant.record.clone());
        user.updated_at = now;

        Ok(RedemptionCommit::Committed {
            current_uses: code.current_uses,
        })
    }
}

#[derive(Default)]
pub struct MemoryAttemptStore {
    attempts: DashMap<ObjectId, AttemptState>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn load(&self, user_id: ObjectId) -> DaoResult<Option<AttemptState>> {
        Ok(self.attempts.get(&user_id).map(|s| s.value().clone()))
    }

    async fn save(&self, state: &AttemptState) -> DaoResult<()> {
        self.attempts.insert(state.user_id, state.clone());
        Ok(())
    }
}
