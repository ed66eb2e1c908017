use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::{
    error::{TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{ReadConcern, WriteConcern},
    Client, ClientSession, Database,
};
use promokit_db::models::{AttemptState, CodeStatus, PromotionCode, UNLIMITED_USES};
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{AttemptStore, PromoStore, RedemptionCommit, RedemptionGrant};
use crate::dao::{
    AttemptDao, DaoError, DaoResult, PaginatedResult, PaginationParams, PromotionCodeDao, UserDao,
};

/// MongoDB-backed store. Redemptions run in a snapshot transaction and
/// therefore need a replica set or sharded cluster.
pub struct MongoPromoStore {
    client: Client,
    codes: PromotionCodeDao,
    users: UserDao,
    transaction_retries: u32,
}

impl MongoPromoStore {
    pub fn new(db: &Database, transaction_retries: u32) -> Self {
        Self {
            client: db.client().clone(),
            codes: PromotionCodeDao::new(db),
            users: UserDao::new(db),
            transaction_retries,
        }
    }

    async fn redeem_in_transaction(
        &self,
        session: &mut ClientSession,
        grant: &RedemptionGrant,
    ) -> DaoResult<RedemptionCommit> {
        let active = bson::to_bson(&CodeStatus::Active)?;

        let code = self
            .codes
            .base
            .collection()
            .find_one(doc! { "code": &grant.code, "status": active.clone() })
            .session(&mut *session)
            .await?;
        let Some(code) = code else {
            return Ok(RedemptionCommit::CodeUnavailable);
        };
        if code.is_exhausted() {
            return Ok(RedemptionCommit::UsageLimitReached);
        }

        let user = self
            .users
            .base
            .collection()
            .find_one(doc! { "_id": grant.user_id, "deleted_at": null })
            .session(&mut *session)
            .await?;
        let Some(user) = user else {
            return Ok(RedemptionCommit::AccountNotFound);
        };
        if user.redemption_count(&grant.code) >= code.max_uses_per_user {
            return Ok(RedemptionCommit::AlreadyRedeemed);
        }

        let now = grant.record.redeemed_at;

        // The cap is part of the filter so the increment itself can never
        // overshoot max_uses.
        let incremented = self
            .codes
            .base
            .collection()
            .update_one(
                doc! {
                    "code": &grant.code,
                    "status": active,
                    "$or": [
                        { "max_uses": UNLIMITED_USES },
                        { "$expr": { "$lt": ["$current_uses", "$max_uses"] } },
                    ],
                },
                doc! {
                    "$inc": { "current_uses": 1_i64 },
                    "$set": { "updated_at": now },
                },
            )
            .session(&mut *session)
            .await?;
        if incremented.modified_count == 0 {
            return Ok(RedemptionCommit::UsageLimitReached);
        }

        self.users
            .base
            .collection()
            .update_one(
                doc! { "_id": grant.user_id },
                doc! {
                    "$set": {
                        "subscription": bson::to_bson(&grant.subscription)?,
                        "updated_at": now,
                    },
                    "$push": { "redemptions": bson::to_bson(&grant.record)? },
                },
            )
            .session(&mut *session)
            .await?;

        Ok(RedemptionCommit::Committed {
            current_uses: code.current_uses + 1,
        })
    }

    async fn commit(&self, session: &mut ClientSession) -> Result<(), mongodb::error::Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(e)
                    if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && attempt <= self.transaction_retries =>
                {
                    warn!(attempt, error = %e, "Commit result unknown, retrying commit");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Contended redemptions keep retrying while the code has capacity, up to
// this much wall time.
const CONFLICT_DEADLINE: Duration = Duration::from_secs(10);
const BACKOFF_BASE_MS: u64 = 10;
const BACKOFF_CAP_MS: u64 = 250;

fn is_transient(err: &DaoError) -> bool {
    matches!(err, DaoError::Mongo(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR))
}

/// Final answer for a redemption that keeps losing write conflicts, read
/// from the code's committed state. `None` means capacity remains.
fn settle_lost_race(code: Option<&PromotionCode>) -> Option<RedemptionCommit> {
    match code {
        None => Some(RedemptionCommit::CodeUnavailable),
        Some(code) if code.is_exhausted() => Some(RedemptionCommit::UsageLimitReached),
        Some(_) => None,
    }
}

/// Exponential backoff with jitter before re-running a conflicted transaction.
fn conflict_backoff(attempt: u32) -> Duration {
    let base = (BACKOFF_BASE_MS << attempt.min(5)).min(BACKOFF_CAP_MS);
    let jitter = rand::rng().random_range(0..=base / 2);
    Duration::from_millis(base + jitter)
}

#[async_trait]
impl PromoStore for MongoPromoStore {
    async fn insert_code(&self, code: &PromotionCode) -> DaoResult<ObjectId> {
        self.codes.create(code).await
    }

    async fn find_active_code(&self, code: &str) -> DaoResult<Option<PromotionCode>> {
        self.codes.find_active_by_code(code).await
    }

    async fn list_all_codes(&self) -> DaoResult<Vec<PromotionCode>> {
        self.codes.list_all().await
    }

    async fn list_codes(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<PromotionCode>> {
        self.codes.list(status, params).await
    }

    async fn deactivate_code(&self, code: &str) -> DaoResult<bool> {
        self.codes.deactivate(code).await
    }

    async fn redemption_count(&self, user_id: ObjectId, code: &str) -> DaoResult<u32> {
        match self.users.redemption_count(user_id, code).await {
            Err(DaoError::NotFound) => Ok(0),
            other => other,
        }
    }

    async fn apply_redemption(&self, grant: &RedemptionGrant) -> DaoResult<RedemptionCommit> {
        let mut session = self.client.start_session().await?;
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            session
                .start_transaction()
                .read_concern(ReadConcern::snapshot())
                .write_concern(WriteConcern::majority())
                .await?;

            let result = match self.redeem_in_transaction(&mut session, grant).await {
                Ok(commit @ RedemptionCommit::Committed { .. }) => {
                    self.commit(&mut session).await.map(|()| commit).map_err(DaoError::from)
                }
                Ok(rejected) => {
                    session.abort_transaction().await?;
                    return Ok(rejected);
                }
                Err(e) => {
                    // Best effort: the server aborts on its own if this fails
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            };

            match result {
                Ok(commit) => {
                    debug!(code = %grant.code, user_id = %grant.user_id, "Redemption committed");
                    return Ok(commit);
                }
                Err(e) if is_transient(&e) => {
                    if attempt > self.transaction_retries {
                        // A conflict storm usually means the last uses are
                        // being taken; the committed counter decides.
                        let current = self.codes.find_active_by_code(&grant.code).await?;
                        if let Some(settled) = settle_lost_race(current.as_ref()) {
                            debug!(
                                code = %grant.code,
                                user_id = %grant.user_id,
                                attempt,
                                "Redemption lost the race for the last use"
                            );
                            return Ok(settled);
                        }
                        if started.elapsed() >= CONFLICT_DEADLINE {
                            return Err(e);
                        }
                    }
                    warn!(
                        attempt,
                        code = %grant.code,
                        error = %e,
                        "Redemption transaction conflicted, re-running"
                    );
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct MongoAttemptStore {
    attempts: AttemptDao,
}

impl MongoAttemptStore {
    pub fn new(db: &Database) -> Self {
        Self {
            attempts: AttemptDao::new(db),
        }
    }
}

#[async_trait]
impl AttemptStore for MongoAttemptStore {
    async fn load(&self, user_id: ObjectId) -> DaoResult<Option<AttemptState>> {
        self.attempts.find_by_user(user_id).await
    }

    async fn save(&self, state: &AttemptState) -> DaoResult<()> {
        self.attempts.upsert(state).await
    }
}
