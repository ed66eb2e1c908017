use std::sync::Arc;

use bson::oid::ObjectId;
use promokit_db::models::{BenefitError, PromotionCode, RedemptionRecord, Subscription};
use tracing::{error, info};

use super::clock::Clock;
use super::outcome::{ErrorCode, GrantedBenefit, INVALID_CODE_MESSAGE, RedemptionOutcome, Validation};
use super::validator::CodeValidator;
use crate::store::{PromoStore, RedemptionCommit, RedemptionGrant};

pub struct RedemptionService {
    validator: Arc<CodeValidator>,
    store: Arc<dyn PromoStore>,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    pub fn new(
        validator: Arc<CodeValidator>,
        store: Arc<dyn PromoStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator,
            store,
            clock,
        }
    }

    /// Consumes one use of `code` and grants its benefit to `user_id`.
    ///
    /// The full validation pipeline runs again first; the store then
    /// re-checks the caps inside its atomic unit. Nothing is retried here.
    pub async fn redeem(&self, user_id: ObjectId, code: &str) -> RedemptionOutcome {
        let record = match self.validator.validate(code, user_id).await {
            Validation::Valid(record) => record,
            Validation::Rejected(rejection) => return RedemptionOutcome::Failed(rejection),
        };

        let grant = match build_grant(user_id, &record, self.clock.now_bson()) {
            Ok(grant) => grant,
            Err(e) => {
                error!(%user_id, code = %record.code, error = %e, "Stored benefit cannot be granted");
                return RedemptionOutcome::failed(
                    ErrorCode::ServiceUnavailable,
                    "Redemption could not be completed, please try again",
                );
            }
        };

        match self.store.apply_redemption(&grant).await {
            Ok(RedemptionCommit::Committed { current_uses }) => {
                info!(
                    %user_id,
                    code = %record.code,
                    current_uses,
                    plan_id = %grant.subscription.plan_id,
                    "Promotion code redeemed"
                );
                RedemptionOutcome::Redeemed {
                    benefit: GrantedBenefit::new(&record.benefit, grant.subscription.expires_at),
                    current_uses,
                }
            }
            Ok(RedemptionCommit::UsageLimitReached) => {
                info!(%user_id, code = %record.code, "Usage limit reached at commit");
                RedemptionOutcome::failed(
                    ErrorCode::UsageLimitReached,
                    "This promotion code has reached its usage limit",
                )
            }
            Ok(RedemptionCommit::AlreadyRedeemed) => RedemptionOutcome::failed(
                ErrorCode::AlreadyRedeemed,
                "You have already redeemed this promotion code",
            ),
            Ok(RedemptionCommit::CodeUnavailable) => {
                RedemptionOutcome::failed(ErrorCode::CodeNotFound, INVALID_CODE_MESSAGE)
            }
            Ok(RedemptionCommit::AccountNotFound) => RedemptionOutcome::failed(
                ErrorCode::AccountNotFound,
                "No account exists for this user",
            ),
            Err(e) => {
                error!(%user_id, code = %record.code, error = %e, "Redemption transaction failed");
                RedemptionOutcome::failed(
                    ErrorCode::ServiceUnavailable,
                    "Redemption could not be completed, please try again",
                )
            }
        }
    }
}

/// Benefit payload written for one redemption at `now`.
pub fn build_grant(
    user_id: ObjectId,
    code: &PromotionCode,
    now: bson::DateTime,
) -> Result<RedemptionGrant, BenefitError> {
    Ok(RedemptionGrant {
        user_id,
        code: code.code.clone(),
        subscription: Subscription {
            plan_id: code.benefit.plan_id().to_string(),
            expires_at: code.benefit.expires_at(now)?,
            source_code: code.code.clone(),
            granted_at: now,
        },
        record: RedemptionRecord {
            code: code.code.clone(),
            redeemed_at: now,
            benefit_received: code.benefit.summary(),
        },
    })
}
