use std::sync::Arc;

use bson::oid::ObjectId;
use mongodb::Database;
use promokit_config::Settings;
use promokit_db::models::{CodeStatus, PromotionCode};

use super::admin::{AdminService, GenerateCodesRequest, GeneratedBatch};
use super::clock::{Clock, SystemClock};
use super::error::PromoError;
use super::limiter::AttemptLimiter;
use super::outcome::{RedemptionOutcome, Validation};
use super::redemption::RedemptionService;
use super::signer::IntegritySigner;
use super::validator::CodeValidator;
use crate::dao::{PaginatedResult, PaginationParams};
use crate::store::{AttemptStore, MongoAttemptStore, MongoPromoStore, PromoStore};

/// Entry point wiring issuance, validation and redemption over one set
/// of stores.
pub struct PromoService {
    admin: AdminService,
    validator: Arc<CodeValidator>,
    redemption: RedemptionService,
}

impl PromoService {
    /// Fails only on misconfiguration, e.g. no integrity secret in production.
    pub fn new(
        settings: &Settings,
        store: Arc<dyn PromoStore>,
        attempts: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PromoError> {
        let signer = Arc::new(IntegritySigner::from_settings(settings)?);
        let limiter = AttemptLimiter::new(attempts, clock.clone(), &settings.promo);
        let validator = Arc::new(CodeValidator::new(
            store.clone(),
            limiter,
            signer.clone(),
            clock.clone(),
        ));
        let redemption = RedemptionService::new(validator.clone(), store.clone(), clock.clone());
        let admin = AdminService::new(store, signer, clock, &settings.promo);

        Ok(Self {
            admin,
            validator,
            redemption,
        })
    }

    pub fn with_database(db: &Database, settings: &Settings) -> Result<Self, PromoError> {
        Self::new(
            settings,
            Arc::new(MongoPromoStore::new(db, settings.promo.transaction_retries)),
            Arc::new(MongoAttemptStore::new(db)),
            Arc::new(SystemClock),
        )
    }

    pub async fn generate_batch(
        &self,
        request: &GenerateCodesRequest,
        admin_id: ObjectId,
    ) -> Result<GeneratedBatch, PromoError> {
        self.admin.generate(request, admin_id).await
    }

    pub async fn list_all_codes(&self) -> Result<Vec<PromotionCode>, PromoError> {
        self.admin.list_all().await
    }

    pub async fn list_codes(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResult<PromotionCode>, PromoError> {
        self.admin.list(status, params).await
    }

    pub async fn deactivate_code(&self, code: &str) -> Result<(), PromoError> {
        self.admin.deactivate(code).await
    }

    pub async fn validate_code(&self, code: &str, user_id: ObjectId) -> Validation {
        self.validator.validate(code, user_id).await
    }

    pub async fn redeem_code(&self, user_id: ObjectId, code: &str) -> RedemptionOutcome {
        self.redemption.redeem(user_id, code).await
    }
}
