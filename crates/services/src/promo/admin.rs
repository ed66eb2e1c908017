use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use promokit_config::PromoSettings;
use promokit_db::models::{
    Benefit, CodeStatus, EventPeriod, MAX_DURATION_DAYS, PromotionCode, UNLIMITED_USES,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clock::Clock;
use super::error::PromoError;
use super::generator::{generate_code, normalize_code};
use super::signer::IntegritySigner;
use crate::dao::{DaoError, PaginatedResult, PaginationParams};
use crate::store::PromoStore;

/// Hard ceiling on codes per generation request, whatever the settings say.
pub const MAX_BATCH_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCodesRequest {
    pub count: u32,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub benefit: Benefit,
    /// `-1` for no global cap.
    pub max_uses: i64,
    pub max_uses_per_user: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBatch {
    pub codes: Vec<String>,
    pub code_ids: Vec<ObjectId>,
}

/// Issuance and lifecycle operations. Callers are expected to have
/// checked the admin flag already.
pub struct AdminService {
    store: Arc<dyn PromoStore>,
    signer: Arc<IntegritySigner>,
    clock: Arc<dyn Clock>,
    max_batch_size: u32,
    generation_retries: u32,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn PromoStore>,
        signer: Arc<IntegritySigner>,
        clock: Arc<dyn Clock>,
        settings: &PromoSettings,
    ) -> Self {
        Self {
            store,
            signer,
            clock,
            max_batch_size: settings.max_batch_size.clamp(1, MAX_BATCH_SIZE),
            generation_retries: settings.generation_retries.max(1),
        }
    }

    pub async fn generate(
        &self,
        request: &GenerateCodesRequest,
        admin_id: ObjectId,
    ) -> Result<GeneratedBatch, PromoError> {
        self.check_request(request)?;

        let period = EventPeriod {
            start_date: bson::DateTime::from_chrono(request.start_date),
            end_date: bson::DateTime::from_chrono(request.end_date),
        };

        let mut batch = GeneratedBatch {
            codes: Vec::with_capacity(request.count as usize),
            code_ids: Vec::with_capacity(request.count as usize),
        };
        for _ in 0..request.count {
            let (code, id) = self.issue_one(request, period, admin_id).await?;
            batch.codes.push(code);
            batch.code_ids.push(id);
        }

        info!(
            %admin_id,
            count = request.count,
            max_uses = request.max_uses,
            plan_id = %request.benefit.plan_id(),
            "Generated promotion code batch"
        );
        Ok(batch)
    }

    async fn issue_one(
        &self,
        request: &GenerateCodesRequest,
        period: EventPeriod,
        admin_id: ObjectId,
    ) -> Result<(String, ObjectId), PromoError> {
        for attempt in 1..=self.generation_retries {
            let code = generate_code()?;
            let now = self.clock.now_bson();
            let record = PromotionCode {
                id: None,
                integrity_tag: self.signer.sign(&code),
                code: code.clone(),
                event_period: period,
                benefit: request.benefit.clone(),
                max_uses: request.max_uses,
                max_uses_per_user: request.max_uses_per_user,
                current_uses: 0,
                status: CodeStatus::Active,
                description: request.description.clone(),
                created_by: admin_id,
                created_at: now,
                updated_at: now,
            };

            match self.store.insert_code(&record).await {
                Ok(id) => return Ok((code, id)),
                Err(DaoError::DuplicateKey(_)) => {
                    warn!(attempt, "Generated promotion code already exists, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PromoError::CodeSpaceExhausted(self.generation_retries))
    }

    fn check_request(&self, request: &GenerateCodesRequest) -> Result<(), PromoError> {
        if request.count == 0 || request.count > self.max_batch_size {
            return Err(PromoError::InvalidRequest(format!(
                "count must be between 1 and {}",
                self.max_batch_size
            )));
        }
        if request.end_date <= request.start_date {
            return Err(PromoError::InvalidRequest(
                "end_date must be after start_date".to_string(),
            ));
        }
        if request.max_uses != UNLIMITED_USES && request.max_uses < 1 {
            return Err(PromoError::InvalidRequest(
                "max_uses must be -1 (unlimited) or at least 1".to_string(),
            ));
        }
        if request.max_uses_per_user < 1 {
            return Err(PromoError::InvalidRequest(
                "max_uses_per_user must be at least 1".to_string(),
            ));
        }

        let Benefit::SubscriptionUpgrade {
            plan_id,
            is_permanent,
            duration_days,
        } = &request.benefit;
        if plan_id.trim().is_empty() {
            return Err(PromoError::InvalidRequest("plan_id is required".to_string()));
        }
        match (*is_permanent, *duration_days) {
            (false, None | Some(0)) => Err(PromoError::InvalidRequest(
                "duration_days is required for non-permanent benefits".to_string(),
            )),
            (false, Some(days)) if days > MAX_DURATION_DAYS => Err(PromoError::InvalidRequest(
                format!("duration_days must be at most {MAX_DURATION_DAYS}"),
            )),
            (true, Some(_)) => Err(PromoError::InvalidRequest(
                "duration_days only applies to non-permanent benefits".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<PromotionCode>, PromoError> {
        Ok(self.store.list_all_codes().await?)
    }

    pub async fn list(
        &self,
        status: Option<CodeStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResult<PromotionCode>, PromoError> {
        Ok(self.store.list_codes(status, params).await?)
    }

    /// Marks a code inactive. There is no way back to active.
    pub async fn deactivate(&self, code: &str) -> Result<(), PromoError> {
        let code = normalize_code(code);
        match self.store.deactivate_code(&code).await {
            Ok(changed) => {
                info!(%code, changed, "Promotion code deactivated");
                Ok(())
            }
            Err(DaoError::NotFound) => Err(PromoError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
