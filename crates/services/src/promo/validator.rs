use std::sync::Arc;

use bson::oid::ObjectId;
use promokit_db::models::WindowState;
use tracing::{debug, error, warn};

use super::clock::Clock;
use super::generator::{is_valid_format, normalize_code};
use super::limiter::AttemptLimiter;
use super::outcome::{ErrorCode, INVALID_CODE_MESSAGE, Validation};
use super::signer::IntegritySigner;
use crate::dao::DaoError;
use crate::store::PromoStore;

/// Ordered validation pipeline. Stops at the first failing stage:
/// rate limit, format, lookup, integrity, event window, global usage,
/// per-user usage.
pub struct CodeValidator {
    store: Arc<dyn PromoStore>,
    limiter: AttemptLimiter,
    signer: Arc<IntegritySigner>,
    clock: Arc<dyn Clock>,
}

impl CodeValidator {
    pub fn new(
        store: Arc<dyn PromoStore>,
        limiter: AttemptLimiter,
        signer: Arc<IntegritySigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            limiter,
            signer,
            clock,
        }
    }

    pub async fn validate(&self, input: &str, user_id: ObjectId) -> Validation {
        if !self.limiter.check_and_consume(user_id).await {
            return Validation::reject(
                ErrorCode::RateLimitExceeded,
                "Too many attempts. Please try again later.",
            );
        }

        let code = normalize_code(input);
        if !is_valid_format(&code) {
            return Validation::reject(
                ErrorCode::InvalidFormat,
                "Promotion codes are 8 letters and digits",
            );
        }

        let record = match self.store.find_active_code(&code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%user_id, %code, "Unknown or inactive promotion code submitted");
                return Validation::reject(ErrorCode::CodeNotFound, INVALID_CODE_MESSAGE);
            }
            Err(e) => return unavailable(&code, e),
        };

        if !self.signer.verify(&code, &record.integrity_tag) {
            warn!(%user_id, %code, "Promotion code failed integrity check");
            return Validation::reject(ErrorCode::InvalidHash, INVALID_CODE_MESSAGE);
        }

        match record.window_state(self.clock.now_bson()) {
            WindowState::Pending => {
                let starts = record.event_period.start_date.to_chrono();
                return Validation::reject(
                    ErrorCode::CodeNotActiveYet,
                    format!(
                        "This code becomes active on {}",
                        starts.format("%Y-%m-%d %H:%M UTC")
                    ),
                );
            }
            WindowState::Closed => {
                return Validation::reject(ErrorCode::CodeExpired, "This promotion code has expired");
            }
            WindowState::Open => {}
        }

        if record.is_exhausted() {
            return Validation::reject(
                ErrorCode::UsageLimitReached,
                "This promotion code has reached its usage limit",
            );
        }

        match self.store.redemption_count(user_id, &code).await {
            Ok(used) if used >= record.max_uses_per_user => {
                return Validation::reject(
                    ErrorCode::AlreadyRedeemed,
                    "You have already redeemed this promotion code",
                );
            }
            Ok(_) => {}
            Err(e) => return unavailable(&code, e),
        }

        debug!(%user_id, %code, "Promotion code validated");
        Validation::Valid(record)
    }
}

fn unavailable(code: &str, e: DaoError) -> Validation {
    error!(%code, error = %e, "Promotion code lookup failed");
    Validation::reject(
        ErrorCode::ServiceUnavailable,
        "Promotion codes are temporarily unavailable",
    )
}
