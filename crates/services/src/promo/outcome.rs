use std::fmt;

use chrono::{DateTime, Utc};
use promokit_db::models::{Benefit, PromotionCode};
use serde::{Deserialize, Serialize};

/// Message shared by every integrity failure so responses do not reveal
/// whether a code exists.
pub const INVALID_CODE_MESSAGE: &str = "Invalid promotion code";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    InvalidFormat,
    CodeNotFound,
    InvalidHash,
    CodeNotActiveYet,
    CodeExpired,
    UsageLimitReached,
    AlreadyRedeemed,
    AccountNotFound,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::CodeNotFound => "CODE_NOT_FOUND",
            ErrorCode::InvalidHash => "INVALID_HASH",
            ErrorCode::CodeNotActiveYet => "CODE_NOT_ACTIVE_YET",
            ErrorCode::CodeExpired => "CODE_EXPIRED",
            ErrorCode::UsageLimitReached => "USAGE_LIMIT_REACHED",
            ErrorCode::AlreadyRedeemed => "ALREADY_REDEEMED",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn is_integrity_failure(self) -> bool {
        matches!(self, ErrorCode::CodeNotFound | ErrorCode::InvalidHash)
    }

    /// Code reported to end users. A bad tag is indistinguishable from an
    /// unknown code.
    pub fn public(self) -> Self {
        if self.is_integrity_failure() {
            ErrorCode::CodeNotFound
        } else {
            self
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub error_code: ErrorCode,
    pub message: String,
}

impl Rejection {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }
}

/// Advisory result of the validation pipeline.
#[derive(Debug, Clone)]
pub enum Validation {
    Valid(PromotionCode),
    Rejected(Rejection),
}

impl Validation {
    pub fn reject(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Validation::Rejected(Rejection::new(error_code, message))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Validation::Valid(_) => None,
            Validation::Rejected(r) => Some(r.error_code),
        }
    }
}

/// What the user received from a redemption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantedBenefit {
    pub plan_id: String,
    pub is_permanent: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub summary: String,
}

impl GrantedBenefit {
    pub fn new(benefit: &Benefit, expires_at: Option<bson::DateTime>) -> Self {
        let Benefit::SubscriptionUpgrade {
            plan_id,
            is_permanent,
            ..
        } = benefit;
        Self {
            plan_id: plan_id.clone(),
            is_permanent: *is_permanent,
            expires_at: expires_at.map(bson::DateTime::to_chrono),
            summary: benefit.summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedemptionOutcome {
    Redeemed {
        benefit: GrantedBenefit,
        current_uses: i64,
    },
    Failed(Rejection),
}

impl RedemptionOutcome {
    pub fn failed(error_code: ErrorCode, message: impl Into<String>) -> Self {
        RedemptionOutcome::Failed(Rejection::new(error_code, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RedemptionOutcome::Redeemed { .. })
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            RedemptionOutcome::Redeemed { .. } => None,
            RedemptionOutcome::Failed(r) => Some(r.error_code),
        }
    }
}
