use axum::{Json, extract::State, http::StatusCode};
use promokit_services::promo::{ErrorCode, GrantedBenefit, RedemptionOutcome, Rejection, Validation};
use serde::{Deserialize, Serialize};

use super::admin::PromotionCodeResponse;
use crate::{extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_code: Option<PromotionCodeResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit: Option<GrantedBenefit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_uses: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub message: String,
}

/// HTTP status for a rejected attempt.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorCode::CodeNotFound | ErrorCode::InvalidHash | ErrorCode::AccountNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::CodeNotActiveYet
        | ErrorCode::CodeExpired
        | ErrorCode::UsageLimitReached
        | ErrorCode::AlreadyRedeemed => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Integrity failures leave the engine as `CODE_NOT_FOUND`.
fn public(rejection: Rejection) -> (StatusCode, ErrorCode, String) {
    let code = rejection.error_code.public();
    (status_for(code), code, rejection.message)
}

pub async fn validate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CodeRequest>,
) -> (StatusCode, Json<ValidateResponse>) {
    match state.promo.validate_code(&body.code, auth.user_id).await {
        Validation::Valid(record) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                promotion_code: Some(record.into()),
                error_code: None,
                message: None,
            }),
        ),
        Validation::Rejected(rejection) => {
            let (status, error_code, message) = public(rejection);
            (
                status,
                Json(ValidateResponse {
                    valid: false,
                    promotion_code: None,
                    error_code: Some(error_code),
                    message: Some(message),
                }),
            )
        }
    }
}

pub async fn redeem(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CodeRequest>,
) -> (StatusCode, Json<RedeemResponse>) {
    match state.promo.redeem_code(auth.user_id, &body.code).await {
        RedemptionOutcome::Redeemed {
            benefit,
            current_uses,
        } => (
            StatusCode::OK,
            Json(RedeemResponse {
                success: true,
                message: format!("Redeemed: {}", benefit.summary),
                benefit: Some(benefit),
                current_uses: Some(current_uses),
                error_code: None,
            }),
        ),
        RedemptionOutcome::Failed(rejection) => {
            let (status, error_code, message) = public(rejection);
            (
                status,
                Json(RedeemResponse {
                    success: false,
                    benefit: None,
                    current_uses: None,
                    error_code: Some(error_code),
                    message,
                }),
            )
        }
    }
}
