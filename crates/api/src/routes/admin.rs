use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use promokit_db::models::{Benefit, CodeStatus, PromotionCode};
use promokit_services::dao::{PaginatedResult, PaginationParams};
use promokit_services::promo::GenerateCodesRequest;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extractors::auth::AdminUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct PromotionCodeResponse {
    pub id: String,
    pub code: String,
    pub description: String,
    pub benefit: Benefit,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_uses: i64,
    pub max_uses_per_user: u32,
    pub current_uses: i64,
    pub remaining_uses: Option<i64>,
    pub status: CodeStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<PromotionCode> for PromotionCodeResponse {
    fn from(code: PromotionCode) -> Self {
        Self {
            id: code.id.map(|id| id.to_hex()).unwrap_or_default(),
            remaining_uses: code.remaining_uses(),
            start_date: code.event_period.start_date.to_chrono(),
            end_date: code.event_period.end_date.to_chrono(),
            created_by: code.created_by.to_hex(),
            created_at: code.created_at.to_chrono(),
            code: code.code,
            description: code.description,
            benefit: code.benefit,
            max_uses: code.max_uses,
            max_uses_per_user: code.max_uses_per_user,
            current_uses: code.current_uses,
            status: code.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub codes: Vec<String>,
    pub code_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<CodeStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn generate(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<GenerateCodesRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let batch = state.promo.generate_batch(&body, admin.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            codes: batch.codes,
            code_ids: batch.code_ids.iter().map(|id| id.to_hex()).collect(),
        }),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResult<PromotionCodeResponse>>, ApiError> {
    let defaults = PaginationParams::default();
    let params = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };

    let result = state.promo.list_codes(query.status, &params).await?;

    Ok(Json(PaginatedResult {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
        total_pages: result.total_pages,
    }))
}

pub async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<PromotionCodeResponse>>, ApiError> {
    let codes = state.promo.list_all_codes().await?;
    Ok(Json(codes.into_iter().map(Into::into).collect()))
}

pub async fn deactivate(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.promo.deactivate_code(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
