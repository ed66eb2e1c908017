use thiserror::Error;

use crate::dao::DaoError;

#[derive(Debug, Error)]
pub enum PromoError {
    #[error("Random source unavailable: {0}")]
    Generation(String),
    #[error("promo.integrity_secret must be set in production")]
    MissingSecret,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Promotion code not found")]
    NotFound,
    #[error("No unique code found after {0} attempts")]
    CodeSpaceExhausted(u32),
    #[error(transparent)]
    Dao(#[from] DaoError),
}
