use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tier_ranking::RankingError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid tier data: {0}")]
    InvalidTierData(String),

    #[error("Invalid group state: {0}")]
    InvalidGroupState(String),

    #[error("Comparison session already resolved")]
    AlreadyResolved,

    #[error("Comparison session not found or expired, please retry: {0}")]
    SessionNotFound(String),

    #[error("Allocation fault: {0}")]
    AllocationFault(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidTierData(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyResolved | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidGroupState(_)
            | AppError::AllocationFault(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RankingError> for AppError {
    fn from(err: RankingError) -> Self {
        match err {
            RankingError::InvalidTierData(msg) => AppError::InvalidTierData(msg),
            RankingError::InvalidGroupState(msg) => AppError::InvalidGroupState(msg),
            RankingError::AlreadyResolved => AppError::AlreadyResolved,
            RankingError::SessionNotFound(token) => AppError::SessionNotFound(token),
            RankingError::AllocationFault(msg) => AppError::AllocationFault(msg),
        }
    }
}

impl From<crate::repository::StoreError> for AppError {
    fn from(err: crate::repository::StoreError) -> Self {
        match err {
            crate::repository::StoreError::UnknownItem(id) => {
                AppError::NotFound(format!("item '{}'", id))
            }
            crate::repository::StoreError::UnknownCategory(id) => {
                AppError::NotFound(format!("category '{}'", id))
            }
            crate::repository::StoreError::Stale(id) => AppError::Conflict(format!(
                "category '{}' was changed by another request, please retry",
                id
            )),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<crate::sessions::SessionStoreError> for AppError {
    fn from(err: crate::sessions::SessionStoreError) -> Self {
        AppError::Storage(err.to_string())
    }
}
