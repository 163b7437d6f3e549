//! Error handling for the Livflow back-office
//!
//! Provides consistent error responses in English and Korean

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::StockError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ko: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_ko: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Stock ledger errors
    #[error("Insufficient stock for {ingredient_name}: requested {requested}, available {available}")]
    InsufficientStock {
        ingredient_id: Uuid,
        ingredient_name: String,
        requested: Decimal,
        available: Decimal,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation error on a single field
    pub fn validation(field: &str, message: &str, message_ko: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_ko: message_ko.to_string(),
        }
    }

    /// Attach the ingredient name to a ledger error
    pub fn from_stock(err: StockError, ingredient_name: &str) -> Self {
        match err {
            StockError::InsufficientStock {
                ingredient_id,
                requested,
                available,
            } => AppError::InsufficientStock {
                ingredient_id,
                ingredient_name: ingredient_name.to_string(),
                requested,
                available,
            },
            StockError::NonPositiveAmount(amount) => AppError::Validation {
                field: "amount".to_string(),
                message: format!("Stock amount must be positive, got {}", amount),
                message_ko: "유효한 사용량을 입력하세요.".to_string(),
            },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_ko: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_ko: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_ko: message_ko.into(),
            field: None,
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), "인증이 필요합니다."),
            ),
            AppError::Validation {
                field,
                message,
                message_ko,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_ko.clone())
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_ko,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some(resource.clone()),
                    ..ErrorDetail::new("CONFLICT", message.clone(), message_ko.clone())
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{}을(를) 찾을 수 없습니다.", resource),
                ),
            ),
            AppError::InsufficientStock {
                ingredient_id,
                ingredient_name,
                requested,
                available,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    details: Some(serde_json::json!({
                        "ingredient_id": ingredient_id,
                        "ingredient_name": ingredient_name,
                        "requested": requested,
                        "available": available,
                        "shortfall": (*requested - *available).max(Decimal::ZERO),
                    })),
                    ..ErrorDetail::new(
                        "INSUFFICIENT_STOCK",
                        format!(
                            "Not enough {} in stock: requested {}, available {}",
                            ingredient_name, requested, available
                        ),
                        format!("{}의 남은 재고보다 많이 사용할 수 없습니다.", ingredient_name),
                    )
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "데이터베이스 오류가 발생했습니다.",
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), "서버 내부 오류가 발생했습니다."),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                    "서버 내부 오류가 발생했습니다.",
                ),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
