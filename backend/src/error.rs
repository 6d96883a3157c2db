//! Error handling for the Goods Receipt Workflow Platform
//!
//! Every failure in this subsystem is a recoverable business-rule
//! rejection surfaced as a typed error; nothing here is fatal at the
//! process level.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::workflow::WorkflowError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule rejections from the workflow state machine
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    // External service errors
    #[error("Inventory placement failed: {0}")]
    PlacementFailure(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

fn detail(code: &str, message: String) -> ErrorDetail {
    ErrorDetail {
        code: code.to_string(),
        message,
        field: None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                detail("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Workflow(err) => workflow_detail(err),
            AppError::PlacementFailure(msg) => (
                StatusCode::BAD_GATEWAY,
                detail(
                    "DOWNSTREAM_PLACEMENT_FAILURE",
                    format!("Inventory placement failed: {}", msg),
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("CONFIGURATION_ERROR", format!("Configuration error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Map workflow rejections to HTTP codes the UI can explain
fn workflow_detail(err: &WorkflowError) -> (StatusCode, ErrorDetail) {
    match err {
        WorkflowError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            detail("INVALID_TRANSITION", err.to_string()),
        ),
        WorkflowError::GuardFailed { predicate, .. } => (
            StatusCode::CONFLICT,
            ErrorDetail {
                code: "GUARD_FAILED".to_string(),
                message: err.to_string(),
                field: Some(predicate.to_string()),
            },
        ),
        WorkflowError::MissingRejectionReason { .. } => (
            StatusCode::BAD_REQUEST,
            detail("MISSING_REJECTION_REASON", err.to_string()),
        ),
        WorkflowError::QuantityMismatch { .. } => (
            StatusCode::BAD_REQUEST,
            detail("QUANTITY_MISMATCH", err.to_string()),
        ),
        WorkflowError::IncompleteQualityCheck { .. } => (
            StatusCode::BAD_REQUEST,
            detail("INCOMPLETE_QUALITY_CHECK", err.to_string()),
        ),
        WorkflowError::InvalidDecision { .. } => (
            StatusCode::BAD_REQUEST,
            detail("INVALID_DECISION", err.to_string()),
        ),
        WorkflowError::UnknownItem { .. } => (
            StatusCode::NOT_FOUND,
            detail("ITEM_NOT_FOUND", err.to_string()),
        ),
    }
}

pub type AppResult<T> = Result<T, AppError>;
