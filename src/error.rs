use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::TransitionError;
use crate::handlers::shared::ApiResponse;

/// Why a request collided with the current state of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The shift's employee has approved leave covering the shift date
    LeaveConflict,
    TransferAlreadyActive,
    InvalidTransition,
    /// The row changed between read and conditional write
    StateChanged,
    RequestExpired,
    OverlappingLeave,
    EmailTaken,
    AlreadyMember,
}

impl ConflictReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ConflictReason::LeaveConflict => "employee has approved leave on this date",
            ConflictReason::TransferAlreadyActive => {
                "an active transfer request already exists for this shift"
            }
            ConflictReason::InvalidTransition => "transition not allowed from the current status",
            ConflictReason::StateChanged => "record was modified concurrently",
            ConflictReason::RequestExpired => "request has expired",
            ConflictReason::OverlappingLeave => "leave request overlaps an existing request",
            ConflictReason::EmailTaken => "email is already registered",
            ConflictReason::AlreadyMember => "profile is already a member of this team",
        }
    }
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    EmailNotConfirmed,
    RateLimited,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AuthFailure::InvalidCredentials => "Invalid email or password",
            AuthFailure::EmailNotConfirmed => "Email address has not been confirmed",
            AuthFailure::RateLimited => "Too many attempts. Please try again later.",
        })
    }
}

/// Discriminant sent to clients in `error.code`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    InvalidCredentials,
    EmailNotConfirmed,
    RateLimited,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub code: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConflictReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("{0}")]
    Auth(AuthFailure),

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn internal_server_error_message(message: impl Into<String>) -> Self {
        AppError::InternalServerError(Some(message.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Auth(AuthFailure::InvalidCredentials) => ErrorKind::InvalidCredentials,
            AppError::Auth(AuthFailure::EmailNotConfirmed) => ErrorKind::EmailNotConfirmed,
            AppError::Auth(AuthFailure::RateLimited) => ErrorKind::RateLimited,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => ErrorKind::Unknown,
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.kind(),
            reason: match self {
                AppError::Conflict(reason) => Some(*reason),
                _ => None,
            },
            field: match self {
                AppError::Validation { field, .. } => Some(field.clone()),
                _ => None,
            },
        }
    }

    /// Message safe to return to callers; store internals stay in the log
    fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(AuthFailure::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            log::error!("Request failed with status {}: {}", status_code, self);
        } else {
            log::warn!("Request rejected with status {}: {}", status_code, self);
        }

        let response_body = ApiResponse::<()>::failure(&self.public_message(), self.detail());

        HttpResponse::build(status_code).json(response_body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = error {
            return AppError::NotFound("Record not found".to_string());
        }

        if let Some(db_error) = error.as_database_error() {
            if db_error.is_unique_violation() {
                let message = db_error.message();
                if message.contains("shift_transfer_requests.shift_id") {
                    return AppError::Conflict(ConflictReason::TransferAlreadyActive);
                }
                if message.contains("profiles.email") {
                    return AppError::Conflict(ConflictReason::EmailTaken);
                }
                if message.contains("team_members.team_id") {
                    return AppError::Conflict(ConflictReason::AlreadyMember);
                }
            }
        }

        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        match error.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => AppError::from(sqlx_err),
            Err(original_error) => AppError::InternalServerError(Some(original_error.to_string())),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(error: TransitionError) -> Self {
        log::warn!("Rejected workflow transition: {}", error);
        AppError::Conflict(ConflictReason::InvalidTransition)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        log::error!("Storage error: {}", error);
        AppError::InternalServerError(Some("storage failure".to_string()))
    }
}
