use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::AppointmentStatus;

/* -------------------------
   Core failures
--------------------------*/

/// Which referenced record was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Pet,
    Service,
    Appointment,
}

impl Entity {
    fn code(self) -> &'static str {
        match self {
            Entity::Pet => "PET_NOT_FOUND",
            Entity::Service => "SERVICE_NOT_FOUND",
            Entity::Appointment => "APPOINTMENT_NOT_FOUND",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Entity::Pet => "pet",
            Entity::Service => "service",
            Entity::Appointment => "appointment",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{} not found", .0.label())]
    NotFound(Entity),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("timeslot {0} is already taken")]
    SlotTaken(DateTime<Utc>),

    #[error("cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),
}

pub fn db_error(e: sqlx::Error) -> CoreError {
    CoreError::Store(format!("db error: {e}"))
}

/* -------------------------
   Transport errors
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let message = e.to_string();
        match e {
            CoreError::NotFound(entity) => ApiError::NotFound(entity.code(), message),
            CoreError::Forbidden(_) => ApiError::Forbidden("FORBIDDEN", message),
            CoreError::SlotTaken(_) => ApiError::Conflict("SLOT_TAKEN", message),
            CoreError::InvalidTransition { .. } => {
                ApiError::Conflict("INVALID_STATUS_TRANSITION", message)
            }
            CoreError::Validation(_) => ApiError::BadRequest("VALIDATION_ERROR", message),
            CoreError::Store(_) => {
                tracing::error!(error = %message, "store failure");
                ApiError::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg),
            )
                .into_response(),
        }
    }
}
