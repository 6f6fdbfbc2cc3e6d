use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use haven_booking::{BookingError, ScheduleError};
use haven_core::StoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    /// Booking outcomes keep their own `{success, error}` envelope.
    Booking(BookingError),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::Booking(err) => return booking_failure(err),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

fn booking_failure(err: BookingError) -> Response {
    let status = match &err {
        BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
        BookingError::SlotFull { .. } => StatusCode::CONFLICT,
        BookingError::TransientConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::Store(e) => {
            tracing::error!("Booking failed on store error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": err.code() })),
            )
                .into_response();
        }
    };

    let body = Json(json!({
        "success": false,
        "error": err.code(),
        "message": err.to_string(),
    }));

    if err.is_retryable() {
        (status, [(header::RETRY_AFTER, "1")], body).into_response()
    } else {
        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ (ScheduleError::OfferingTypeNotFound(_) | ScheduleError::SlotNotFound(_)) => {
                AppError::NotFoundError(e.to_string())
            }
            e @ (ScheduleError::SlotHasBookings { .. } | ScheduleError::OfferingTypeInUse { .. }) => {
                AppError::ConflictError(e.to_string())
            }
            ScheduleError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}
