use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use derive_more::Display;
use serde_json::json;

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "Unauthorized: {}", _0)]
    Unauthorized(String),

    #[display(fmt = "Invalid date {:?}, expected YYYY-MM-DD", _0)]
    InvalidDate(String),

    #[display(fmt = "dateFrom {} is after dateTo {}", from, to)]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[display(fmt = "Bad request: {}", _0)]
    BadRequest(String),

    /// Joined data that breaks a display precondition, e.g. a worker without shifts.
    #[display(fmt = "Attendance {} has inconsistent related data: {}", record_id, reason)]
    DataIntegrity { record_id: u64, reason: String },

    /// The inner message is logged, never sent to the client.
    #[display(fmt = "Record store unavailable")]
    StoreUnavailable(String),

    #[display(fmt = "Failed to render page")]
    Render(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidDate(_) => "INVALID_DATE",
            AppError::InvalidRange { .. } => "INVALID_RANGE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::DataIntegrity { .. } => "DATA_INTEGRITY",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Render(_) => "RENDER_FAILED",
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidDate(_) | AppError::InvalidRange { .. } | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::DataIntegrity { .. } | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreUnavailable(e.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        AppError::Render(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_and_code() {
        let err = AppError::DataIntegrity {
            record_id: 3,
            reason: "worker has no shift".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "DATA_INTEGRITY");

        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Record store unavailable");

        let err = AppError::InvalidRange {
            from: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "dateFrom 2024-02-01 is after dateTo 2024-01-01");
    }
}
