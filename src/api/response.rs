//! Response envelope helpers shared by every handler.

use axum::http::StatusCode;
use axum::Json;

use crate::models::{AdmissionError, ApiResponse};

/// Error codes raised by the HTTP layer itself; everything the core
/// raises carries its own code (`AdmissionError::error_code`).
pub mod error_codes {
    pub const INVALID_MISSION_ID: &str = "INVALID_MISSION_ID";
    pub const INVALID_STATUS: &str = "INVALID_STATUS";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
}

/// Create success response
pub fn success_response<T>(data: T) -> ApiResponse<Option<T>> {
    ApiResponse::success(Some(data))
}

/// Create error response
pub fn error_response<T>(code: &str, message: String) -> ApiResponse<Option<T>> {
    ApiResponse::error(-1, format!("{}: {}", code, message), None)
}

/// Map a core error onto the wire: error envelope plus HTTP status.
pub fn reject<T>(err: &AdmissionError) -> (StatusCode, Json<ApiResponse<Option<T>>>) {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error_response(err.error_code(), err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissionId;

    #[test]
    fn test_success_response() {
        let response = success_response("payload");
        assert_eq!(response.status, 0);
        assert_eq!(response.msg, "ok");
        assert!(response.data.is_some());
    }

    #[test]
    fn test_error_response() {
        let response: ApiResponse<Option<()>> = error_response(
            error_codes::INVALID_MISSION_ID,
            "not a number".to_string(),
        );
        assert_eq!(response.status, -1);
        assert_eq!(response.msg, "INVALID_MISSION_ID: not a number");
        assert!(response.data.is_none());
    }

    #[test]
    fn test_reject_maps_status_and_code() {
        let err = AdmissionError::InsufficientCredits {
            balance: 5,
            required: 11,
        };
        let (status, Json(body)): (_, Json<ApiResponse<Option<()>>>) = reject(&err);

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body.status, -1);
        assert_eq!(
            body.msg,
            "INSUFFICIENT_CREDITS: insufficient credits: have 5, need 11"
        );
    }

    #[test]
    fn test_reject_not_found() {
        let err = AdmissionError::MissionNotFound(MissionId::new(9));
        let (status, Json(body)): (_, Json<ApiResponse<Option<()>>>) = reject(&err);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.msg.starts_with("MISSION_NOT_FOUND:"));
    }
}
