use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for the sibyl service
#[derive(Debug, thiserror::Error)]
pub enum SibylError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timeout")]
    RequestTimeout,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(String),
}

/// Standard error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl SibylError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            #[cfg(feature = "database")]
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Returns a message safe for client responses.
    ///
    /// Client errors (4xx) expose their message; server errors (5xx) show a
    /// generic message and keep details in the server-side log (CWE-209).
    fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::RequestTimeout => "Request timeout".to_string(),

            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),

            #[cfg(feature = "database")]
            Self::Database(_) => "Database error".to_string(),
        }
    }
}

impl IntoResponse for SibylError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full error details stay server-side
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias for sibyl handlers
pub type Result<T> = std::result::Result<T, SibylError>;

// Common error type conversions

impl From<serde_json::Error> for SibylError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SibylError::BadRequest(format!("JSON error: {}", err))
        } else {
            SibylError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<reqwest::Error> for SibylError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SibylError::RequestTimeout
        } else if err.is_connect() {
            SibylError::ServiceUnavailable(format!("Connection error: {}", err))
        } else if err.is_status() {
            match err.status().map(|s| s.as_u16()) {
                Some(404) => SibylError::NotFound("Upstream resource not found".to_string()),
                Some(503) => {
                    SibylError::ServiceUnavailable("Upstream service unavailable".to_string())
                }
                _ => SibylError::Internal(format!("Upstream error: {}", err)),
            }
        } else {
            SibylError::Internal(format!("Request error: {}", err))
        }
    }
}

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for SibylError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => SibylError::NotFound(if msg.is_empty() {
                "Record not found".to_string()
            } else {
                msg.clone()
            }),
            sea_orm::DbErr::Conn(inner) => {
                SibylError::Database(format!("Connection error: {}", inner))
            }
            sea_orm::DbErr::Query(inner) => SibylError::Database(format!("Query error: {}", inner)),
            sea_orm::DbErr::Exec(inner) => {
                SibylError::Database(format!("Execution error: {}", inner))
            }
            _ => SibylError::Database(format!("Database error: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = SibylError::not_found("Oracle not found");
        assert!(matches!(err, SibylError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Oracle not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_error() {
        let err = SibylError::bad_request("Invalid payload");
        assert_eq!(err.to_string(), "Bad request: Invalid payload");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_status() {
        let err = SibylError::internal("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_safe_message_client_errors_exposed() {
        assert_eq!(
            SibylError::bad_request("Invalid signature").safe_message(),
            "Bad request: Invalid signature"
        );
        assert_eq!(
            SibylError::not_found("acct_x").safe_message(),
            "Not found: acct_x"
        );
    }

    #[test]
    fn test_safe_message_server_errors_hidden() {
        assert_eq!(
            SibylError::internal("db password is 'secret123'").safe_message(),
            "Internal server error"
        );
        assert_eq!(
            SibylError::service_unavailable("redis at cache.internal:6379 down").safe_message(),
            "Service unavailable"
        );
    }

    #[test]
    fn test_from_serde_json_syntax_error() {
        let result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ invalid json }");
        let err: SibylError = result.unwrap_err().into();
        assert!(matches!(err, SibylError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_into_response_hides_internal_details() {
        let err = SibylError::internal("sensitive detail");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(json["error_id"].as_str().is_some());
    }
}
