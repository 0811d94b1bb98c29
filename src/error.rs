//! Unified error types for the GA4 Report MCP Server.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Token request failed with status {status}: {body}")]
    TokenRequestFailed { status: StatusCode, body: String },

    #[error("Token parse error: {0}")]
    TokenParse(String),

    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Failed to create HTTP client: {0}")]
    HttpClientInit(String),
}

/// Caller-side mistakes in a report request. Never sent to the backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one dimension is required")]
    EmptyDimensions,

    #[error("At least one metric is required")]
    EmptyMetrics,

    #[error("Blank {0} name")]
    BlankName(&'static str),

    #[error("Duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date '{0}': expected YYYY-MM-DD, today, yesterday or NdaysAgo")]
    InvalidDate(String),

    #[error("Filter condition has a blank field name")]
    BlankFilterField,

    #[error("Filter on '{0}' has a blank value")]
    BlankFilterValue(String),

    #[error("Filter group has no expressions")]
    EmptyFilterGroup,
}

/// Report backend request/response errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication error: {0}")]
    Auth(#[source] AuthError),

    #[error("HTTP request error: {0}")]
    Request(reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Analytics API error [{code}]: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// A timed out token request is reported like any other timed out call.
impl From<AuthError> for ClientError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Timeout(after) => ClientError::Timeout(after),
            other => ClientError::Auth(other),
        }
    }
}

/// Anything the report pipeline can fail with.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_missing_field_display() {
        let error = ConfigError::MissingField("property_id".to_string());
        assert_eq!(error.to_string(), "Missing required field: property_id");
    }

    #[test]
    fn test_config_error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(config_err.to_string().contains("IO error"));
    }

    #[test]
    fn test_auth_error_token_request_failed_display() {
        let error = AuthError::TokenRequestFailed {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid_grant".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("401"));
        assert!(display.contains("invalid_grant"));
    }

    #[test]
    fn test_validation_error_inverted_range_display() {
        let error = ValidationError::InvertedDateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            error.to_string(),
            "Start date 2024-01-07 is after end date 2024-01-01"
        );
    }

    #[test]
    fn test_validation_error_duplicate_display() {
        let error = ValidationError::DuplicateName {
            kind: "metric",
            name: "sessions".to_string(),
        };
        assert_eq!(error.to_string(), "Duplicate metric 'sessions'");
    }

    #[test]
    fn test_client_error_api_display() {
        let error = ClientError::Api {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_ARGUMENT".to_string(),
            message: "Field pagePathh is not a valid dimension.".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("INVALID_ARGUMENT"));
        assert!(display.contains("pagePathh"));
    }

    #[test]
    fn test_client_error_timeout_display() {
        let error = ClientError::Timeout(Duration::from_secs(120));
        assert_eq!(error.to_string(), "Request timed out after 120s");
    }

    #[test]
    fn test_client_error_from_auth_error() {
        let auth_error = AuthError::TokenParse("missing access_token".to_string());
        let client_error: ClientError = auth_error.into();
        assert!(client_error.to_string().contains("Authentication error"));
    }

    #[test]
    fn test_auth_timeout_becomes_client_timeout() {
        let client_error: ClientError = AuthError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(client_error, ClientError::Timeout(after) if after == Duration::from_secs(5)));
        assert_eq!(client_error.to_string(), "Request timed out after 5s");
    }

    #[test]
    fn test_report_error_keeps_client_message() {
        let error: ReportError = ClientError::MalformedResponse("no headers".to_string()).into();
        assert_eq!(error.to_string(), "Malformed response: no headers");
    }

    #[test]
    fn test_report_error_validation_prefix() {
        let error: ReportError = ValidationError::EmptyMetrics.into();
        assert_eq!(
            error.to_string(),
            "Invalid report request: At least one metric is required"
        );
    }

    #[test]
    fn test_client_error_debug_format() {
        let error = ClientError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "backend unavailable".to_string(),
        };
        let debug = format!("{:?}", error);
        assert!(debug.contains("Http"));
        assert!(debug.contains("backend unavailable"));
    }
}
