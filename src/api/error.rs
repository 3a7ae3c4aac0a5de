//! Structured API error responses with error codes
//!
//! This module provides consistent error handling across all API endpoints
//! with machine-readable error codes and human-readable messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::RegistryError;

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Document hash is not a 32-byte hex value
    InvalidFingerprint,

    // Resource errors (4xxx)
    /// Contract row not found in the store
    ContractNotFound,
    /// Fingerprint has no registration record on the ledger
    NotRegistered,

    // Conflict errors (5xxx)
    /// Fingerprint already has a registration record
    AlreadyRegistered,
    /// Contract is already marked verified; no new transaction was sent
    AlreadyVerified,

    // Infrastructure errors (8xxx)
    /// Internal server error
    InternalError,

    // Registry errors (9xxx)
    /// Registry client running in disconnected mode
    RegistryNotConnected,
    /// Transaction confirmation not observed in time
    ConfirmationTimeout,
    /// Ledger transport failure
    NetworkError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Validation (3xxx)
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFingerprint => 3002,

            // Resource (4xxx)
            ErrorCode::ContractNotFound => 4001,
            ErrorCode::NotRegistered => 4002,

            // Conflict (5xxx)
            ErrorCode::AlreadyRegistered => 5001,
            ErrorCode::AlreadyVerified => 5002,

            // Infrastructure (8xxx)
            ErrorCode::InternalError => 8999,

            // Registry (9xxx)
            ErrorCode::RegistryNotConnected => 9001,
            ErrorCode::ConfirmationTimeout => 9002,
            ErrorCode::NetworkError => 9003,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Validation -> 400
            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidFingerprint => StatusCode::BAD_REQUEST,

            // Resource -> 404
            ErrorCode::ContractNotFound => StatusCode::NOT_FOUND,
            ErrorCode::NotRegistered => StatusCode::NOT_FOUND,

            // Conflict -> 409, except AlreadyVerified which callers treat
            // as a plain bad request carrying the cached metadata
            ErrorCode::AlreadyRegistered => StatusCode::CONFLICT,
            ErrorCode::AlreadyVerified => StatusCode::BAD_REQUEST,

            // Infrastructure -> 500
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            // Registry -> 502/503/504
            ErrorCode::RegistryNotConnected => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ConfirmationTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::NetworkError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFingerprint => "INVALID_FINGERPRINT",
            ErrorCode::ContractNotFound => "CONTRACT_NOT_FOUND",
            ErrorCode::NotRegistered => "NOT_REGISTERED",
            ErrorCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorCode::AlreadyVerified => "ALREADY_VERIFIED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::RegistryNotConnected => "REGISTRY_NOT_CONNECTED",
            ErrorCode::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Set related resource ID
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRegistered(fp) => ApiError::new(
                ErrorCode::AlreadyRegistered,
                format!("Document already registered: {}", fp),
            )
            .with_resource_id(fp.to_hex()),
            RegistryError::NotRegistered(fp) => ApiError::new(
                ErrorCode::NotRegistered,
                format!("Document not registered: {}", fp),
            )
            .with_resource_id(fp.to_hex()),
            RegistryError::NotConnected => ApiError::new(
                ErrorCode::RegistryNotConnected,
                "Blockchain registry is not configured",
            ),
            RegistryError::ConfirmationTimeout { waited } => ApiError::new(
                ErrorCode::ConfirmationTimeout,
                format!("Transaction confirmation not observed within {waited:?}"),
            ),
            RegistryError::Network(msg) => {
                ApiError::new(ErrorCode::NetworkError, format!("Network error: {}", msg))
            }
            RegistryError::InvalidFingerprint(msg) => ApiError::new(
                ErrorCode::InvalidFingerprint,
                format!("Invalid document hash: {}", msg),
            ),
            RegistryError::ContractNotFound(id) => {
                ApiError::new(ErrorCode::ContractNotFound, format!("Contract not found: {}", id))
                    .with_resource_id(id)
            }
            RegistryError::Io(e) => {
                ApiError::new(ErrorCode::InternalError, format!("Document read failed: {}", e))
            }
            RegistryError::Configuration(msg) => {
                ApiError::new(ErrorCode::InternalError, format!("Configuration error: {}", msg))
            }
            RegistryError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}
