//! Unified error handling for consultd
//!
//! Every layer (creation, lifecycle, auth, the RPC boundary) reports failures
//! through [`ApiError`], which also knows how it is rendered on the wire.

use std::fmt;

use http::StatusCode;
use validator::ValidationErrors;

/// Unified error types for the consultation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or missing required input field
    Validation(String),

    /// Referenced record does not exist
    NotFound(String),

    /// Requested status change is not in the transition table
    InvalidTransition(String),

    /// Caller could not be identified
    Unauthorized(String),

    /// Caller is known but not allowed to perform the operation
    Forbidden(String),

    /// Request could not be decoded at all
    BadRequest(String),

    /// Internal system errors
    Internal(String),
}

impl ApiError {
    /// Wire-level error code, as carried in the RPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidTransition(_) => "CONFLICT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The bare message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::InvalidTransition(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation error: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Resource not found: {msg}"),
            ApiError::InvalidTransition(msg) => write!(f, "Invalid transition: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

// Error conversions
impl From<ValidationErrors> for ApiError {
    fn from(errs: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errs
            .field_errors()
            .keys()
            .map(|k| camel_case(k.as_ref()))
            .collect();
        fields.sort_unstable();
        if fields.is_empty() {
            ApiError::Validation(errs.to_string())
        } else {
            ApiError::Validation(format!("invalid or missing field(s): {}", fields.join(", ")))
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON input: {err}"))
    }
}

// Wire inputs are camelCase while validator reports Rust field names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Result type alias for service operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;
