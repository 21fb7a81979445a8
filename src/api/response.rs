//! Response building for the HTTP surface.
//!
//! RPC results use a tRPC-compatible envelope: `{"result":{"data":..}}` on
//! success and `{"error":{message,code,httpStatus,path}}` on failure.

use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::core::ApiError;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Serializes `body` as JSON with the given status.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Vec<u8>> {
        match serde_json::to_vec(body) {
            Ok(bytes) => Response::builder()
                .status(status)
                .header(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(content_type::APPLICATION_JSON),
                )
                .body(bytes)
                .unwrap_or_else(|e| {
                    log::error!("Failed to build JSON response: {e}");
                    Self::internal_error()
                }),
            Err(e) => {
                log::error!("Failed to serialize JSON response: {e}");
                Self::internal_error()
            }
        }
    }

    pub fn rpc_success<T: Serialize>(data: &T) -> Response<Vec<u8>> {
        Self::json(StatusCode::OK, &json!({ "result": { "data": data } }))
    }

    pub fn rpc_error(path: &str, err: &ApiError) -> Response<Vec<u8>> {
        Self::rpc_error_with(err.status_code(), err.code(), err.message(), path)
    }

    pub fn rpc_error_with(
        status: StatusCode,
        code: &str,
        message: &str,
        path: &str,
    ) -> Response<Vec<u8>> {
        Self::json(
            status,
            &json!({
                "error": {
                    "message": message,
                    "code": code,
                    "httpStatus": status.as_u16(),
                    "path": path,
                }
            }),
        )
    }

    pub fn not_found(path: &str) -> Response<Vec<u8>> {
        Self::json(
            StatusCode::NOT_FOUND,
            &json!({ "error": "Not Found", "path": path }),
        )
    }

    pub fn empty(status: StatusCode) -> Response<Vec<u8>> {
        Response::builder()
            .status(status)
            .body(Vec::new())
            .unwrap_or_else(|e| {
                log::error!("Failed to build empty response: {e}");
                Self::internal_error()
            })
    }

    pub fn text(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, content_type::TEXT_PLAIN)
            .body(message.as_bytes().to_vec())
            .unwrap_or_else(|e| {
                log::error!("Failed to build text response: {e}");
                Self::internal_error()
            })
    }

    fn internal_error() -> Response<Vec<u8>> {
        let mut resp = Response::new(b"Internal Server Error".to_vec());
        *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        resp
    }
}
