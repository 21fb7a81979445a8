use http::{header, HeaderMap, Method};
use serde_json::Value as JsonValue;

use crate::core::{ApiError, ApiResult};

/// A fully read HTTP request, detached from the network session.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_json(mut self, body: &JsonValue) -> Self {
        self.body = body.to_string().into_bytes();
        self.with_header(header::CONTENT_TYPE, "application/json")
    }

    /// Token from `Authorization: Bearer <token>`, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.strip_prefix("Bearer ")
                    .or_else(|| v.strip_prefix("bearer "))
            })
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Decoded value of query parameter `name` (first occurrence).
    pub fn query_value(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Procedure input: the `input` query parameter for GET, the body otherwise.
    ///
    /// Absent input and an explicit JSON `null` both yield `None`.
    pub fn rpc_input(&self) -> ApiResult<Option<JsonValue>> {
        let raw = if self.method == Method::GET {
            match self.query_value("input") {
                Some(raw) => raw.into_bytes(),
                None => return Ok(None),
            }
        } else {
            self.body.clone()
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let value: JsonValue = serde_json::from_slice(&raw)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

/// Deserializes a required procedure input.
pub fn parse_input<T: serde::de::DeserializeOwned>(input: Option<JsonValue>) -> ApiResult<T> {
    let value = input.ok_or_else(|| ApiError::validation("input is required"))?;
    serde_json::from_value(value).map_err(|e| ApiError::validation(e.to_string()))
}

/// Deserializes an optional procedure input.
pub fn parse_optional_input<T: serde::de::DeserializeOwned>(
    input: Option<JsonValue>,
) -> ApiResult<Option<T>> {
    input.map(|v| parse_input(Some(v))).transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_split_uri() {
        let req = ApiRequest::new(Method::GET, "/api/trpc/consultations.list?input=%7B%7D");
        assert_eq!(req.path, "/api/trpc/consultations.list");
        assert_eq!(req.query.as_deref(), Some("input=%7B%7D"));
    }

    #[test]
    fn test_get_input_is_url_decoded() {
        let req = ApiRequest::new(
            Method::GET,
            "/api/trpc/consultations.list?batch=1&input=%7B%22clientId%22%3A%22c1%22%7D",
        );
        assert_eq!(req.rpc_input().unwrap(), Some(json!({ "clientId": "c1" })));
    }

    #[test]
    fn test_missing_and_null_input() {
        let req = ApiRequest::new(Method::GET, "/api/trpc/consultations.list");
        assert_eq!(req.rpc_input().unwrap(), None);

        let req = ApiRequest::new(Method::POST, "/api/trpc/auth.logout").with_json(&json!(null));
        assert_eq!(req.rpc_input().unwrap(), None);
    }

    #[test]
    fn test_malformed_body() {
        let mut req = ApiRequest::new(Method::POST, "/api/trpc/consultations.create");
        req.body = b"{not json".to_vec();
        assert!(matches!(req.rpc_input(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_bearer_token() {
        let req = ApiRequest::new(Method::GET, "/")
            .with_header(header::AUTHORIZATION, "Bearer abc-123");
        assert_eq!(req.bearer_token(), Some("abc-123"));

        let req = ApiRequest::new(Method::GET, "/").with_header(header::AUTHORIZATION, "Basic xyz");
        assert_eq!(req.bearer_token(), None);
    }

    #[test]
    fn test_parse_input_missing_field() {
        #[derive(serde::Deserialize, Debug)]
        struct Input {
            #[allow(dead_code)]
            id: String,
        }
        let err = parse_input::<Input>(Some(json!({}))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = parse_input::<Input>(None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
