//! HTTP surface of consultd.
//!
//! [`ApiHttpApp::dispatch`] does all the work on an already-read
//! [`ApiRequest`]; the [`ServeHttp`] impl only moves bytes in and out of the
//! pingora session.

pub mod procedures;
pub mod request;
pub mod response;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use http::{header, HeaderValue, Method, Response, StatusCode};
use matchit::{Match, Router};
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};
use serde_json::json;

use crate::{auth::UserDirectory, config, consultation::ConsultationService};
use procedures::{Procedure, ProcedureKind};
pub use request::ApiRequest;
use response::ResponseBuilder;

const RPC_PREFIX: &str = "/api/trpc/";

/// Shared state behind every request.
pub struct AppState {
    pub consultations: ConsultationService,
    pub users: UserDirectory,
}

impl AppState {
    pub fn new(users: UserDirectory) -> Self {
        Self {
            consultations: ConsultationService::new(),
            users,
        }
    }
}

trait Handler {
    fn handle(
        &self,
        app: &ApiHttpApp,
        req: &ApiRequest,
        params: &BTreeMap<String, String>,
    ) -> Response<Vec<u8>>;
}

pub struct ApiHttpApp {
    state: AppState,
    router: Router<HashMap<Method, Box<dyn Handler + Send + Sync>>>,
    procedures: HashMap<&'static str, Box<dyn Procedure>>,
    config: config::Api,
}

impl ApiHttpApp {
    pub fn new(cfg: &config::Config) -> Self {
        Self::with_state(
            cfg.api.clone(),
            AppState::new(UserDirectory::new(cfg.users.clone())),
        )
    }

    pub fn with_state(config: config::Api, state: AppState) -> Self {
        let mut this = Self {
            state,
            router: Router::new(),
            procedures: procedures::registry(),
            config,
        };

        this.route("/", Method::GET, Box::new(RootHandler))
            .route("/api/health", Method::GET, Box::new(HealthHandler))
            .route("/api/trpc/{procedure}", Method::GET, Box::new(RpcHandler))
            .route("/api/trpc/{procedure}", Method::POST, Box::new(RpcHandler));

        this
    }

    fn route(
        &mut self,
        path: &str,
        method: Method,
        handler: Box<dyn Handler + Send + Sync>,
    ) -> &mut Self {
        if self.router.at(path).is_err() {
            let mut handlers = HashMap::new();
            handlers.insert(method, handler);
            if let Err(e) = self.router.insert(path, handlers) {
                log::error!("Failed to register route {path}: {e}");
            }
        } else if let Ok(routes) = self.router.at_mut(path) {
            routes.value.insert(method, handler);
        }
        self
    }

    pub fn api_http_service(cfg: &config::Config) -> Service<Self> {
        let app = Self::new(cfg);
        let addr = app.config.address.to_string();
        let mut service = Service::new("Consultation API HTTP".to_string(), app);
        service.add_tcp(&addr);
        service
    }

    pub fn dispatch(&self, req: &ApiRequest) -> Response<Vec<u8>> {
        let mut resp = self.route_request(req);
        if self.config.cors {
            resp.headers_mut().insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        }
        log::debug!("{} {} -> {}", req.method, req.path, resp.status());
        resp
    }

    fn route_request(&self, req: &ApiRequest) -> Response<Vec<u8>> {
        if req.method == Method::OPTIONS && self.config.cors {
            return preflight_response();
        }

        if req.body.len() > self.config.max_body_size {
            return ResponseBuilder::text(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
        }

        match self.router.at(&req.path) {
            Ok(Match { value, params }) => match value.get(&req.method) {
                Some(handler) => {
                    let params: BTreeMap<String, String> = params
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    handler.handle(self, req, &params)
                }
                None => ResponseBuilder::empty(StatusCode::METHOD_NOT_ALLOWED),
            },
            Err(_) => {
                log::warn!("404 Not Found: {}", req.path);
                ResponseBuilder::not_found(&req.path)
            }
        }
    }
}

#[async_trait]
impl ServeHttp for ApiHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        http_session.set_keepalive(None);

        let (method, uri, headers) = {
            let req_header = http_session.req_header();
            (
                req_header.method.clone(),
                req_header.uri.to_string(),
                req_header.headers.clone(),
            )
        };

        let mut req = ApiRequest::new(method, &uri);
        req.headers = headers;

        match read_request_body(http_session, self.config.max_body_size).await {
            Ok(Some(body)) => req.body = body,
            Ok(None) => {
                return ResponseBuilder::text(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            Err(e) => {
                log::warn!("Failed to read request body: {e}");
                return ResponseBuilder::text(StatusCode::BAD_REQUEST, "Unreadable request body");
            }
        }

        self.dispatch(&req)
    }
}

/// Reads the whole body, or `None` once it grows past `limit`.
async fn read_request_body(
    http_session: &mut ServerSession,
    limit: usize,
) -> pingora_error::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    while let Some(bytes) = http_session.read_request_body().await? {
        if body.len() + bytes.len() > limit {
            return Ok(None);
        }
        body.extend_from_slice(&bytes);
    }
    Ok(Some(body))
}

fn preflight_response() -> Response<Vec<u8>> {
    let mut resp = ResponseBuilder::empty(StatusCode::NO_CONTENT);
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    resp
}

struct RootHandler;

impl Handler for RootHandler {
    fn handle(
        &self,
        _app: &ApiHttpApp,
        _req: &ApiRequest,
        _params: &BTreeMap<String, String>,
    ) -> Response<Vec<u8>> {
        ResponseBuilder::json(
            StatusCode::OK,
            &json!({ "status": "ok", "message": "API is running" }),
        )
    }
}

struct HealthHandler;

impl Handler for HealthHandler {
    fn handle(
        &self,
        _app: &ApiHttpApp,
        _req: &ApiRequest,
        _params: &BTreeMap<String, String>,
    ) -> Response<Vec<u8>> {
        ResponseBuilder::json(
            StatusCode::OK,
            &json!({
                "status": "healthy",
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        )
    }
}

struct RpcHandler;

impl Handler for RpcHandler {
    fn handle(
        &self,
        app: &ApiHttpApp,
        req: &ApiRequest,
        params: &BTreeMap<String, String>,
    ) -> Response<Vec<u8>> {
        let name = params
            .get("procedure")
            .map(String::as_str)
            .unwrap_or_else(|| req.path.trim_start_matches(RPC_PREFIX));

        let Some(procedure) = app.procedures.get(name) else {
            return ResponseBuilder::rpc_error_with(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("No procedure found on path \"{name}\""),
                name,
            );
        };

        let expected = match procedure.kind() {
            ProcedureKind::Query => Method::GET,
            ProcedureKind::Mutation => Method::POST,
        };
        if req.method != expected {
            return ResponseBuilder::rpc_error_with(
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_SUPPORTED",
                &format!("Unsupported {} for procedure {name}", req.method),
                name,
            );
        }

        match req
            .rpc_input()
            .and_then(|input| procedure.call(&app.state, req, input))
        {
            Ok(data) => ResponseBuilder::rpc_success(&data),
            Err(e) => {
                log::warn!("RPC error on '{name}': {e}");
                ResponseBuilder::rpc_error(name, &e)
            }
        }
    }
}
