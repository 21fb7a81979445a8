//! RPC procedures exposed under `/api/trpc/{procedure}`.

use std::collections::HashMap;

use serde_json::{json, Value as JsonValue};

use super::{
    request::{parse_input, parse_optional_input, ApiRequest},
    AppState,
};
use crate::{
    auth::{Caller, LoginInput, RegisterInput},
    consultation::{ListFilter, NewConsultation, StatusUpdate},
    core::{ApiError, ApiResult},
};

/// Queries are served over GET, mutations over POST.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

pub trait Procedure: Send + Sync {
    fn kind(&self) -> ProcedureKind;

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue>;
}

pub fn registry() -> HashMap<&'static str, Box<dyn Procedure>> {
    let mut procedures: HashMap<&'static str, Box<dyn Procedure>> = HashMap::new();
    procedures.insert("consultations.create", Box::new(CreateConsultation));
    procedures.insert("consultations.list", Box::new(ListConsultations));
    procedures.insert("consultations.updateStatus", Box::new(UpdateConsultationStatus));
    procedures.insert("consultations.stats", Box::new(ConsultationStats));
    procedures.insert("auth.login", Box::new(Login));
    procedures.insert("auth.register", Box::new(Register));
    procedures.insert("auth.logout", Box::new(Logout));
    procedures.insert("auth.me", Box::new(Me));
    procedures
}

fn caller(state: &AppState, req: &ApiRequest) -> ApiResult<Caller> {
    let token = req
        .bearer_token()
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    state.users.authenticate(token)
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Narrows a list filter to what `caller` may see.
///
/// Clients only ever see their own records; asking for anyone else's is
/// rejected rather than silently rewritten.
pub fn scope_filter(caller: &Caller, filter: Option<ListFilter>) -> ApiResult<ListFilter> {
    let mut filter = filter.unwrap_or_default();
    if caller.is_admin() {
        return Ok(filter);
    }
    match filter.client() {
        Some(id) if id != caller.id => Err(ApiError::forbidden(
            "clients may only list their own consultations",
        )),
        _ => {
            filter.client_id = Some(caller.id.clone());
            Ok(filter)
        }
    }
}

struct CreateConsultation;

impl Procedure for CreateConsultation {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        let caller = caller(state, req)?;
        let input: NewConsultation = parse_input(input)?;
        if !caller.is_admin() && input.client_id != caller.id {
            return Err(ApiError::forbidden(
                "clients may only submit consultations for themselves",
            ));
        }
        to_json(&state.consultations.create(input)?)
    }
}

struct ListConsultations;

impl Procedure for ListConsultations {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Query
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        let caller = caller(state, req)?;
        let filter = scope_filter(&caller, parse_optional_input(input)?)?;
        to_json(&state.consultations.list(&filter))
    }
}

struct UpdateConsultationStatus;

impl Procedure for UpdateConsultationStatus {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        caller(state, req)?.require_admin()?;
        let update: StatusUpdate = parse_input(input)?;
        to_json(&state.consultations.update_status(update)?)
    }
}

struct ConsultationStats;

impl Procedure for ConsultationStats {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Query
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        _input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        caller(state, req)?.require_admin()?;
        to_json(&state.consultations.stats())
    }
}

struct Login;

impl Procedure for Login {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    fn call(
        &self,
        state: &AppState,
        _req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        let input: LoginInput = parse_input(input)?;
        to_json(&state.users.login(input)?)
    }
}

struct Register;

impl Procedure for Register {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    fn call(
        &self,
        state: &AppState,
        _req: &ApiRequest,
        input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        let input: RegisterInput = parse_input(input)?;
        to_json(&state.users.register(input)?)
    }
}

struct Logout;

impl Procedure for Logout {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        _input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        if let Some(token) = req.bearer_token() {
            state.users.logout(token);
        }
        Ok(json!({ "success": true }))
    }
}

struct Me;

impl Procedure for Me {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Query
    }

    fn call(
        &self,
        state: &AppState,
        req: &ApiRequest,
        _input: Option<JsonValue>,
    ) -> ApiResult<JsonValue> {
        let caller = caller(state, req)?;
        let user = state
            .users
            .find_by_id(&caller.id)
            .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))?;
        to_json(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consultation::ConsultationStatus;

    #[test]
    fn test_scope_filter_client_defaults_to_self() {
        let filter = scope_filter(&Caller::client("1"), None).unwrap();
        assert_eq!(filter.client_id.as_deref(), Some("1"));

        let filter = scope_filter(
            &Caller::client("1"),
            Some(ListFilter {
                client_id: None,
                status: Some(ConsultationStatus::Pending),
            }),
        )
        .unwrap();
        assert_eq!(filter.client_id.as_deref(), Some("1"));
        assert_eq!(filter.status, Some(ConsultationStatus::Pending));
    }

    #[test]
    fn test_scope_filter_client_cannot_peek() {
        let err = scope_filter(
            &Caller::client("1"),
            Some(ListFilter {
                client_id: Some("2".into()),
                status: None,
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_scope_filter_client_blank_id_means_self() {
        let filter = scope_filter(
            &Caller::client("1"),
            Some(ListFilter {
                client_id: Some(String::new()),
                status: None,
            }),
        )
        .unwrap();
        assert_eq!(filter.client_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_scope_filter_admin_passthrough() {
        assert_eq!(
            scope_filter(&Caller::admin("2"), None).unwrap(),
            ListFilter::default()
        );
    }

    #[test]
    fn test_registry_kinds() {
        let procedures = registry();
        assert_eq!(procedures.len(), 8);
        assert_eq!(
            procedures["consultations.list"].kind(),
            ProcedureKind::Query
        );
        assert_eq!(
            procedures["consultations.updateStatus"].kind(),
            ProcedureKind::Mutation
        );
    }
}
