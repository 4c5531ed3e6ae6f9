//! Thin HTTP adapters: query parameters and access headers in, the engine's
//! `{status, body}` envelope out verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::dispatch::EngineResponse;
use crate::security::AccessContext;
use crate::state::AppState;

pub const ROLE_HEADER: &str = "x-analytics-role";
pub const TENANTS_HEADER: &str = "x-analytics-tenants";
pub const DEFAULT_TENANT_HEADER: &str = "x-analytics-default-tenant";

fn access_from_headers(headers: &HeaderMap) -> AccessContext {
    let signal = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    AccessContext::resolve(
        signal(ROLE_HEADER),
        signal(TENANTS_HEADER),
        signal(DEFAULT_TENANT_HEADER),
    )
}

fn to_http(response: EngineResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let access = access_from_headers(&headers);
    to_http(state.dispatcher.dispatch(&endpoint, &params, access).await)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    to_http(state.dispatcher.health())
}

pub async fn refresh(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let access = access_from_headers(&headers);
    to_http(state.dispatcher.refresh(&access))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Role;

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn headers_resolve_into_an_access_context() {
        let access = access_from_headers(&headers(&[
            (ROLE_HEADER, "operador"),
            (TENANTS_HEADER, "muni-centro,pyme-tienda"),
            (DEFAULT_TENANT_HEADER, "pyme-tienda"),
        ]));
        assert_eq!(access.role, Role::Operador);
        assert_eq!(access.allowed_tenants, vec!["muni-centro", "pyme-tienda"]);
        assert_eq!(access.default_tenant.as_deref(), Some("pyme-tienda"));
    }

    #[test]
    fn missing_headers_fall_back_to_the_most_restrictive_identity() {
        let access = access_from_headers(&HeaderMap::new());
        assert_eq!(access.role, Role::Visor);
        assert!(access.allowed_tenants.is_empty());
        assert!(access.default_tenant.is_none());
    }
}
