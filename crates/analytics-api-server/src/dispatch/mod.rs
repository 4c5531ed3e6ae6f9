//! Routes a logical endpoint name to its resolver, enforcing the full
//! request pipeline: filter validation, role and tenant authorization, cache
//! lookup, bounded resolver execution, cache population.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::cache::ResponseCache;
use crate::dataset::store::DatasetStore;
use crate::resolvers::{self, ResolverContext};
use crate::security::{AccessContext, Role};
use crate::utils::{EngineError, Limiters};

type Resolver = fn(&ResolverContext) -> Result<Value, EngineError>;

struct Endpoint {
    required_role: Role,
    resolver: Resolver,
}

/// Status plus JSON body, ready to hand back verbatim at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub body: Value,
}

impl EngineResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn from_error(err: &EngineError) -> Self {
        // Internal errors are logged with endpoint context at the call site.
        let error_type = match err {
            EngineError::Validation(msg) => {
                warn!("validation rejected: {msg}");
                "ValidationError"
            }
            EngineError::Role(msg) => {
                warn!("authorization rejected (role): {msg}");
                "AuthorizationError"
            }
            EngineError::Tenant(msg) => {
                warn!("authorization rejected (tenant): {msg}");
                "AuthorizationError"
            }
            EngineError::Internal(_) => "InternalError",
        };
        Self {
            status: err.status().as_u16(),
            body: json!({ "error": error_type, "message": err.public_message() }),
        }
    }
}

pub struct Dispatcher {
    store: Arc<DatasetStore>,
    cache: Arc<ResponseCache>,
    limiters: Limiters,
    slow_threshold: Duration,
    registry: HashMap<&'static str, Endpoint>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<DatasetStore>,
        cache: Arc<ResponseCache>,
        limiters: Limiters,
        slow_threshold: Duration,
    ) -> Self {
        let mut dispatcher = Self {
            store,
            cache,
            limiters,
            slow_threshold,
            registry: HashMap::new(),
        };
        dispatcher.register("summary", Role::Visor, resolvers::summary);
        dispatcher.register("timeseries", Role::Visor, resolvers::timeseries);
        dispatcher.register("breakdown", Role::Visor, resolvers::breakdown_by_dimension);
        dispatcher.register("geo/heatmap", Role::Visor, resolvers::geo_heatmap);
        dispatcher.register("geo/points", Role::Visor, resolvers::geo_points);
        dispatcher.register("top", Role::Visor, resolvers::top);
        dispatcher.register("filters", Role::Visor, resolvers::filter_catalog);
        dispatcher.register("operations", Role::Operador, resolvers::operations);
        dispatcher.register("cohorts", Role::Operador, resolvers::cohort_retention);
        dispatcher.register("whatsapp/templates", Role::Operador, resolvers::templates);
        dispatcher
    }

    fn register(&mut self, endpoint: &'static str, required_role: Role, resolver: Resolver) {
        self.registry.insert(
            endpoint,
            Endpoint {
                required_role,
                resolver,
            },
        );
    }

    pub async fn dispatch(
        &self,
        endpoint: &str,
        params: &HashMap<String, String>,
        access: AccessContext,
    ) -> EngineResponse {
        let started = Instant::now();
        let response = self.run(endpoint, params, access).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        if started.elapsed() > self.slow_threshold {
            warn!(endpoint, duration_ms, status = response.status, "slow dispatch");
        } else {
            info!(endpoint, duration_ms, status = response.status, "dispatch");
        }
        response
    }

    async fn run(
        &self,
        endpoint: &str,
        params: &HashMap<String, String>,
        access: AccessContext,
    ) -> EngineResponse {
        let Some(entry) = self.registry.get(endpoint) else {
            return EngineResponse {
                status: 404,
                body: json!({ "error": "NotFound", "message": format!("unknown endpoint {endpoint}") }),
            };
        };

        let filters = match crate::filters::FilterDescriptor::parse(params) {
            Ok(filters) => filters,
            Err(err) => return EngineResponse::from_error(&err),
        };

        if access.role < entry.required_role {
            return EngineResponse::from_error(&EngineError::Role(format!(
                "endpoint {endpoint} requires role {}",
                entry.required_role.as_str()
            )));
        }
        if !access.can_access_tenant(&filters.tenant_id) {
            return EngineResponse::from_error(&EngineError::Tenant(format!(
                "tenant {} is outside the caller's scope",
                filters.tenant_id
            )));
        }

        let key = ResponseCache::key(endpoint, &filters, access.role);
        if let Some(cached) = self.cache.get(&key) {
            info!(endpoint, cache_hit = true, "served from cache");
            return EngineResponse::ok(cached);
        }

        let permit = match self.limiters.acquire_query().await {
            Ok((permit, waited)) => {
                if !waited.is_zero() {
                    info!(endpoint, waited_ms = waited.as_millis() as u64, "query slot acquired");
                }
                permit
            }
            Err(err) => {
                error!(endpoint, error = %err, "query limiter saturated");
                return EngineResponse::from_error(&EngineError::Internal(err.to_string()));
            }
        };

        let ctx = ResolverContext {
            dataset: self.store.current(),
            filters,
            access,
            now: Utc::now(),
        };
        let resolver = entry.resolver;
        let budget = self.limiters.resolver_budget;
        let outcome = tokio::time::timeout(
            budget,
            tokio::task::spawn_blocking(move || resolver(&ctx)),
        )
        .await;
        drop(permit);

        let body = match outcome {
            Err(_) => {
                error!(endpoint, budget_ms = budget.as_millis() as u64, "resolver budget exceeded");
                return EngineResponse::from_error(&EngineError::Internal(
                    "resolver budget exceeded".into(),
                ));
            }
            Ok(Err(join_err)) => {
                error!(endpoint, error = %join_err, "resolver task failed");
                return EngineResponse::from_error(&EngineError::Internal(join_err.to_string()));
            }
            Ok(Ok(Err(err))) => {
                error!(endpoint, error = %err, "resolver error");
                return EngineResponse::from_error(&err);
            }
            Ok(Ok(Ok(body))) => body,
        };

        self.cache.put(key, body.clone());
        EngineResponse::ok(body)
    }

    /// Liveness payload. No filters, no role check.
    pub fn health(&self) -> EngineResponse {
        let dataset = self.store.current();
        EngineResponse::ok(json!({
            "generated_at": dataset.generated_at.to_rfc3339(),
            "totals": resolvers::dataset_totals(&dataset),
            "cache": self.cache.stats(),
        }))
    }

    /// Admin-only dataset regeneration. Invalidates the whole cache so no
    /// response computed from the old snapshot survives the swap.
    pub fn refresh(&self, access: &AccessContext) -> EngineResponse {
        if access.role < Role::Admin {
            return EngineResponse::from_error(&EngineError::Role(
                "dataset refresh requires role admin".into(),
            ));
        }
        match self.store.refresh() {
            Ok(dataset) => {
                self.cache.clear();
                EngineResponse::ok(json!({
                    "generated_at": dataset.generated_at.to_rfc3339(),
                    "totals": resolvers::dataset_totals(&dataset),
                }))
            }
            Err(err) => {
                error!(error = %err, "dataset refresh failed");
                EngineResponse::from_error(&EngineError::Internal(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::LimitsConfig;
    use crate::dataset::generator::GeneratorConfig;

    fn dispatcher() -> (Dispatcher, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            DatasetStore::load(
                dir.path().join("seed.json"),
                GeneratorConfig {
                    tickets: 200,
                    ..Default::default()
                },
            )
            .unwrap(),
        );
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(600)));
        let limiters = Limiters::new(&LimitsConfig {
            query_concurrency: 4,
            acquire_timeout_ms: 1000,
            resolver_budget_ms: 5000,
        });
        (
            Dispatcher::new(store, cache, limiters, Duration::from_millis(500)),
            dir,
        )
    }

    fn params(tenant: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("tenant_id".to_string(), tenant.to_string());
        params.insert("from".to_string(), "2000-01-01".to_string());
        params.insert("to".to_string(), "2100-01-01".to_string());
        params
    }

    fn visor_for(tenant: &str) -> AccessContext {
        AccessContext::resolve(Some("visor"), Some(tenant), None)
    }

    #[tokio::test]
    async fn unknown_endpoint_is_not_found() {
        let (dispatcher, _dir) = dispatcher();
        let response = dispatcher
            .dispatch("nope", &params("muni-centro"), visor_for("muni-centro"))
            .await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn malformed_filters_fail_before_authorization() {
        let (dispatcher, _dir) = dispatcher();
        let mut p = params("muni-centro");
        p.remove("from");
        let response = dispatcher
            .dispatch("summary", &p, visor_for("muni-centro"))
            .await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn visor_is_rejected_by_operador_endpoints() {
        let (dispatcher, _dir) = dispatcher();
        for endpoint in ["operations", "cohorts", "whatsapp/templates"] {
            let response = dispatcher
                .dispatch(endpoint, &params("muni-centro"), visor_for("muni-centro"))
                .await;
            assert_eq!(response.status, 403, "{endpoint}");
            assert_eq!(response.body["error"], "AuthorizationError");
        }
    }

    #[tokio::test]
    async fn operador_passes_where_visor_is_rejected() {
        let (dispatcher, _dir) = dispatcher();
        let tenant = dispatcher.store.current().tenants[0].id.clone();
        let visor = visor_for(&tenant);
        let operador = AccessContext::resolve(Some("operador"), Some(tenant.as_str()), None);
        assert_eq!(
            dispatcher
                .dispatch("operations", &params(&tenant), visor)
                .await
                .status,
            403
        );
        assert_eq!(
            dispatcher
                .dispatch("operations", &params(&tenant), operador)
                .await
                .status,
            200
        );
    }

    #[tokio::test]
    async fn tenant_outside_scope_is_rejected_with_a_distinct_message() {
        let (dispatcher, _dir) = dispatcher();
        let response = dispatcher
            .dispatch("summary", &params("muni-otro"), visor_for("muni-centro"))
            .await;
        assert_eq!(response.status, 403);
        assert!(response.body["message"]
            .as_str()
            .unwrap()
            .contains("tenant"));
    }

    #[tokio::test]
    async fn admin_bypasses_tenant_scope() {
        let (dispatcher, _dir) = dispatcher();
        let tenant = dispatcher.store.current().tenants[0].id.clone();
        let admin = AccessContext::resolve(Some("admin"), Some("unrelated-tenant"), None);
        let response = dispatcher.dispatch("summary", &params(&tenant), admin).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache() {
        let (dispatcher, _dir) = dispatcher();
        let tenant = dispatcher.store.current().tenants[0].id.clone();
        let access = AccessContext::resolve(Some("visor"), Some(tenant.as_str()), None);
        let first = dispatcher
            .dispatch("summary", &params(&tenant), access.clone())
            .await;
        assert_eq!(first.status, 200);
        let hits_before = dispatcher.cache.stats().hits;
        let second = dispatcher
            .dispatch("summary", &params(&tenant), access)
            .await;
        assert_eq!(second.status, 200);
        assert_eq!(dispatcher.cache.stats().hits, hits_before + 1);
    }

    #[tokio::test]
    async fn health_needs_no_filters_or_role() {
        let (dispatcher, _dir) = dispatcher();
        let response = dispatcher.health();
        assert_eq!(response.status, 200);
        assert!(response.body["totals"]["tickets"].as_u64().unwrap() > 0);
        assert!(response.body["cache"].is_object());
    }

    #[tokio::test]
    async fn refresh_is_admin_only_and_clears_the_cache() {
        let (dispatcher, _dir) = dispatcher();
        let tenant = dispatcher.store.current().tenants[0].id.clone();
        let operador = AccessContext::resolve(Some("operador"), Some(tenant.as_str()), None);
        assert_eq!(dispatcher.refresh(&operador).status, 403);

        let access = AccessContext::resolve(Some("visor"), Some(tenant.as_str()), None);
        dispatcher
            .dispatch("summary", &params(&tenant), access)
            .await;
        assert!(dispatcher.cache.stats().entries > 0);
        let admin = AccessContext::resolve(Some("admin"), None, None);
        assert_eq!(dispatcher.refresh(&admin).status, 200);
        assert_eq!(dispatcher.cache.stats().entries, 0);
    }
}
