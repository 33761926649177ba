//! Query gateway: HTTP front end for the resource endpoints.
//!
//! A request moves through parse → filter resolution → data fetch → local
//! re-filter → history append → response. Parse failures stop with 400,
//! resolver failures with 502; neither touches session history.

pub mod api;
pub mod error;
pub mod protocol;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::Config;
use crate::resources::{
    create_data_source, AllocationFilters, AssetFilters, CloudCostFilters, ResourceFilter,
    ResourceResolver,
};
use crate::sessions::{create_session_store, SessionStore};

pub use error::GatewayError;
pub use protocol::{ParsedQuery, QueryContext, QueryEnvelope, QueryMeta, StructuredQuery};

/// Shared state for every handler. The session store is the only mutable part.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub resolver: Arc<ResourceResolver>,
}

impl AppState {
    pub fn new(sessions: Arc<dyn SessionStore>, resolver: ResourceResolver) -> Self {
        Self {
            sessions,
            resolver: Arc::new(resolver),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            create_session_store(&config.sessions),
            ResourceResolver::new(create_data_source(&config.upstream)),
        )
    }
}

fn resource_routes<F: ResourceFilter>(router: Router<AppState>) -> Router<AppState> {
    router.route(
        &format!("/{}", F::KIND.path()),
        get(api::handle_lookup::<F>).post(api::handle_structured::<F>),
    )
}

/// Build the gateway router with all resource endpoints.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let routes = Router::new().route("/health", get(api::handle_health));
    let routes = resource_routes::<AllocationFilters>(routes);
    let routes = resource_routes::<CloudCostFilters>(routes);
    let routes = resource_routes::<AssetFilters>(routes);

    routes
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the gateway until Ctrl+C.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let app = router(AppState::from_config(&config), config.gateway.max_body_bytes);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway to {addr}"))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        upstream = %config.upstream.base_url,
        max_history = config.sessions.max_history,
        "Gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::util::shutdown_signal("gateway"))
        .await
        .context("Gateway server failure")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;
    use crate::resources::{Allocation, Asset, CloudCost, DataSource, Fetched, ResolveError, ResourceKind};
    use crate::sessions::{InMemorySessionStore, SessionKey};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    /// Serves the built-in mock dataset without filtering, so the gateway's
    /// own re-filter pass is what narrows the result.
    struct UnfilteredSource;

    #[async_trait]
    impl DataSource for UnfilteredSource {
        async fn fetch(
            &self,
            kind: ResourceKind,
            _params: &[(&'static str, String)],
        ) -> Result<Fetched, ResolveError> {
            let body = match kind {
                ResourceKind::Allocations => serde_json::to_string(&mock::allocations()),
                ResourceKind::CloudCosts => serde_json::to_string(&mock::cloud_costs()),
                ResourceKind::Assets => serde_json::to_string(&mock::assets()),
            }
            .unwrap();
            Ok(Fetched {
                url: format!("memory://{kind}"),
                body,
            })
        }

        fn name(&self) -> &str {
            "unfiltered"
        }
    }

    struct BrokenSource {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl DataSource for BrokenSource {
        async fn fetch(
            &self,
            kind: ResourceKind,
            _params: &[(&'static str, String)],
        ) -> Result<Fetched, ResolveError> {
            match self.body {
                Some(body) => Ok(Fetched {
                    url: format!("broken://{kind}"),
                    body: body.to_string(),
                }),
                None => Err(ResolveError::Upstream {
                    kind,
                    url: format!("broken://{kind}"),
                    message: "error 500: boom".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn state_with(source: impl DataSource + 'static) -> AppState {
        AppState::new(
            Arc::new(InMemorySessionStore::new()),
            ResourceResolver::new(Arc::new(source)),
        )
    }

    fn app(state: AppState) -> Router {
        router(state, 64 * 1024)
    }

    fn post(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn follow_up_query_sees_previous_and_context() {
        let state = state_with(UnfilteredSource);

        let first = app(state.clone())
            .oneshot(post(
                "/allocations",
                r#"{"query":"Q1","filters":{"namespace":"prod"},"context":{"session_id":"s1"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first: QueryEnvelope<Allocation, AllocationFilters> = read_json(first).await;
        assert_eq!(first.meta.previous_query, "");
        assert_eq!(first.meta.conversation_context, vec!["Q1"]);

        let second = app(state.clone())
            .oneshot(post(
                "/allocations",
                r#"{"query":"Q2","filters":{"namespace":"prod"},"context":{"session_id":"s1"}}"#,
            ))
            .await
            .unwrap();
        let second: QueryEnvelope<Allocation, AllocationFilters> = read_json(second).await;

        assert_eq!(second.meta.session_id, "s1");
        assert_eq!(second.meta.previous_query, "Q1");
        assert_eq!(second.meta.conversation_context, vec!["Q1", "Q2"]);
        assert_eq!(second.meta.total, 1);
        assert_eq!(second.data[0].namespace, "prod");
        assert_eq!(second.meta.filters_used.namespace, "prod");
    }

    #[tokio::test]
    async fn session_context_spans_resource_kinds() {
        let state = state_with(UnfilteredSource);

        app(state.clone())
            .oneshot(post(
                "/cloudCosts",
                r#"{"query":"show prod vms","filters":{"namespace":"PROD"},"context":{"session_id":"s2"}}"#,
            ))
            .await
            .unwrap();

        let response = app(state.clone())
            .oneshot(post(
                "/assets",
                r#"{"query":"now aws assets","filters":{"provider":"aws"},"context":{"session_id":"s2"}}"#,
            ))
            .await
            .unwrap();
        let envelope: QueryEnvelope<Asset, AssetFilters> = read_json(response).await;

        assert_eq!(envelope.meta.previous_query, "show prod vms");
        assert_eq!(
            envelope.meta.conversation_context,
            vec!["show prod vms", "now aws assets"]
        );
        assert!(envelope.data.iter().all(|a| a.provider.eq_ignore_ascii_case("aws")));
    }

    #[tokio::test]
    async fn missing_session_id_never_creates_a_session() {
        let state = state_with(UnfilteredSource);

        for body in [
            r#"{"query":"Q1","filters":{"namespace":"prod"}}"#,
            r#"{"query":"Q1","context":{"session_id":""}}"#,
        ] {
            let response = app(state.clone())
                .oneshot(post("/cloudCosts", body))
                .await
                .unwrap();
            let envelope: QueryEnvelope<CloudCost, CloudCostFilters> = read_json(response).await;
            assert_eq!(envelope.meta.previous_query, "");
            assert!(envelope.meta.conversation_context.is_empty());
        }

        assert_eq!(state.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn empty_query_text_skips_history_but_echoes_session() {
        let state = state_with(UnfilteredSource);
        let response = app(state.clone())
            .oneshot(post("/assets", r#"{"context":{"session_id":"s3"}}"#))
            .await
            .unwrap();
        let envelope: QueryEnvelope<Asset, AssetFilters> = read_json(response).await;

        assert_eq!(envelope.meta.session_id, "s3");
        assert!(envelope.meta.conversation_context.is_empty());
        assert_eq!(state.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn simple_lookup_uses_query_parameters() {
        let state = state_with(UnfilteredSource);
        let response = app(state)
            .oneshot(get_req("/assets?provider=AZURE"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope: QueryEnvelope<Asset, AssetFilters> = read_json(response).await;
        assert_eq!(envelope.meta.total, 1);
        assert_eq!(envelope.data[0].provider, "Azure");
        assert_eq!(envelope.meta.filters_used.provider, "AZURE");
        assert_eq!(envelope.meta.session_id, "");
    }

    #[tokio::test]
    async fn structured_filters_override_query_parameters() {
        let state = state_with(UnfilteredSource);
        let response = app(state)
            .oneshot(post(
                "/allocations?namespace=dev",
                r#"{"query":"Q","filters":{"namespace":"prod"}}"#,
            ))
            .await
            .unwrap();
        let envelope: QueryEnvelope<Allocation, AllocationFilters> = read_json(response).await;

        assert_eq!(envelope.meta.filters_used.namespace, "prod");
        assert!(envelope.data.iter().all(|a| a.namespace == "prod"));
    }

    #[tokio::test]
    async fn duplicated_lookup_parameter_does_not_exclude() {
        let state = state_with(UnfilteredSource);
        let response = app(state)
            .oneshot(get_req("/assets?provider=aws&provider=azure"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope: QueryEnvelope<Asset, AssetFilters> = read_json(response).await;
        assert_eq!(envelope.meta.total, 2);
        assert_eq!(envelope.meta.filters_used, AssetFilters::default());
    }

    #[tokio::test]
    async fn unparsable_query_string_does_not_block_structured_body() {
        let state = state_with(UnfilteredSource);
        let response = app(state.clone())
            .oneshot(post(
                "/allocations?namespace=a&namespace=b",
                r#"{"query":"Q1","filters":{"namespace":"prod"},"context":{"session_id":"s1"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope: QueryEnvelope<Allocation, AllocationFilters> = read_json(response).await;
        assert_eq!(envelope.meta.filters_used.namespace, "prod");
        assert_eq!(envelope.meta.conversation_context, vec!["Q1"]);
        assert!(envelope.data.iter().all(|a| a.namespace == "prod"));

        // Without body filters the bad query string filters nothing.
        let response = app(state)
            .oneshot(post(
                "/allocations?namespace=a&namespace=b",
                r#"{"query":"Q2","context":{"session_id":"s1"}}"#,
            ))
            .await
            .unwrap();
        let envelope: QueryEnvelope<Allocation, AllocationFilters> = read_json(response).await;
        assert_eq!(envelope.meta.total, 2);
        assert_eq!(envelope.meta.previous_query, "Q1");
    }

    #[tokio::test]
    async fn null_optionals_in_body_are_accepted() {
        let state = state_with(UnfilteredSource);
        let response = app(state)
            .oneshot(post(
                "/allocations",
                r#"{"query":null,"filters":{"namespace":"prod","start":null},"context":null}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope: QueryEnvelope<Allocation, AllocationFilters> = read_json(response).await;
        assert_eq!(envelope.meta.total, 1);
        assert_eq!(envelope.meta.filters_used.start, "");
        assert!(envelope.meta.conversation_context.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_history() {
        let state = state_with(UnfilteredSource);
        let response = app(state.clone())
            .oneshot(post("/allocations", r#"{"query":"Q1","context":"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error_type"], "BadRequest");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));
        assert_eq!(state.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_a_server_error_without_history() {
        let state = state_with(BrokenSource { body: None });
        let response = app(state.clone())
            .oneshot(post(
                "/assets",
                r#"{"query":"Q1","context":{"session_id":"s4"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error_type"], "UpstreamError");
        assert!(body.get("data").is_none());

        let key = SessionKey::parse("s4").unwrap();
        assert!(state.sessions.history(&key).await.is_empty());
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_server_error() {
        let state = state_with(BrokenSource {
            body: Some("<html>not json</html>"),
        });
        let response = app(state)
            .oneshot(get_req("/cloudCosts"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error_type"], "DecodeError");
    }

    #[tokio::test]
    async fn history_resumes_after_a_failed_request() {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let healthy = AppState::new(
            sessions.clone(),
            ResourceResolver::new(Arc::new(UnfilteredSource)),
        );
        let broken = AppState::new(
            sessions.clone(),
            ResourceResolver::new(Arc::new(BrokenSource { body: None })),
        );
        let body = |q: &str| format!(r#"{{"query":"{q}","context":{{"session_id":"s5"}}}}"#);

        app(healthy.clone()).oneshot(post("/assets", &body("Q1"))).await.unwrap();
        app(broken).oneshot(post("/assets", &body("lost"))).await.unwrap();
        let response = app(healthy)
            .oneshot(post("/assets", &body("Q2")))
            .await
            .unwrap();
        let envelope: QueryEnvelope<Asset, AssetFilters> = read_json(response).await;

        assert_eq!(envelope.meta.previous_query, "Q1");
        assert_eq!(envelope.meta.conversation_context, vec!["Q1", "Q2"]);
    }

    #[tokio::test]
    async fn health_reports_session_store() {
        let state = state_with(UnfilteredSource);
        let response = app(state).oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["session_store"], "in_memory");
        assert_eq!(body["data_source"], "unfiltered");
        assert_eq!(body["sessions"], 0);
    }
}
