//! HTTP handlers for the resource endpoints.
//!
//! Every resource kind is served by the same two generic handlers: `GET` for
//! simple parameter lookups and `POST` for structured queries that carry a
//! session context.

use super::error::GatewayError;
use super::protocol::{parse_structured, ParsedQuery, QueryEnvelope, QueryMeta};
use super::AppState;
use crate::resources::ResourceFilter;
use crate::sessions::HistoryUpdate;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Json},
};

type EnvelopeResult<F> =
    Result<Json<QueryEnvelope<<F as ResourceFilter>::Record, F>>, GatewayError>;

// ── Handlers ────────────────────────────────────────────────────

/// GET /{kind}: simple lookup from query parameters
pub async fn handle_lookup<F: ResourceFilter>(
    State(state): State<AppState>,
    params: Result<Query<F>, QueryRejection>,
) -> EnvelopeResult<F> {
    tracing::info!(kind = %F::KIND, "Lookup request received");
    answer(&state, ParsedQuery::from_params(lenient_params(params))).await
}

/// POST /{kind}: structured query; body filters override query parameters
pub async fn handle_structured<F: ResourceFilter>(
    State(state): State<AppState>,
    params: Result<Query<F>, QueryRejection>,
    body: Bytes,
) -> EnvelopeResult<F> {
    let structured = parse_structured::<F>(&body).inspect_err(|e| {
        tracing::warn!(kind = %F::KIND, error = %e, "Rejected structured query");
    })?;
    // Body filters replace the query string, so it is only read without them.
    let params = if structured.filters.is_some() {
        F::default()
    } else {
        lenient_params(params)
    };
    let query = ParsedQuery::from_structured(params, structured);
    tracing::info!(
        kind = %F::KIND,
        session_id = %query.session_id,
        query = %query.text,
        "Structured query received"
    );
    answer(&state, query).await
}

/// GET /health: liveness plus session store stats
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "session_store": state.sessions.name(),
        "sessions": state.sessions.session_count().await,
        "data_source": state.resolver.source_name(),
    }))
}

// ── Helpers ─────────────────────────────────────────────────────

/// Filters from the query string. An unparsable query string (duplicated
/// keys, bad encoding) does not exclude anything.
fn lenient_params<F: ResourceFilter>(params: Result<Query<F>, QueryRejection>) -> F {
    match params {
        Ok(Query(filters)) => filters,
        Err(rejection) => {
            tracing::warn!(
                kind = %F::KIND,
                error = %rejection.body_text(),
                "Ignoring unparsable query string"
            );
            F::default()
        }
    }
}

/// Resolve records, then record the query in the session history.
///
/// History is appended only once the resolve step has succeeded, so a
/// session's context never mentions a query that produced no result.
async fn answer<F: ResourceFilter>(state: &AppState, query: ParsedQuery<F>) -> EnvelopeResult<F> {
    let kind = F::KIND;
    let resolved = state.resolver.resolve(&query.filters).await.map_err(|e| {
        tracing::warn!(%kind, error = %e, "Resolve failed");
        GatewayError::from(e)
    })?;

    let update = match query.tracked_session() {
        Some(key) => {
            let update = state.sessions.append(&key, &query.text).await;
            tracing::debug!(%kind, session_id = %key, depth = update.history.len(), "Session history updated");
            update
        }
        None => HistoryUpdate::default(),
    };

    let total = resolved.records.len();
    Ok(Json(QueryEnvelope {
        data: resolved.records,
        meta: QueryMeta {
            filters_used: query.filters,
            session_id: query.session_id,
            previous_query: update.previous,
            conversation_context: update.history,
            total,
        },
    }))
}
