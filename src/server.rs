//! JSON query server.
//!
//! Exposes the same filter-and-aggregate core the desktop dashboard uses, so a
//! browser front end can drive it over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterSpec;
use crate::data::model::{ExportDataset, SelectorDomains};
use crate::data::query::{query, QueryOptions, QueryOutcome};
use crate::error::ApiError;
use crate::state::{reduce, FilterEvent};

/// State shared across all handlers.  Read-only after startup.
#[derive(Clone)]
pub struct ServerState {
    pub dataset: Arc<ExportDataset>,
    pub options: Arc<QueryOptions>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    records: usize,
}

/// Body of `POST /api/filters/reduce`.
#[derive(Debug, Deserialize)]
pub struct ReduceRequest {
    pub spec: FilterSpec,
    pub event: FilterEvent,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        records: state.dataset.len(),
    })
}

async fn domains(State(state): State<ServerState>) -> Json<SelectorDomains> {
    Json(state.dataset.selector_domains())
}

async fn run_query(
    State(state): State<ServerState>,
    body: Result<Json<FilterSpec>, JsonRejection>,
) -> Result<Json<QueryOutcome>, ApiError> {
    let Json(spec) = body?;
    Ok(Json(query(&state.dataset, &spec, &state.options)))
}

async fn reduce_filters(
    body: Result<Json<ReduceRequest>, JsonRejection>,
) -> Result<Json<FilterSpec>, ApiError> {
    let Json(req) = body?;
    Ok(Json(reduce(&req.spec, &req.event)))
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/domains", get(domains))
        .route("/api/query", post(run_query))
        .route("/api/filters/reduce", post(reduce_filters))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: ServerState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "Serving {} export records on http://{}",
        state.dataset.len(),
        listener.local_addr()?
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
