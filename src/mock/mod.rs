//! Mock data source: serves a small fixed dataset on the three resource
//! paths, applying the same filter predicates the gateway re-checks.
//!
//! Useful for local development and for exercising the gateway end to end
//! without a real cost backend.

use anyhow::{Context, Result};
use axum::{extract::Query, response::Json, routing::get, Router};

use crate::resources::{
    Allocation, AllocationFilters, Asset, AssetFilters, CloudCost, CloudCostFilters,
    ResourceFilter,
};

pub fn cloud_costs() -> Vec<CloudCost> {
    vec![
        CloudCost {
            name: "prod-vm-1".into(),
            cpu_cost: 10.5,
            gpu_cost: 5.0,
            total_cost: 15.5,
        },
        CloudCost {
            name: "dev-vm-2".into(),
            cpu_cost: 8.0,
            gpu_cost: 3.5,
            total_cost: 11.5,
        },
    ]
}

pub fn allocations() -> Vec<Allocation> {
    vec![
        Allocation {
            namespace: "dev".into(),
            resource_id: "pod-123".into(),
            cpu_cost: 4.5,
            memory_cost: 1.2,
            gpu_cost: 0.0,
            total_cost: 5.7,
            start_time: "2025-08-01T00:00:00Z".into(),
            end_time: "2025-08-02T00:00:00Z".into(),
        },
        Allocation {
            namespace: "prod".into(),
            resource_id: "pod-456".into(),
            cpu_cost: 10.0,
            memory_cost: 3.5,
            gpu_cost: 0.0,
            total_cost: 13.5,
            start_time: "2025-08-01T00:00:00Z".into(),
            end_time: "2025-08-02T00:00:00Z".into(),
        },
    ]
}

pub fn assets() -> Vec<Asset> {
    vec![
        Asset {
            asset_id: "asset-001".into(),
            name: "AWS EC2 m5.large".into(),
            kind: "VM".into(),
            status: "active".into(),
            provider: "AWS".into(),
            region: "us-west-2".into(),
            cost: 120.5,
        },
        Asset {
            asset_id: "asset-002".into(),
            name: "Azure SQL Database".into(),
            kind: "Database".into(),
            status: "active".into(),
            provider: "Azure".into(),
            region: "centralindia".into(),
            cost: 300.75,
        },
    ]
}

fn filtered<F: ResourceFilter>(filters: &F, records: Vec<F::Record>) -> Json<Vec<F::Record>> {
    let kept: Vec<F::Record> = records.into_iter().filter(|r| filters.matches(r)).collect();
    tracing::debug!(kind = %F::KIND, records = kept.len(), "Mock served records");
    Json(kept)
}

async fn handle_allocations(Query(filters): Query<AllocationFilters>) -> Json<Vec<Allocation>> {
    filtered(&filters, allocations())
}

async fn handle_cloud_costs(Query(filters): Query<CloudCostFilters>) -> Json<Vec<CloudCost>> {
    filtered(&filters, cloud_costs())
}

async fn handle_assets(Query(filters): Query<AssetFilters>) -> Json<Vec<Asset>> {
    filtered(&filters, assets())
}

/// Router serving the mock dataset.
pub fn router() -> Router {
    Router::new()
        .route("/allocations", get(handle_allocations))
        .route("/cloudCosts", get(handle_cloud_costs))
        .route("/assets", get(handle_assets))
}

/// Bind and serve the mock data source until Ctrl+C.
pub async fn run_mock(host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind mock data source to {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "Mock data source listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(crate::util::shutdown_signal("mock"))
        .await
        .context("Mock data source failure")?;
    Ok(())
}
