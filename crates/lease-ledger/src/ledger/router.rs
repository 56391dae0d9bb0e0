use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::domain::{LandlordStats, TenantStats, UserId};
use super::repository::LedgerStore;
use super::scoring::ReputationService;
use crate::error::AppError;

/// Read-only HTTP view over the materialized stats snapshots. Failures render through
/// [`AppError`], so a missing snapshot is a 404.
pub fn stats_router<S>(service: Arc<ReputationService<S>>) -> Router
where
    S: LedgerStore + 'static,
{
    Router::new()
        .route("/api/v1/stats/landlords", get(all_landlords_handler::<S>))
        .route(
            "/api/v1/stats/landlords/:landlord_id",
            get(landlord_handler::<S>),
        )
        .route("/api/v1/stats/tenants", get(all_tenants_handler::<S>))
        .route("/api/v1/stats/tenants/:tenant_id", get(tenant_handler::<S>))
        .with_state(service)
}

pub(crate) async fn all_landlords_handler<S>(
    State(service): State<Arc<ReputationService<S>>>,
) -> Result<Json<Vec<LandlordStats>>, AppError>
where
    S: LedgerStore + 'static,
{
    Ok(Json(service.all_landlord_stats()?))
}

pub(crate) async fn landlord_handler<S>(
    State(service): State<Arc<ReputationService<S>>>,
    Path(landlord_id): Path<u64>,
) -> Result<Json<LandlordStats>, AppError>
where
    S: LedgerStore + 'static,
{
    Ok(Json(service.landlord_stats(UserId(landlord_id))?))
}

pub(crate) async fn all_tenants_handler<S>(
    State(service): State<Arc<ReputationService<S>>>,
) -> Result<Json<Vec<TenantStats>>, AppError>
where
    S: LedgerStore + 'static,
{
    Ok(Json(service.all_tenant_stats()?))
}

pub(crate) async fn tenant_handler<S>(
    State(service): State<Arc<ReputationService<S>>>,
    Path(tenant_id): Path<u64>,
) -> Result<Json<TenantStats>, AppError>
where
    S: LedgerStore + 'static,
{
    Ok(Json(service.tenant_stats(UserId(tenant_id))?))
}
