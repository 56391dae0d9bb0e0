//! Landlord and tenant reputation scoring plus the materialized stats snapshots it maintains.

mod config;
pub(crate) mod rules;

pub use config::{LandlordWeights, ScoringWeights, TenantWeights, WeightsError};

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use super::domain::{
    LandlordStats, LeaseStatus, PropertyId, ReviewType, TenantStats, TerminationStatus, UserId,
};
use super::error::LedgerError;
use super::repository::{LedgerStore, RepositoryError};
use rules::PaymentTally;

/// Every landlord sub-score behind a composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandlordScoreBreakdown {
    pub landlord_id: UserId,
    pub rating_score: f64,
    pub maintenance_score: f64,
    pub behavior_score: f64,
    pub overall_score: f64,
    pub avg_response_time_hours: i64,
    pub flagged_properties: u32,
}

/// Every tenant sub-score behind a composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantScoreBreakdown {
    pub tenant_id: UserId,
    pub payment_score: f64,
    pub feedback_score: f64,
    pub overall_score: f64,
    pub total_payments: u32,
    pub late_payments: u32,
}

/// Computes reputation composites and upserts the stats snapshots.
pub struct ReputationService<S> {
    store: Arc<S>,
    weights: ScoringWeights,
}

impl<S> ReputationService<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(store: Arc<S>, weights: ScoringWeights) -> Self {
        Self { store, weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn calculate_landlord_score(&self, landlord_id: UserId) -> Result<f64, LedgerError> {
        Ok(self.landlord_breakdown(landlord_id)?.overall_score)
    }

    pub fn calculate_tenant_score(&self, tenant_id: UserId) -> Result<f64, LedgerError> {
        Ok(self.tenant_breakdown(tenant_id)?.overall_score)
    }

    pub fn landlord_breakdown(
        &self,
        landlord_id: UserId,
    ) -> Result<LandlordScoreBreakdown, LedgerError> {
        let reviews = self
            .store
            .reviews_about(landlord_id, ReviewType::TenantToLandlord)?;
        let rating_score = rules::mean_rating(&reviews);

        let property_ids: Vec<PropertyId> = self
            .store
            .properties_by_owner(landlord_id)?
            .into_iter()
            .map(|property| property.id)
            .collect();
        let completed_requests = if property_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .completed_requests_for_properties(&property_ids)?
        };
        let avg_response = rules::average_response_hours(&completed_requests);
        let maintenance_score = rules::maintenance_score(avg_response);

        let flagged_properties = self.store.count_flagged_by_owner(landlord_id)?;
        let behavior_score = rules::behavior_score(flagged_properties);

        let weights = self.weights.landlord;
        let overall_score = rating_score * weights.rating
            + maintenance_score * weights.maintenance
            + behavior_score * weights.behavior;

        Ok(LandlordScoreBreakdown {
            landlord_id,
            rating_score,
            maintenance_score,
            behavior_score,
            overall_score,
            avg_response_time_hours: avg_response.unwrap_or(0),
            flagged_properties,
        })
    }

    pub fn tenant_breakdown(&self, tenant_id: UserId) -> Result<TenantScoreBreakdown, LedgerError> {
        let payments = self.store.completed_payments_by_tenant(tenant_id)?;
        let tally = PaymentTally::from_payments(&payments);
        let payment_score = rules::payment_score(tally);

        let reviews = self
            .store
            .reviews_about(tenant_id, ReviewType::LandlordToTenant)?;
        let feedback_score = rules::mean_rating(&reviews);

        let weights = self.weights.tenant;
        let overall_score = payment_score * weights.payment + feedback_score * weights.feedback;

        Ok(TenantScoreBreakdown {
            tenant_id,
            payment_score,
            feedback_score,
            overall_score,
            total_payments: tally.total,
            late_payments: tally.late,
        })
    }

    /// Recomputes the landlord snapshot and saves it against the version it was loaded with.
    pub fn update_landlord_score(
        &self,
        landlord_id: UserId,
        now: NaiveDateTime,
    ) -> Result<LandlordStats, LedgerError> {
        let mut stats = self
            .store
            .landlord_stats(landlord_id)?
            .unwrap_or_else(|| LandlordStats::empty(landlord_id));

        let breakdown = self.landlord_breakdown(landlord_id)?;
        let completed_leases = self
            .store
            .leases_by_owner(landlord_id)?
            .iter()
            .filter(|lease| {
                lease.status == LeaseStatus::Terminated
                    && lease.termination_status == TerminationStatus::Approved
            })
            .count() as u32;

        stats.rating_score = breakdown.rating_score;
        stats.maintenance_score = breakdown.maintenance_score;
        stats.behavior_score = breakdown.behavior_score;
        stats.overall_score = breakdown.overall_score;
        stats.completed_leases = completed_leases;
        stats.avg_response_time_hours = breakdown.avg_response_time_hours;
        stats.flagged_properties = breakdown.flagged_properties;
        stats.last_updated = Some(now);

        let saved = self.store.save_landlord_stats(stats)?;
        debug!(
            %landlord_id,
            overall = saved.overall_score,
            version = saved.version,
            "landlord stats refreshed"
        );
        Ok(saved)
    }

    /// Recomputes the tenant snapshot and saves it against the version it was loaded with.
    pub fn update_tenant_score(
        &self,
        tenant_id: UserId,
        now: NaiveDateTime,
    ) -> Result<TenantStats, LedgerError> {
        let mut stats = self
            .store
            .tenant_stats(tenant_id)?
            .unwrap_or_else(|| TenantStats::empty(tenant_id));

        let payments = self.store.completed_payments_by_tenant(tenant_id)?;
        let tally = PaymentTally::from_payments(&payments);
        let breakdown = self.tenant_breakdown(tenant_id)?;

        let leases = self.store.leases_by_tenant(tenant_id)?;
        let count_status = |status: LeaseStatus| {
            leases.iter().filter(|lease| lease.status == status).count() as u32
        };

        stats.payment_score = breakdown.payment_score;
        stats.feedback_score = breakdown.feedback_score;
        stats.overall_score = breakdown.overall_score;
        stats.total_payments = tally.total;
        stats.late_payments = tally.late;
        stats.on_time_payments = tally.on_time();
        stats.punctuality_ratio = tally.punctuality_ratio();
        stats.active_leases = count_status(LeaseStatus::Active);
        stats.completed_leases = count_status(LeaseStatus::Terminated);
        stats.last_updated = Some(now);

        let saved = self.store.save_tenant_stats(stats)?;
        debug!(
            %tenant_id,
            overall = saved.overall_score,
            version = saved.version,
            "tenant stats refreshed"
        );
        Ok(saved)
    }

    pub fn landlord_stats(&self, landlord_id: UserId) -> Result<LandlordStats, LedgerError> {
        let stats = self
            .store
            .landlord_stats(landlord_id)?
            .ok_or_else(|| RepositoryError::not_found("landlord stats", landlord_id))?;
        Ok(stats)
    }

    pub fn tenant_stats(&self, tenant_id: UserId) -> Result<TenantStats, LedgerError> {
        let stats = self
            .store
            .tenant_stats(tenant_id)?
            .ok_or_else(|| RepositoryError::not_found("tenant stats", tenant_id))?;
        Ok(stats)
    }

    pub fn all_landlord_stats(&self) -> Result<Vec<LandlordStats>, LedgerError> {
        Ok(self.store.all_landlord_stats()?)
    }

    pub fn all_tenant_stats(&self) -> Result<Vec<TenantStats>, LedgerError> {
        Ok(self.store.all_tenant_stats()?)
    }
}
