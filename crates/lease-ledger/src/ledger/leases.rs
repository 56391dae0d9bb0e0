use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::batch::{self, BatchReport};
use super::domain::{
    Lease, LeaseId, LeaseInvitation, LeaseStatus, PropertyStatus, TerminationDecision,
    TerminationStatus, UserId,
};
use super::error::{DomainConflict, LedgerError, TransitionError};
use super::events::{publish_best_effort, ActivityPublisher, LedgerEvent};
use super::repository::{LeaseRepository, PropertyRepository, RepositoryError};

pub const EXPIRATION_JOB: &str = "lease-expiration";

/// What an approved termination does to the leased property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TerminationPropertyRule {
    /// The property stays RENTED, matching the invitation side effect.
    #[default]
    KeepRented,
    /// The property is released back to AVAILABLE.
    Release,
}

impl TerminationPropertyRule {
    pub const fn from_release_flag(release: bool) -> Self {
        if release {
            TerminationPropertyRule::Release
        } else {
            TerminationPropertyRule::KeepRented
        }
    }

    const fn property_status(self) -> PropertyStatus {
        match self {
            TerminationPropertyRule::KeepRented => PropertyStatus::Rented,
            TerminationPropertyRule::Release => PropertyStatus::Available,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaseConfig {
    pub termination_property_rule: TerminationPropertyRule,
}

/// Lease state as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseStatusView {
    pub lease_id: LeaseId,
    pub status: LeaseStatus,
    pub termination_status: TerminationStatus,
    pub termination_requested_at: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<&Lease> for LeaseStatusView {
    fn from(lease: &Lease) -> Self {
        Self {
            lease_id: lease.id,
            status: lease.status,
            termination_status: lease.termination_status,
            termination_requested_at: lease.termination_requested_at,
            end_date: lease.end_date,
        }
    }
}

/// Drives lease status and the termination workflow.
pub struct LeaseService<S, P> {
    store: Arc<S>,
    activity: Arc<P>,
    config: LeaseConfig,
}

impl<S, P> LeaseService<S, P>
where
    S: LeaseRepository + PropertyRepository + 'static,
    P: ActivityPublisher + 'static,
{
    pub fn new(store: Arc<S>, activity: Arc<P>, config: LeaseConfig) -> Self {
        Self {
            store,
            activity,
            config,
        }
    }

    /// Creates a PENDING lease for an accepted invitation and marks the property RENTED.
    pub fn accept_invitation(
        &self,
        invitation: LeaseInvitation,
        tenant_id: UserId,
        now: NaiveDateTime,
    ) -> Result<Lease, LedgerError> {
        if invitation.monthly_rent <= Decimal::ZERO {
            return Err(DomainConflict::NonPositiveRent(invitation.monthly_rent).into());
        }
        let mut property = self
            .store
            .property(invitation.property_id)?
            .ok_or_else(|| RepositoryError::not_found("property", invitation.property_id))?;

        let lease = self.store.insert_lease(Lease {
            id: LeaseId(0),
            tenant_id,
            property_id: invitation.property_id,
            start_date: Some(invitation.start_date),
            end_date: invitation.end_date,
            monthly_rent: invitation.monthly_rent,
            status: LeaseStatus::Pending,
            termination_status: TerminationStatus::NotRequested,
            termination_requested_at: None,
            created_at: now,
        })?;

        property.status = PropertyStatus::Rented;
        self.store.save_property(&property)?;

        info!(lease_id = %lease.id, %tenant_id, property_id = %property.id, "invitation accepted");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("lease_created", "lease", lease.id)
                .detail("tenant_id", tenant_id)
                .detail("property_id", property.id),
        );
        Ok(lease)
    }

    pub fn approve_lease(&self, lease_id: LeaseId) -> Result<Lease, LedgerError> {
        let mut lease = self.load(lease_id)?;
        require_status(&lease, LeaseStatus::Pending, "approve")?;

        lease.status = LeaseStatus::Active;
        self.store.save_lease(&lease)?;

        info!(%lease_id, "lease approved");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("lease_approved", "lease", lease_id),
        );
        Ok(lease)
    }

    /// Rejecting a pending lease ends it outright; the termination workflow is not involved.
    pub fn reject_lease(&self, lease_id: LeaseId) -> Result<Lease, LedgerError> {
        let mut lease = self.load(lease_id)?;
        require_status(&lease, LeaseStatus::Pending, "reject")?;

        lease.status = LeaseStatus::Terminated;
        self.store.save_lease(&lease)?;

        info!(%lease_id, "lease rejected");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("lease_rejected", "lease", lease_id),
        );
        Ok(lease)
    }

    /// Opens a termination request on an active lease. A lease gets one request; once decided
    /// the workflow is closed.
    pub fn request_termination(
        &self,
        lease_id: LeaseId,
        today: NaiveDate,
    ) -> Result<Lease, LedgerError> {
        let mut lease = self.load(lease_id)?;
        require_status(&lease, LeaseStatus::Active, "request termination of")?;
        if lease.termination_status != TerminationStatus::NotRequested {
            return Err(TransitionError {
                entity: "lease",
                id: lease_id.0,
                action: "request termination of",
                state: termination_state(lease.termination_status),
            }
            .into());
        }

        lease.termination_status = TerminationStatus::Pending;
        lease.termination_requested_at = Some(today);
        self.store.save_lease(&lease)?;

        info!(%lease_id, requested_at = %today, "termination requested");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("termination_requested", "lease", lease_id)
                .detail("requested_at", today),
        );
        Ok(lease)
    }

    pub fn decide_termination(
        &self,
        lease_id: LeaseId,
        decision: TerminationDecision,
    ) -> Result<Lease, LedgerError> {
        let mut lease = self.load(lease_id)?;
        require_status(&lease, LeaseStatus::Active, "decide termination of")?;
        if lease.termination_status != TerminationStatus::Pending {
            return Err(TransitionError {
                entity: "lease",
                id: lease_id.0,
                action: "decide termination of",
                state: termination_state(lease.termination_status),
            }
            .into());
        }

        match decision {
            TerminationDecision::Approved => {
                let mut property = self
                    .store
                    .property(lease.property_id)?
                    .ok_or_else(|| RepositoryError::not_found("property", lease.property_id))?;

                lease.termination_status = TerminationStatus::Approved;
                lease.status = LeaseStatus::Terminated;
                self.store.save_lease(&lease)?;

                property.status = self.config.termination_property_rule.property_status();
                self.store.save_property(&property)?;
            }
            TerminationDecision::Rejected => {
                lease.termination_status = TerminationStatus::Rejected;
                self.store.save_lease(&lease)?;
            }
        }

        let outcome = lease.termination_status.label();
        info!(%lease_id, outcome, "termination decided");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("termination_decided", "lease", lease_id).detail("outcome", outcome),
        );
        Ok(lease)
    }

    /// Terminates every active lease whose end date has been reached and releases its property.
    ///
    /// Each candidate is reloaded before it is written, so a lease decided or terminated after the
    /// candidate list was taken is left as it is.
    pub fn expire_leases(&self, today: NaiveDate) -> Result<BatchReport<LeaseId>, LedgerError> {
        let candidates = self
            .store
            .active_leases_ending_between(NaiveDate::MIN, today)?;
        debug!(candidates = candidates.len(), %today, "expiration sweep starting");

        let report = batch::run(
            EXPIRATION_JOB,
            candidates.into_iter().map(|lease| (lease.id, lease.id)),
            |lease_id| self.expire_one(lease_id, today),
        );
        Ok(report)
    }

    fn expire_one(&self, lease_id: LeaseId, today: NaiveDate) -> Result<(), LedgerError> {
        let mut lease = self.load(lease_id)?;
        if !lease.is_expired_on(today) {
            debug!(%lease_id, status = lease.status.label(), "lease no longer due for expiration");
            return Ok(());
        }

        let property = self
            .store
            .property(lease.property_id)?
            .ok_or_else(|| RepositoryError::not_found("property", lease.property_id))?;

        lease.status = LeaseStatus::Terminated;
        self.store.save_lease(&lease)?;

        if property.status == PropertyStatus::Rented {
            let mut property = property;
            property.status = PropertyStatus::Available;
            self.store.save_property(&property)?;
        }

        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("lease_expired", "lease", lease_id).detail("expired_on", today),
        );
        Ok(())
    }

    pub fn lease_status(&self, lease_id: LeaseId) -> Result<LeaseStatusView, LedgerError> {
        let lease = self.load(lease_id)?;
        Ok(LeaseStatusView::from(&lease))
    }

    pub fn lease(&self, lease_id: LeaseId) -> Result<Lease, LedgerError> {
        self.load(lease_id)
    }

    pub fn pending_leases(&self) -> Result<Vec<Lease>, LedgerError> {
        Ok(self.store.leases_by_status(LeaseStatus::Pending)?)
    }

    pub fn pending_terminations(&self) -> Result<Vec<Lease>, LedgerError> {
        Ok(self
            .store
            .leases_by_termination_status(TerminationStatus::Pending)?)
    }

    pub fn leases_for_tenant(&self, tenant_id: UserId) -> Result<Vec<Lease>, LedgerError> {
        Ok(self.store.leases_by_tenant(tenant_id)?)
    }

    pub fn leases_for_owner(&self, owner_id: UserId) -> Result<Vec<Lease>, LedgerError> {
        Ok(self.store.leases_by_owner(owner_id)?)
    }

    /// Active leases ending inside `[from, to]`.
    pub fn leases_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Lease>, LedgerError> {
        Ok(self.store.active_leases_ending_between(from, to)?)
    }

    fn load(&self, lease_id: LeaseId) -> Result<Lease, LedgerError> {
        let lease = self
            .store
            .lease(lease_id)?
            .ok_or_else(|| RepositoryError::not_found("lease", lease_id))?;
        Ok(lease)
    }
}

fn require_status(
    lease: &Lease,
    expected: LeaseStatus,
    action: &'static str,
) -> Result<(), TransitionError> {
    if lease.status == expected {
        Ok(())
    } else {
        Err(TransitionError {
            entity: "lease",
            id: lease.id.0,
            action,
            state: lease.status.label(),
        })
    }
}

fn termination_state(status: TerminationStatus) -> &'static str {
    match status {
        TerminationStatus::NotRequested => "without a termination request",
        TerminationStatus::Pending => "awaiting a termination decision",
        TerminationStatus::Approved => "termination approved",
        TerminationStatus::Rejected => "termination rejected",
    }
}
