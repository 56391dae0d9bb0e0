use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::info;

use super::domain::{LeaseId, MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus};
use super::error::{LedgerError, TransitionError};
use super::events::{publish_best_effort, ActivityPublisher, LedgerEvent};
use super::repository::{LeaseRepository, MaintenanceRepository, RepositoryError};

/// Maintenance request lifecycle. Completion timestamps feed the landlord maintenance score.
pub struct MaintenanceService<S, P> {
    store: Arc<S>,
    activity: Arc<P>,
}

impl<S, P> MaintenanceService<S, P>
where
    S: LeaseRepository + MaintenanceRepository + 'static,
    P: ActivityPublisher + 'static,
{
    pub fn new(store: Arc<S>, activity: Arc<P>) -> Self {
        Self { store, activity }
    }

    pub fn open_request(
        &self,
        lease_id: LeaseId,
        description: impl Into<String>,
        now: NaiveDateTime,
    ) -> Result<MaintenanceRequest, LedgerError> {
        self.store
            .lease(lease_id)?
            .ok_or_else(|| RepositoryError::not_found("lease", lease_id))?;

        let request = self.store.insert_request(MaintenanceRequest {
            id: MaintenanceRequestId(0),
            lease_id,
            description: description.into(),
            status: MaintenanceStatus::Pending,
            created_at: now,
            updated_at: now,
            cost: None,
            is_fixed: None,
        })?;

        info!(%lease_id, request_id = %request.id, "maintenance request opened");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("maintenance_opened", "maintenance_request", request.id)
                .detail("lease_id", lease_id),
        );
        Ok(request)
    }

    /// Moves the request to `status`. Completing a request marks it fixed.
    pub fn set_status(
        &self,
        request_id: MaintenanceRequestId,
        status: MaintenanceStatus,
        now: NaiveDateTime,
    ) -> Result<MaintenanceRequest, LedgerError> {
        let mut request = self.load(request_id)?;
        let previous = request.status;

        request.status = status;
        if status == MaintenanceStatus::Completed {
            request.is_fixed = Some(true);
        }
        request.updated_at = now;
        self.store.save_request(&request)?;

        info!(
            %request_id,
            from = previous.label(),
            to = status.label(),
            "maintenance status changed"
        );
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("maintenance_status_changed", "maintenance_request", request_id)
                .detail("from", previous.label())
                .detail("to", status.label()),
        );
        Ok(request)
    }

    pub fn set_cost(
        &self,
        request_id: MaintenanceRequestId,
        cost: Decimal,
    ) -> Result<MaintenanceRequest, LedgerError> {
        let mut request = self.load(request_id)?;
        require_completed(&request, "set the cost of")?;

        request.cost = Some(cost);
        self.store.save_request(&request)?;

        info!(%request_id, %cost, "maintenance cost recorded");
        Ok(request)
    }

    /// Reopens a completed request the tenant reports as still broken.
    pub fn mark_not_fixed(
        &self,
        request_id: MaintenanceRequestId,
        now: NaiveDateTime,
    ) -> Result<MaintenanceRequest, LedgerError> {
        let mut request = self.load(request_id)?;
        require_completed(&request, "mark as not fixed")?;

        request.is_fixed = Some(false);
        request.status = MaintenanceStatus::InProgress;
        request.updated_at = now;
        self.store.save_request(&request)?;

        info!(%request_id, "maintenance request reopened as not fixed");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("maintenance_not_fixed", "maintenance_request", request_id),
        );
        Ok(request)
    }

    pub fn request(
        &self,
        request_id: MaintenanceRequestId,
    ) -> Result<MaintenanceRequest, LedgerError> {
        self.load(request_id)
    }

    fn load(&self, request_id: MaintenanceRequestId) -> Result<MaintenanceRequest, LedgerError> {
        let request = self
            .store
            .request(request_id)?
            .ok_or_else(|| RepositoryError::not_found("maintenance request", request_id))?;
        Ok(request)
    }
}

fn require_completed(
    request: &MaintenanceRequest,
    action: &'static str,
) -> Result<(), TransitionError> {
    if request.is_completed() {
        Ok(())
    } else {
        Err(TransitionError {
            entity: "maintenance request",
            id: request.id.0,
            action,
            state: request.status.label(),
        })
    }
}
