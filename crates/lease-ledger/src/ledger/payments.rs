use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use super::billing::{self, RentStatus};
use super::domain::{Lease, LeaseId, Payment, PaymentId, PaymentMethod, PaymentStatus};
use super::error::{DomainConflict, LedgerError};
use super::events::{publish_best_effort, ActivityPublisher, LedgerEvent};
use super::repository::{LeaseRepository, PaymentRepository, RepositoryError};

/// Records rent payments and answers billing questions about a lease.
pub struct PaymentService<S, P> {
    store: Arc<S>,
    activity: Arc<P>,
}

impl<S, P> PaymentService<S, P>
where
    S: LeaseRepository + PaymentRepository + 'static,
    P: ActivityPublisher + 'static,
{
    pub fn new(store: Arc<S>, activity: Arc<P>) -> Self {
        Self { store, activity }
    }

    /// Records one completed rent payment dated `today`.
    ///
    /// A lease accepts a single payment per billing cycle and the amount must match the monthly
    /// rent exactly. Nothing is written when either guard fails.
    pub fn record_payment(
        &self,
        lease_id: LeaseId,
        amount: Decimal,
        method: PaymentMethod,
        today: NaiveDate,
    ) -> Result<Payment, LedgerError> {
        let lease = self.load(lease_id)?;
        let start = billing_anchor(&lease)?;

        let payments = self.store.payments_by_lease(lease_id)?;
        if billing::is_paid_for_cycle(start, &payments, today) {
            return Err(DomainConflict::AlreadyPaidForCycle {
                lease: lease_id,
                cycle_start: billing::cycle_start(start, today),
            }
            .into());
        }
        if amount != lease.monthly_rent {
            return Err(DomainConflict::AmountMismatch {
                lease: lease_id,
                expected: lease.monthly_rent,
                actual: amount,
            }
            .into());
        }

        let payment = self.store.insert_payment(Payment::new(
            PaymentId(0),
            lease_id,
            amount,
            today,
            method,
            PaymentStatus::Completed,
        ))?;

        info!(%lease_id, payment_id = %payment.id, %amount, "rent payment recorded");
        publish_best_effort(
            self.activity.as_ref(),
            LedgerEvent::new("payment_recorded", "payment", payment.id)
                .detail("lease_id", lease_id)
                .detail("amount", amount),
        );
        Ok(payment)
    }

    pub fn is_rent_paid_for_current_cycle(
        &self,
        lease_id: LeaseId,
        today: NaiveDate,
    ) -> Result<bool, LedgerError> {
        let lease = self.load(lease_id)?;
        let start = billing_anchor(&lease)?;
        let payments = self.store.payments_by_lease(lease_id)?;
        Ok(billing::is_paid_for_cycle(start, &payments, today))
    }

    pub fn rent_status(
        &self,
        lease_id: LeaseId,
        today: NaiveDate,
    ) -> Result<RentStatus, LedgerError> {
        let lease = self.load(lease_id)?;
        let start = billing_anchor(&lease)?;
        let payments = self.store.payments_by_lease(lease_id)?;
        Ok(billing::rent_status(start, &payments, today))
    }

    pub fn payments_for_lease(&self, lease_id: LeaseId) -> Result<Vec<Payment>, LedgerError> {
        self.load(lease_id)?;
        Ok(self.store.payments_by_lease(lease_id)?)
    }

    /// Most recent completed payment on the lease, if any.
    pub fn latest_payment(&self, lease_id: LeaseId) -> Result<Option<Payment>, LedgerError> {
        let latest = self
            .payments_for_lease(lease_id)?
            .into_iter()
            .filter(Payment::is_completed)
            .max_by_key(|payment| (payment.payment_date, payment.id));
        Ok(latest)
    }

    fn load(&self, lease_id: LeaseId) -> Result<Lease, LedgerError> {
        let lease = self
            .store
            .lease(lease_id)?
            .ok_or_else(|| RepositoryError::not_found("lease", lease_id))?;
        Ok(lease)
    }
}

fn billing_anchor(lease: &Lease) -> Result<NaiveDate, LedgerError> {
    lease
        .start_date
        .ok_or(LedgerError::MissingBillingAnchor(lease.id))
}
