use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::info;

use super::batch::{self, BatchReport};
use super::billing::due_date_for;
use super::domain::{LatenessFlag, LeaseId, PaymentId};
use super::error::LedgerError;
use super::repository::{LeaseRepository, PaymentRepository, RepositoryError};

pub const LATENESS_JOB: &str = "payment-lateness";

/// Verdict for a payment made on `payment_date` against a lease anchored on `lease_start`.
pub fn lateness_for(lease_start: NaiveDate, payment_date: NaiveDate) -> LatenessFlag {
    let due_date = due_date_for(lease_start.day(), payment_date);
    LatenessFlag::from_late(payment_date > due_date)
}

/// Tags every unevaluated payment as on-time or late, exactly once.
pub struct LatenessEvaluator<S> {
    store: Arc<S>,
}

impl<S> LatenessEvaluator<S>
where
    S: LeaseRepository + PaymentRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Classifies pending payments and persists all verdicts in one conditional bulk write.
    ///
    /// `succeeded` counts verdicts the store actually applied; payments settled by a concurrent
    /// run in the meantime are left untouched. Payments whose lease has no start date are
    /// skipped, and a payment whose lease cannot be loaded is reported as a failure.
    pub fn evaluate(&self) -> Result<BatchReport<PaymentId>, LedgerError> {
        let pending = self.store.unevaluated_payments()?;
        let mut anchors: HashMap<LeaseId, Option<NaiveDate>> = HashMap::new();
        let mut verdicts: Vec<(PaymentId, LatenessFlag)> = Vec::with_capacity(pending.len());
        let mut skipped = 0usize;

        let store = &self.store;
        let mut report = batch::run(
            LATENESS_JOB,
            pending.into_iter().map(|payment| (payment.id, payment)),
            |payment| -> Result<(), LedgerError> {
                let anchor = match anchors.get(&payment.lease_id) {
                    Some(anchor) => *anchor,
                    None => {
                        let lease = store
                            .lease(payment.lease_id)?
                            .ok_or_else(|| RepositoryError::not_found("lease", payment.lease_id))?;
                        anchors.insert(lease.id, lease.start_date);
                        lease.start_date
                    }
                };

                match anchor {
                    Some(start) => {
                        verdicts.push((payment.id, lateness_for(start, payment.payment_date)));
                    }
                    None => skipped += 1,
                }
                Ok(())
            },
        );

        let applied = if verdicts.is_empty() {
            0
        } else {
            self.store.settle_lateness(&verdicts)?
        };
        report.succeeded = applied;

        info!(
            evaluated = verdicts.len(),
            applied,
            already_settled = verdicts.len().saturating_sub(applied),
            skipped_without_start = skipped,
            failed = report.failures.len(),
            "payment lateness evaluation finished"
        );
        Ok(report)
    }
}
