use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::domain::LeaseId;
use super::repository::RepositoryError;

/// Rejected attempt to move an entity out of a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} {entity} {id} while it is {state}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub id: u64,
    pub action: &'static str,
    pub state: &'static str,
}

/// Business rule violations detected before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainConflict {
    #[error("payment for lease {lease} must equal the monthly rent {expected}, got {actual}")]
    AmountMismatch {
        lease: LeaseId,
        expected: Decimal,
        actual: Decimal,
    },
    #[error("rent for lease {lease} is already paid for the cycle starting {cycle_start}")]
    AlreadyPaidForCycle {
        lease: LeaseId,
        cycle_start: NaiveDate,
    },
    #[error("monthly rent must be positive, got {0}")]
    NonPositiveRent(Decimal),
}

/// Error raised by the ledger services.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Conflict(#[from] DomainConflict),
    #[error("lease {0} has no start date to anchor its billing cycle")]
    MissingBillingAnchor(LeaseId),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::Repository(RepositoryError::NotFound { .. })
        )
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, LedgerError::Repository(err) if err.is_version_conflict())
    }
}
