use chrono::NaiveDate;

use super::domain::{
    LandlordStats, LatenessFlag, Lease, LeaseId, LeaseStatus, MaintenanceRequest,
    MaintenanceRequestId, Payment, PaymentId, Property, PropertyId, Review, ReviewType, Role,
    TenantStats, TerminationStatus, UserId,
};

/// Lease lookups and writes.
pub trait LeaseRepository: Send + Sync {
    /// Persists a new lease, assigning its identifier.
    fn insert_lease(&self, lease: Lease) -> Result<Lease, RepositoryError>;
    fn lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError>;
    fn save_lease(&self, lease: &Lease) -> Result<(), RepositoryError>;
    fn leases_by_status(&self, status: LeaseStatus) -> Result<Vec<Lease>, RepositoryError>;
    fn leases_by_termination_status(
        &self,
        status: TerminationStatus,
    ) -> Result<Vec<Lease>, RepositoryError>;
    fn leases_by_tenant(&self, tenant: UserId) -> Result<Vec<Lease>, RepositoryError>;
    /// Leases on every property owned by `owner`.
    fn leases_by_owner(&self, owner: UserId) -> Result<Vec<Lease>, RepositoryError>;
    /// Active leases whose end date falls inside `[from, to]`, ordered by end date.
    fn active_leases_ending_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Lease>, RepositoryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn property(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn save_property(&self, property: &Property) -> Result<(), RepositoryError>;
    fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>, RepositoryError>;
    fn count_flagged_by_owner(&self, owner: UserId) -> Result<u32, RepositoryError>;
}

pub trait PaymentRepository: Send + Sync {
    /// Persists a new payment, assigning its identifier.
    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    fn payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError>;
    fn payments_by_lease(&self, lease: LeaseId) -> Result<Vec<Payment>, RepositoryError>;
    /// Completed payments across every lease held by `tenant`.
    fn completed_payments_by_tenant(&self, tenant: UserId)
        -> Result<Vec<Payment>, RepositoryError>;
    fn unevaluated_payments(&self) -> Result<Vec<Payment>, RepositoryError>;
    /// Atomically records lateness verdicts, skipping any payment that is no longer
    /// unevaluated. Returns the number of verdicts actually applied.
    fn settle_lateness(&self, verdicts: &[(PaymentId, LatenessFlag)])
        -> Result<usize, RepositoryError>;
}

pub trait MaintenanceRepository: Send + Sync {
    fn insert_request(
        &self,
        request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError>;
    fn request(
        &self,
        id: MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError>;
    fn save_request(&self, request: &MaintenanceRequest) -> Result<(), RepositoryError>;
    /// Completed requests filed against leases on any of `properties`.
    fn completed_requests_for_properties(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError>;
}

pub trait ReviewRepository: Send + Sync {
    fn reviews_about(
        &self,
        subject: UserId,
        review_type: ReviewType,
    ) -> Result<Vec<Review>, RepositoryError>;
}

/// Materialized score snapshots guarded by an optimistic version counter.
///
/// A save succeeds only when the incoming `version` equals the stored one (or is `0` for a row
/// that does not exist yet); the stored copy is returned with its version incremented.
pub trait StatsRepository: Send + Sync {
    fn landlord_stats(&self, id: UserId) -> Result<Option<LandlordStats>, RepositoryError>;
    fn all_landlord_stats(&self) -> Result<Vec<LandlordStats>, RepositoryError>;
    fn save_landlord_stats(&self, stats: LandlordStats) -> Result<LandlordStats, RepositoryError>;
    fn tenant_stats(&self, id: UserId) -> Result<Option<TenantStats>, RepositoryError>;
    fn all_tenant_stats(&self) -> Result<Vec<TenantStats>, RepositoryError>;
    fn save_tenant_stats(&self, stats: TenantStats) -> Result<TenantStats, RepositoryError>;
}

pub trait UserDirectory: Send + Sync {
    fn users_with_role(&self, role: Role) -> Result<Vec<UserId>, RepositoryError>;
}

/// Every capability the ledger services consume from persistence.
pub trait LedgerStore:
    LeaseRepository
    + PropertyRepository
    + PaymentRepository
    + MaintenanceRepository
    + ReviewRepository
    + StatsRepository
    + UserDirectory
{
}

impl<T> LedgerStore for T where
    T: LeaseRepository
        + PropertyRepository
        + PaymentRepository
        + MaintenanceRepository
        + ReviewRepository
        + StatsRepository
        + UserDirectory
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        entity: &'static str,
        id: u64,
        expected: u64,
        found: u64,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, RepositoryError::VersionConflict { .. })
    }
}
