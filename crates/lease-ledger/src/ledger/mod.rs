//! Lease lifecycle, rent billing, and reputation scoring for the rental marketplace.
//!
//! Services are generic over the repository traits in [`repository`] and publish activity through
//! [`ActivityPublisher`] after their writes succeed. [`MemoryStore`] backs every trait in-process.

pub mod batch;
pub mod billing;
pub mod domain;
pub mod error;
pub mod events;
pub mod lateness;
pub mod leases;
pub mod maintenance;
pub mod memory;
pub mod payments;
pub mod repository;
pub mod router;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use batch::{BatchFailure, BatchReport};
pub use billing::{BillingCycle, RentStatus};
pub use domain::{
    LandlordStats, LatenessFlag, Lease, LeaseId, LeaseInvitation, LeaseStatus,
    MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, Payment, PaymentId,
    PaymentMethod, PaymentStatus, Property, PropertyId, PropertyStatus, Review, ReviewId,
    ReviewType, Role, TenantStats, TerminationDecision, TerminationStatus, User, UserId,
};
pub use error::{DomainConflict, LedgerError, TransitionError};
pub use events::{ActivityPublisher, LedgerEvent, LogPublisher, PublishError};
pub use lateness::LatenessEvaluator;
pub use leases::{LeaseConfig, LeaseService, LeaseStatusView, TerminationPropertyRule};
pub use maintenance::MaintenanceService;
pub use memory::{LedgerSnapshot, MemoryStore, SnapshotError};
pub use payments::PaymentService;
pub use repository::{LedgerStore, RepositoryError};
pub use router::stats_router;
pub use scoring::{
    LandlordScoreBreakdown, LandlordWeights, ReputationService, ScoringWeights,
    TenantScoreBreakdown, TenantWeights, WeightsError,
};
