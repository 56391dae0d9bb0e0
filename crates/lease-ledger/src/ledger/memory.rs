use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    LandlordStats, LatenessFlag, Lease, LeaseId, LeaseStatus, MaintenanceRequest,
    MaintenanceRequestId, Payment, PaymentId, Property, PropertyId, Review, ReviewId, ReviewType,
    Role, TenantStats, TerminationStatus, User, UserId,
};
use super::repository::{
    LeaseRepository, MaintenanceRepository, PaymentRepository, PropertyRepository,
    RepositoryError, ReviewRepository, StatsRepository, UserDirectory,
};

/// Serializable dump of marketplace data used to seed a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub leases: Vec<Lease>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub maintenance_requests: Vec<MaintenanceRequest>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl LedgerSnapshot {
    /// Parses a JSON snapshot and rejects review ratings outside 1-5.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: LedgerSnapshot = serde_json::from_str(raw)?;
        if let Some(review) = snapshot
            .reviews
            .iter()
            .find(|review| !(1..=5).contains(&review.rating))
        {
            return Err(SnapshotError::InvalidRating {
                review: review.id,
                rating: review.rating,
            });
        }
        Ok(snapshot)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("unable to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("review {review} has rating {rating}; ratings run from 1 to 5")]
    InvalidRating { review: ReviewId, rating: u8 },
}

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    properties: BTreeMap<PropertyId, Property>,
    leases: BTreeMap<LeaseId, Lease>,
    payments: BTreeMap<PaymentId, Payment>,
    requests: BTreeMap<MaintenanceRequestId, MaintenanceRequest>,
    reviews: Vec<Review>,
    landlord_stats: BTreeMap<UserId, LandlordStats>,
    tenant_stats: BTreeMap<UserId, TenantStats>,
}

impl StoreState {
    fn owner_of(&self, lease: &Lease) -> Option<UserId> {
        self.properties
            .get(&lease.property_id)
            .map(|property| property.owner_id)
    }
}

fn next_key<K: Copy + Into<u64>, V>(map: &BTreeMap<K, V>) -> u64 {
    map.keys().next_back().map_or(1, |key| {
        let last: u64 = (*key).into();
        last + 1
    })
}

/// Process-local ledger store. All capabilities share one lock, so multi-row operations such as
/// the lateness claim and the stats compare-and-swap are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let store = Self::new();
        store.seed(snapshot);
        store
    }

    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_snapshot(LedgerSnapshot::from_json(&raw)?))
    }

    pub fn seed(&self, snapshot: LedgerSnapshot) {
        let mut state = self.guard();
        state
            .users
            .extend(snapshot.users.into_iter().map(|user| (user.id, user)));
        state.properties.extend(
            snapshot
                .properties
                .into_iter()
                .map(|property| (property.id, property)),
        );
        state
            .leases
            .extend(snapshot.leases.into_iter().map(|lease| (lease.id, lease)));
        state.payments.extend(
            snapshot
                .payments
                .into_iter()
                .map(|payment| (payment.id, payment)),
        );
        state.requests.extend(
            snapshot
                .maintenance_requests
                .into_iter()
                .map(|request| (request.id, request)),
        );
        state.reviews.extend(snapshot.reviews);
    }

    pub fn add_user(&self, user: User) {
        self.guard().users.insert(user.id, user);
    }

    pub fn add_property(&self, property: Property) {
        self.guard().properties.insert(property.id, property);
    }

    pub fn add_lease(&self, lease: Lease) {
        self.guard().leases.insert(lease.id, lease);
    }

    pub fn add_payment(&self, payment: Payment) {
        self.guard().payments.insert(payment.id, payment);
    }

    pub fn add_maintenance_request(&self, request: MaintenanceRequest) {
        self.guard().requests.insert(request.id, request);
    }

    pub fn add_review(&self, review: Review) {
        self.guard().reviews.push(review);
    }

    fn guard(&self) -> MutexGuard<'_, StoreState> {
        // Seeding helpers hold no invariants across a panic, so a poisoned lock is recovered.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl LeaseRepository for MemoryStore {
    fn insert_lease(&self, mut lease: Lease) -> Result<Lease, RepositoryError> {
        let mut state = self.state()?;
        lease.id = LeaseId(next_key(&state.leases));
        state.leases.insert(lease.id, lease.clone());
        Ok(lease)
    }

    fn lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        Ok(self.state()?.leases.get(&id).cloned())
    }

    fn save_lease(&self, lease: &Lease) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.leases.get_mut(&lease.id) {
            Some(stored) => {
                *stored = lease.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("lease", lease.id)),
        }
    }

    fn leases_by_status(&self, status: LeaseStatus) -> Result<Vec<Lease>, RepositoryError> {
        Ok(self
            .state()?
            .leases
            .values()
            .filter(|lease| lease.status == status)
            .cloned()
            .collect())
    }

    fn leases_by_termination_status(
        &self,
        status: TerminationStatus,
    ) -> Result<Vec<Lease>, RepositoryError> {
        Ok(self
            .state()?
            .leases
            .values()
            .filter(|lease| lease.termination_status == status)
            .cloned()
            .collect())
    }

    fn leases_by_tenant(&self, tenant: UserId) -> Result<Vec<Lease>, RepositoryError> {
        Ok(self
            .state()?
            .leases
            .values()
            .filter(|lease| lease.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn leases_by_owner(&self, owner: UserId) -> Result<Vec<Lease>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .leases
            .values()
            .filter(|lease| state.owner_of(lease) == Some(owner))
            .cloned()
            .collect())
    }

    fn active_leases_ending_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Lease>, RepositoryError> {
        let mut leases: Vec<Lease> = self
            .state()?
            .leases
            .values()
            .filter(|lease| lease.is_active())
            .filter(|lease| lease.end_date.is_some_and(|end| from <= end && end <= to))
            .cloned()
            .collect();
        leases.sort_by_key(|lease| (lease.end_date, lease.id));
        Ok(leases)
    }
}

impl PropertyRepository for MemoryStore {
    fn property(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.state()?.properties.get(&id).cloned())
    }

    fn save_property(&self, property: &Property) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.properties.get_mut(&property.id) {
            Some(stored) => {
                *stored = property.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("property", property.id)),
        }
    }

    fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>, RepositoryError> {
        Ok(self
            .state()?
            .properties
            .values()
            .filter(|property| property.owner_id == owner)
            .cloned()
            .collect())
    }

    fn count_flagged_by_owner(&self, owner: UserId) -> Result<u32, RepositoryError> {
        let count = self
            .state()?
            .properties
            .values()
            .filter(|property| property.owner_id == owner && property.is_flagged)
            .count();
        Ok(count as u32)
    }
}

impl PaymentRepository for MemoryStore {
    fn insert_payment(&self, mut payment: Payment) -> Result<Payment, RepositoryError> {
        let mut state = self.state()?;
        if !state.leases.contains_key(&payment.lease_id) {
            return Err(RepositoryError::not_found("lease", payment.lease_id));
        }
        payment.id = PaymentId(next_key(&state.payments));
        state.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.state()?.payments.get(&id).cloned())
    }

    fn payments_by_lease(&self, lease: LeaseId) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .state()?
            .payments
            .values()
            .filter(|payment| payment.lease_id == lease)
            .cloned()
            .collect())
    }

    fn completed_payments_by_tenant(
        &self,
        tenant: UserId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .payments
            .values()
            .filter(|payment| payment.is_completed())
            .filter(|payment| {
                state
                    .leases
                    .get(&payment.lease_id)
                    .is_some_and(|lease| lease.tenant_id == tenant)
            })
            .cloned()
            .collect())
    }

    fn unevaluated_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .state()?
            .payments
            .values()
            .filter(|payment| !payment.lateness().is_settled())
            .cloned()
            .collect())
    }

    fn settle_lateness(
        &self,
        verdicts: &[(PaymentId, LatenessFlag)],
    ) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let mut applied = 0;
        for (id, flag) in verdicts {
            if let Some(payment) = state.payments.get_mut(id) {
                if payment.settle_lateness(*flag) {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }
}

impl MaintenanceRepository for MemoryStore {
    fn insert_request(
        &self,
        mut request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        let mut state = self.state()?;
        if !state.leases.contains_key(&request.lease_id) {
            return Err(RepositoryError::not_found("lease", request.lease_id));
        }
        request.id = MaintenanceRequestId(next_key(&state.requests));
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn request(
        &self,
        id: MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        Ok(self.state()?.requests.get(&id).cloned())
    }

    fn save_request(&self, request: &MaintenanceRequest) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.requests.get_mut(&request.id) {
            Some(stored) => {
                *stored = request.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("maintenance request", request.id)),
        }
    }

    fn completed_requests_for_properties(
        &self,
        properties: &[PropertyId],
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let wanted: BTreeSet<PropertyId> = properties.iter().copied().collect();
        let state = self.state()?;
        Ok(state
            .requests
            .values()
            .filter(|request| request.is_completed())
            .filter(|request| {
                state
                    .leases
                    .get(&request.lease_id)
                    .is_some_and(|lease| wanted.contains(&lease.property_id))
            })
            .cloned()
            .collect())
    }
}

impl ReviewRepository for MemoryStore {
    fn reviews_about(
        &self,
        subject: UserId,
        review_type: ReviewType,
    ) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .state()?
            .reviews
            .iter()
            .filter(|review| review.review_type == review_type && review.subject() == subject)
            .cloned()
            .collect())
    }
}

impl StatsRepository for MemoryStore {
    fn landlord_stats(&self, id: UserId) -> Result<Option<LandlordStats>, RepositoryError> {
        Ok(self.state()?.landlord_stats.get(&id).cloned())
    }

    fn all_landlord_stats(&self) -> Result<Vec<LandlordStats>, RepositoryError> {
        Ok(self.state()?.landlord_stats.values().cloned().collect())
    }

    fn save_landlord_stats(
        &self,
        mut stats: LandlordStats,
    ) -> Result<LandlordStats, RepositoryError> {
        let mut state = self.state()?;
        let found = state
            .landlord_stats
            .get(&stats.landlord_id)
            .map_or(0, |stored| stored.version);
        if found != stats.version {
            return Err(RepositoryError::VersionConflict {
                entity: "landlord stats",
                id: stats.landlord_id.0,
                expected: stats.version,
                found,
            });
        }
        stats.version += 1;
        state.landlord_stats.insert(stats.landlord_id, stats.clone());
        Ok(stats)
    }

    fn tenant_stats(&self, id: UserId) -> Result<Option<TenantStats>, RepositoryError> {
        Ok(self.state()?.tenant_stats.get(&id).cloned())
    }

    fn all_tenant_stats(&self) -> Result<Vec<TenantStats>, RepositoryError> {
        Ok(self.state()?.tenant_stats.values().cloned().collect())
    }

    fn save_tenant_stats(&self, mut stats: TenantStats) -> Result<TenantStats, RepositoryError> {
        let mut state = self.state()?;
        let found = state
            .tenant_stats
            .get(&stats.tenant_id)
            .map_or(0, |stored| stored.version);
        if found != stats.version {
            return Err(RepositoryError::VersionConflict {
                entity: "tenant stats",
                id: stats.tenant_id.0,
                expected: stats.version,
                found,
            });
        }
        stats.version += 1;
        state.tenant_stats.insert(stats.tenant_id, stats.clone());
        Ok(stats)
    }
}

impl UserDirectory for MemoryStore {
    fn users_with_role(&self, role: Role) -> Result<Vec<UserId>, RepositoryError> {
        Ok(self
            .state()?
            .users
            .values()
            .filter(|user| user.role == role)
            .map(|user| user.id)
            .collect())
    }
}
