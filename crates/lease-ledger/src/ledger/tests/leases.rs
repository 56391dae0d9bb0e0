use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use super::common::*;
use crate::ledger::domain::{
    Lease, LeaseId, LeaseInvitation, LeaseStatus, Property, PropertyId, PropertyStatus,
    TerminationDecision, TerminationStatus, UserId,
};
use crate::ledger::error::{DomainConflict, LedgerError, TransitionError};
use crate::ledger::leases::{LeaseConfig, LeaseService, TerminationPropertyRule};
use crate::ledger::memory::MemoryStore;
use crate::ledger::repository::{LeaseRepository, PropertyRepository, RepositoryError};

fn lease_service(
    store: &Arc<MemoryStore>,
) -> (
    LeaseService<MemoryStore, RecordingPublisher>,
    Arc<RecordingPublisher>,
) {
    let activity = Arc::new(RecordingPublisher::default());
    let service = LeaseService::new(store.clone(), activity.clone(), LeaseConfig::default());
    (service, activity)
}

fn property_status(store: &MemoryStore, id: PropertyId) -> PropertyStatus {
    store
        .property(id)
        .expect("lookup succeeds")
        .expect("property present")
        .status
}

fn end_lease_on(store: &MemoryStore, end: NaiveDate) {
    let mut lease = store.lease(LEASE).expect("lookup").expect("present");
    lease.end_date = Some(end);
    store.save_lease(&lease).expect("lease saved");
}

/// Store that lets an admin decision land between the sweep listing its candidates and
/// expiring them.
struct InterleavedStore {
    inner: Arc<MemoryStore>,
    between: Box<dyn Fn(&Arc<MemoryStore>) + Send + Sync>,
}

impl LeaseRepository for InterleavedStore {
    fn insert_lease(&self, lease: Lease) -> Result<Lease, RepositoryError> {
        self.inner.insert_lease(lease)
    }

    fn lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        self.inner.lease(id)
    }

    fn save_lease(&self, lease: &Lease) -> Result<(), RepositoryError> {
        self.inner.save_lease(lease)
    }

    fn leases_by_status(&self, status: LeaseStatus) -> Result<Vec<Lease>, RepositoryError> {
        self.inner.leases_by_status(status)
    }

    fn leases_by_termination_status(
        &self,
        status: TerminationStatus,
    ) -> Result<Vec<Lease>, RepositoryError> {
        self.inner.leases_by_termination_status(status)
    }

    fn leases_by_tenant(&self, tenant: UserId) -> Result<Vec<Lease>, RepositoryError> {
        self.inner.leases_by_tenant(tenant)
    }

    fn leases_by_owner(&self, owner: UserId) -> Result<Vec<Lease>, RepositoryError> {
        self.inner.leases_by_owner(owner)
    }

    fn active_leases_ending_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Lease>, RepositoryError> {
        let candidates = self.inner.active_leases_ending_between(from, to)?;
        (self.between)(&self.inner);
        Ok(candidates)
    }
}

impl PropertyRepository for InterleavedStore {
    fn property(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.inner.property(id)
    }

    fn save_property(&self, property: &Property) -> Result<(), RepositoryError> {
        self.inner.save_property(property)
    }

    fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>, RepositoryError> {
        self.inner.properties_by_owner(owner)
    }

    fn count_flagged_by_owner(&self, owner: UserId) -> Result<u32, RepositoryError> {
        self.inner.count_flagged_by_owner(owner)
    }
}

/// Sweep over `store` during which an admin decides the pending termination of [`LEASE`].
fn sweep_racing_decision(
    store: &Arc<MemoryStore>,
    decision: TerminationDecision,
) -> LeaseService<InterleavedStore, RecordingPublisher> {
    let interleaved = InterleavedStore {
        inner: store.clone(),
        between: Box::new(move |inner| {
            let (admin, _) = lease_service(inner);
            admin
                .decide_termination(LEASE, decision)
                .expect("admin decision applied");
        }),
    };
    LeaseService::new(
        Arc::new(interleaved),
        Arc::new(RecordingPublisher::default()),
        LeaseConfig::default(),
    )
}

fn invitation(property_id: PropertyId) -> LeaseInvitation {
    LeaseInvitation {
        property_id,
        start_date: date(2024, 5, 1),
        end_date: Some(date(2025, 4, 30)),
        monthly_rent: rent(),
    }
}

#[test]
fn accepting_an_invitation_creates_pending_lease_and_rents_property() {
    let store = seeded_store();
    let vacant = PropertyId(11);
    store.add_property(property(vacant, LANDLORD, PropertyStatus::Available));
    let (service, activity) = lease_service(&store);

    let lease = service
        .accept_invitation(invitation(vacant), UserId(3), at(2024, 4, 20, 12))
        .expect("invitation accepted");

    assert_eq!(lease.status, LeaseStatus::Pending);
    assert_eq!(lease.tenant_id, UserId(3));
    assert_eq!(lease.start_date, Some(date(2024, 5, 1)));
    assert_eq!(lease.id, LeaseId(101));
    assert_eq!(property_status(&store, vacant), PropertyStatus::Rented);
    assert_eq!(activity.actions(), vec!["lease_created".to_string()]);
}

#[test]
fn invitation_requires_positive_rent_and_known_property() {
    let store = seeded_store();
    let (service, _) = lease_service(&store);

    let mut free = invitation(PROPERTY);
    free.monthly_rent = dec!(0);
    match service.accept_invitation(free, TENANT, at(2024, 4, 20, 12)) {
        Err(LedgerError::Conflict(DomainConflict::NonPositiveRent(_))) => {}
        other => panic!("expected rent conflict, got {other:?}"),
    }

    match service.accept_invitation(invitation(PropertyId(404)), TENANT, at(2024, 4, 20, 12)) {
        Err(LedgerError::Repository(RepositoryError::NotFound {
            entity: "property",
            id: 404,
        })) => {}
        other => panic!("expected missing property, got {other:?}"),
    }
}

#[test]
fn pending_lease_is_approved_or_rejected_once() {
    let store = seeded_store();
    store.add_lease(lease(LeaseId(101), PROPERTY, None, LeaseStatus::Pending));
    store.add_lease(lease(LeaseId(102), PROPERTY, None, LeaseStatus::Pending));
    let (service, _) = lease_service(&store);

    let approved = service.approve_lease(LeaseId(101)).expect("approve");
    assert_eq!(approved.status, LeaseStatus::Active);
    let rejected = service.reject_lease(LeaseId(102)).expect("reject");
    assert_eq!(rejected.status, LeaseStatus::Terminated);
    assert_eq!(rejected.termination_status, TerminationStatus::NotRequested);

    match service.approve_lease(LeaseId(102)) {
        Err(LedgerError::Transition(TransitionError {
            action: "approve",
            state: "terminated",
            ..
        })) => {}
        other => panic!("expected illegal transition, got {other:?}"),
    }
    assert!(service.reject_lease(LeaseId(101)).is_err());
}

#[test]
fn approved_termination_ends_lease_and_keeps_property_rented() {
    let store = seeded_store();
    let (service, activity) = lease_service(&store);

    let requested = service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");
    assert_eq!(requested.status, LeaseStatus::Active);
    assert_eq!(requested.termination_status, TerminationStatus::Pending);
    assert_eq!(requested.termination_requested_at, Some(date(2024, 6, 1)));
    assert_eq!(service.pending_terminations().expect("query").len(), 1);

    let decided = service
        .decide_termination(LEASE, TerminationDecision::Approved)
        .expect("decision applied");
    assert_eq!(decided.status, LeaseStatus::Terminated);
    assert_eq!(decided.termination_status, TerminationStatus::Approved);
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Rented);
    assert_eq!(
        activity.actions(),
        vec![
            "termination_requested".to_string(),
            "termination_decided".to_string()
        ]
    );
}

#[test]
fn release_rule_frees_property_on_approved_termination() {
    let store = seeded_store();
    let config = LeaseConfig {
        termination_property_rule: TerminationPropertyRule::from_release_flag(true),
    };
    let service = LeaseService::new(store.clone(), Arc::new(RecordingPublisher::default()), config);

    service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");
    service
        .decide_termination(LEASE, TerminationDecision::Approved)
        .expect("decision applied");

    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Available);
}

#[test]
fn rejected_termination_is_final() {
    let store = seeded_store();
    let (service, _) = lease_service(&store);

    service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");
    let decided = service
        .decide_termination(LEASE, TerminationDecision::Rejected)
        .expect("decision applied");
    assert_eq!(decided.status, LeaseStatus::Active);
    assert_eq!(decided.termination_status, TerminationStatus::Rejected);

    match service.request_termination(LEASE, date(2024, 7, 1)) {
        Err(LedgerError::Transition(error)) => {
            assert_eq!(error.state, "termination rejected");
        }
        other => panic!("expected closed workflow, got {other:?}"),
    }
    assert!(service
        .decide_termination(LEASE, TerminationDecision::Approved)
        .is_err());
}

#[test]
fn termination_requires_an_active_lease() {
    let store = seeded_store();
    store.add_lease(lease(LeaseId(101), PROPERTY, None, LeaseStatus::Pending));
    let (service, _) = lease_service(&store);

    let error = service
        .request_termination(LeaseId(101), date(2024, 6, 1))
        .expect_err("pending lease cannot be terminated");
    assert_eq!(
        error.to_string(),
        "cannot request termination of lease 101 while it is pending"
    );
    assert!(service
        .decide_termination(LEASE, TerminationDecision::Approved)
        .is_err());
}

#[test]
fn expiration_sweep_terminates_exactly_the_ended_active_leases() {
    let store = seeded_store();
    let today = date(2024, 6, 30);
    let properties = [
        (PropertyId(11), PropertyStatus::Rented),
        (PropertyId(12), PropertyStatus::Inactive),
        (PropertyId(13), PropertyStatus::Rented),
        (PropertyId(14), PropertyStatus::Rented),
    ];
    for (id, status) in properties {
        store.add_property(property(id, LANDLORD, status));
    }

    let ended = |id, property_id, end, status| {
        let mut entry = lease(LeaseId(id), property_id, Some(date(2023, 7, 1)), status);
        entry.end_date = end;
        entry
    };
    store.add_lease(ended(101, PropertyId(11), Some(today), LeaseStatus::Active));
    store.add_lease(ended(102, PropertyId(12), Some(date(2024, 6, 1)), LeaseStatus::Active));
    store.add_lease(ended(103, PropertyId(13), Some(date(2024, 7, 1)), LeaseStatus::Active));
    store.add_lease(ended(104, PropertyId(14), Some(date(2024, 6, 1)), LeaseStatus::Pending));

    let (service, _) = lease_service(&store);
    let report = service.expire_leases(today).expect("sweep runs");

    assert_eq!(report.succeeded, 2);
    assert!(report.is_clean());
    let status = |id| {
        store
            .lease(LeaseId(id))
            .expect("lookup")
            .expect("present")
            .status
    };
    assert_eq!(status(101), LeaseStatus::Terminated);
    assert_eq!(status(102), LeaseStatus::Terminated);
    assert_eq!(status(103), LeaseStatus::Active);
    assert_eq!(status(104), LeaseStatus::Pending);
    assert_eq!(status(100), LeaseStatus::Active);

    assert_eq!(property_status(&store, PropertyId(11)), PropertyStatus::Available);
    assert_eq!(property_status(&store, PropertyId(12)), PropertyStatus::Inactive);
    assert_eq!(property_status(&store, PropertyId(13)), PropertyStatus::Rented);
    assert_eq!(property_status(&store, PropertyId(14)), PropertyStatus::Rented);
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Rented);
}

#[test]
fn expiration_sweep_records_failures_and_continues() {
    let store = seeded_store();
    let mut orphan = lease(LeaseId(101), PropertyId(404), None, LeaseStatus::Active);
    orphan.end_date = Some(date(2024, 1, 1));
    store.add_lease(orphan);
    let mut due = lease(LeaseId(102), PROPERTY, None, LeaseStatus::Active);
    due.end_date = Some(date(2024, 2, 1));
    store.add_lease(due);

    let (service, _) = lease_service(&store);
    let report = service.expire_leases(date(2024, 3, 1)).expect("sweep runs");

    assert_eq!(report.attempted(), 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures[0].key, LeaseId(101));
    let orphan = store.lease(LeaseId(101)).expect("lookup").expect("present");
    assert_eq!(orphan.status, LeaseStatus::Active);
}

#[test]
fn publisher_failures_do_not_undo_transitions() {
    let store = seeded_store();
    let service = LeaseService::new(
        store.clone(),
        Arc::new(FailingPublisher),
        LeaseConfig::default(),
    );

    let lease = service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("transition survives publisher failure");
    assert_eq!(lease.termination_status, TerminationStatus::Pending);
    assert_eq!(
        service.lease_status(LEASE).expect("status").termination_status,
        TerminationStatus::Pending
    );
}

#[test]
fn lease_queries_filter_by_party_and_window() {
    let store = seeded_store();
    let mut ending = lease(LeaseId(101), PROPERTY, None, LeaseStatus::Active);
    ending.end_date = Some(date(2024, 8, 31));
    store.add_lease(ending);
    store.add_lease(lease(LeaseId(102), PropertyId(404), None, LeaseStatus::Pending));
    let (service, _) = lease_service(&store);

    assert_eq!(service.leases_for_tenant(TENANT).expect("query").len(), 3);
    assert_eq!(service.leases_for_owner(LANDLORD).expect("query").len(), 2);
    assert_eq!(service.pending_leases().expect("query").len(), 1);

    let expiring = service
        .leases_expiring_between(date(2024, 8, 1), date(2024, 9, 30))
        .expect("query");
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, LeaseId(101));

    match service.lease_status(LeaseId(999)) {
        Err(error) if error.is_not_found() => {}
        other => panic!("expected missing lease, got {other:?}"),
    }
}

#[test]
fn termination_cannot_be_decided_once_the_lease_expired() {
    let store = seeded_store();
    end_lease_on(&store, date(2024, 6, 30));
    let (service, _) = lease_service(&store);

    service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");
    let report = service.expire_leases(date(2024, 7, 1)).expect("sweep runs");
    assert_eq!(report.succeeded, 1);
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Available);

    match service.decide_termination(LEASE, TerminationDecision::Approved) {
        Err(LedgerError::Transition(error)) => {
            assert_eq!(error.action, "decide termination of");
            assert_eq!(error.state, "terminated");
        }
        other => panic!("expected illegal transition, got {other:?}"),
    }
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Available);
    let lease = store.lease(LEASE).expect("lookup").expect("present");
    assert_eq!(lease.status, LeaseStatus::Terminated);
    assert_eq!(lease.termination_status, TerminationStatus::Pending);
}

#[test]
fn expiration_keeps_a_termination_decided_mid_sweep() {
    let store = seeded_store();
    end_lease_on(&store, date(2024, 6, 30));
    let (service, _) = lease_service(&store);
    service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");

    let sweeper = sweep_racing_decision(&store, TerminationDecision::Rejected);
    let report = sweeper.expire_leases(date(2024, 7, 1)).expect("sweep runs");

    assert_eq!(report.succeeded, 1);
    let lease = store.lease(LEASE).expect("lookup").expect("present");
    assert_eq!(lease.status, LeaseStatus::Terminated);
    assert_eq!(lease.termination_status, TerminationStatus::Rejected);
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Available);
}

#[test]
fn expiration_skips_a_lease_terminated_mid_sweep() {
    let store = seeded_store();
    end_lease_on(&store, date(2024, 6, 30));
    let (service, _) = lease_service(&store);
    service
        .request_termination(LEASE, date(2024, 6, 1))
        .expect("request accepted");

    let sweeper = sweep_racing_decision(&store, TerminationDecision::Approved);
    let report = sweeper.expire_leases(date(2024, 7, 1)).expect("sweep runs");

    assert!(report.is_clean());
    let lease = store.lease(LEASE).expect("lookup").expect("present");
    assert_eq!(lease.status, LeaseStatus::Terminated);
    assert_eq!(lease.termination_status, TerminationStatus::Approved);
    assert_eq!(property_status(&store, PROPERTY), PropertyStatus::Rented);
}
