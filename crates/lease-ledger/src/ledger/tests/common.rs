use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::ledger::domain::{
    Lease, LeaseId, LeaseStatus, MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus,
    Payment, PaymentId, PaymentMethod, PaymentStatus, Property, PropertyId, PropertyStatus,
    Review, ReviewId, ReviewType, Role, TerminationStatus, User, UserId,
};
use crate::ledger::events::{ActivityPublisher, LedgerEvent, PublishError};
use crate::ledger::memory::MemoryStore;

pub(super) const LANDLORD: UserId = UserId(1);
pub(super) const TENANT: UserId = UserId(2);
pub(super) const PROPERTY: PropertyId = PropertyId(10);
pub(super) const LEASE: LeaseId = LeaseId(100);

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

pub(super) fn rent() -> Decimal {
    dec!(1200.00)
}

pub(super) fn property(id: PropertyId, owner: UserId, status: PropertyStatus) -> Property {
    Property {
        id,
        owner_id: owner,
        address: format!("{} Harbor Street", id.0),
        status,
        is_flagged: false,
    }
}

pub(super) fn lease(
    id: LeaseId,
    property_id: PropertyId,
    start: Option<NaiveDate>,
    status: LeaseStatus,
) -> Lease {
    Lease {
        id,
        tenant_id: TENANT,
        property_id,
        start_date: start,
        end_date: None,
        monthly_rent: rent(),
        status,
        termination_status: TerminationStatus::NotRequested,
        termination_requested_at: None,
        created_at: at(2023, 12, 20, 9),
    }
}

pub(super) fn payment(id: u64, lease_id: LeaseId, paid_on: NaiveDate) -> Payment {
    Payment::new(
        PaymentId(id),
        lease_id,
        rent(),
        paid_on,
        PaymentMethod::BankTransfer,
        PaymentStatus::Completed,
    )
}

pub(super) fn completed_request(
    id: u64,
    lease_id: LeaseId,
    opened: NaiveDateTime,
    closed: NaiveDateTime,
) -> MaintenanceRequest {
    MaintenanceRequest {
        id: MaintenanceRequestId(id),
        lease_id,
        description: "Leaking kitchen faucet".to_string(),
        status: MaintenanceStatus::Completed,
        created_at: opened,
        updated_at: closed,
        cost: None,
        is_fixed: Some(true),
    }
}

pub(super) fn review(id: u64, review_type: ReviewType, rating: u8) -> Review {
    Review {
        id: ReviewId(id),
        review_type,
        landlord_id: LANDLORD,
        tenant_id: TENANT,
        property_id: PROPERTY,
        rating,
    }
}

/// Landlord and tenant sharing one rented property with an active lease anchored on January 15.
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_user(User {
        id: LANDLORD,
        role: Role::Landlord,
    });
    store.add_user(User {
        id: TENANT,
        role: Role::Tenant,
    });
    store.add_property(property(PROPERTY, LANDLORD, PropertyStatus::Rented));
    store.add_lease(lease(
        LEASE,
        PROPERTY,
        Some(date(2024, 1, 15)),
        LeaseStatus::Active,
    ));
    Arc::new(store)
}

#[derive(Default)]
pub(super) struct RecordingPublisher {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingPublisher {
    pub(super) fn actions(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .iter()
            .map(|event| event.action.clone())
            .collect()
    }
}

impl ActivityPublisher for RecordingPublisher {
    fn publish(&self, event: LedgerEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingPublisher;

impl ActivityPublisher for FailingPublisher {
    fn publish(&self, _event: LedgerEvent) -> Result<(), PublishError> {
        Err(PublishError::Transport("notification queue offline".to_string()))
    }
}
