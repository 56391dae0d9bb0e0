use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Marketplace account identifier shared by landlords, tenants, and admins.
    UserId
);
entity_id!(LeaseId);
entity_id!(PropertyId);
entity_id!(PaymentId);
entity_id!(MaintenanceRequestId);
entity_id!(ReviewId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Landlord,
    Tenant,
    Admin,
}

/// Account entry used to enumerate scoring subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaseStatus {
    Pending,
    Active,
    Terminated,
}

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaseStatus::Pending => "pending",
            LeaseStatus::Active => "active",
            LeaseStatus::Terminated => "terminated",
        }
    }
}

/// Landlord-initiated termination workflow, tracked independently of [`LeaseStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationStatus {
    #[default]
    NotRequested,
    Pending,
    Approved,
    Rejected,
}

impl TerminationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TerminationStatus::NotRequested => "none",
            TerminationStatus::Pending => "pending",
            TerminationStatus::Approved => "approved",
            TerminationStatus::Rejected => "rejected",
        }
    }
}

/// Admin verdict on a pending termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub tenant_id: UserId,
    pub property_id: PropertyId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub status: LeaseStatus,
    #[serde(default)]
    pub termination_status: TerminationStatus,
    #[serde(default)]
    pub termination_requested_at: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl Lease {
    pub fn is_active(&self) -> bool {
        self.status == LeaseStatus::Active
    }

    /// Active leases whose end date has been reached are due for the expiration sweep.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.is_active() && self.end_date.is_some_and(|end| end <= today)
    }
}

/// Terms carried by an accepted tenant invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseInvitation {
    pub property_id: PropertyId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyStatus {
    Available,
    Rented,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub address: String,
    pub status: PropertyStatus,
    #[serde(default)]
    pub is_flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
    Cash,
}

/// Write-once punctuality classification of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatenessFlag {
    #[default]
    Unevaluated,
    OnTime,
    Late,
}

impl LatenessFlag {
    pub const fn from_late(late: bool) -> Self {
        if late {
            LatenessFlag::Late
        } else {
            LatenessFlag::OnTime
        }
    }

    pub const fn is_settled(self) -> bool {
        !matches!(self, LatenessFlag::Unevaluated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub lease_id: LeaseId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(default)]
    lateness: LatenessFlag,
}

impl Payment {
    pub fn new(
        id: PaymentId,
        lease_id: LeaseId,
        amount: Decimal,
        payment_date: NaiveDate,
        method: PaymentMethod,
        status: PaymentStatus,
    ) -> Self {
        Self {
            id,
            lease_id,
            amount,
            payment_date,
            method,
            status,
            lateness: LatenessFlag::Unevaluated,
        }
    }

    pub fn lateness(&self) -> LatenessFlag {
        self.lateness
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    pub fn is_late(&self) -> bool {
        self.lateness == LatenessFlag::Late
    }

    /// Records the punctuality verdict. Returns `false` and leaves the payment untouched when a
    /// verdict was already recorded or `flag` is [`LatenessFlag::Unevaluated`].
    pub fn settle_lateness(&mut self, flag: LatenessFlag) -> bool {
        if self.lateness.is_settled() || !flag.is_settled() {
            return false;
        }
        self.lateness = flag;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: MaintenanceRequestId,
    pub lease_id: LeaseId,
    pub description: String,
    pub status: MaintenanceStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub is_fixed: Option<bool>,
}

impl MaintenanceRequest {
    pub fn is_completed(&self) -> bool {
        self.status == MaintenanceStatus::Completed
    }

    /// Whole hours between filing and the last status change.
    pub fn response_hours(&self) -> i64 {
        (self.updated_at - self.created_at).num_hours()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewType {
    TenantToLandlord,
    LandlordToTenant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub review_type: ReviewType,
    pub landlord_id: UserId,
    pub tenant_id: UserId,
    pub property_id: PropertyId,
    pub rating: u8,
}

impl Review {
    /// The account the review is about.
    pub fn subject(&self) -> UserId {
        match self.review_type {
            ReviewType::TenantToLandlord => self.landlord_id,
            ReviewType::LandlordToTenant => self.tenant_id,
        }
    }
}

/// Materialized landlord reputation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandlordStats {
    pub landlord_id: UserId,
    pub rating_score: f64,
    pub maintenance_score: f64,
    pub behavior_score: f64,
    pub overall_score: f64,
    pub completed_leases: u32,
    pub avg_response_time_hours: i64,
    pub flagged_properties: u32,
    pub last_updated: Option<NaiveDateTime>,
    pub version: u64,
}

impl LandlordStats {
    pub fn empty(landlord_id: UserId) -> Self {
        Self {
            landlord_id,
            rating_score: 0.0,
            maintenance_score: 0.0,
            behavior_score: 0.0,
            overall_score: 0.0,
            completed_leases: 0,
            avg_response_time_hours: 0,
            flagged_properties: 0,
            last_updated: None,
            version: 0,
        }
    }
}

/// Materialized tenant reputation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantStats {
    pub tenant_id: UserId,
    pub payment_score: f64,
    pub feedback_score: f64,
    pub overall_score: f64,
    pub total_payments: u32,
    pub late_payments: u32,
    pub on_time_payments: u32,
    pub punctuality_ratio: f64,
    pub active_leases: u32,
    pub completed_leases: u32,
    pub last_updated: Option<NaiveDateTime>,
    pub version: u64,
}

impl TenantStats {
    pub fn empty(tenant_id: UserId) -> Self {
        Self {
            tenant_id,
            payment_score: 0.0,
            feedback_score: 0.0,
            overall_score: 0.0,
            total_payments: 0,
            late_payments: 0,
            on_time_payments: 0,
            punctuality_ratio: 0.0,
            active_leases: 0,
            completed_leases: 0,
            last_updated: None,
            version: 0,
        }
    }
}
