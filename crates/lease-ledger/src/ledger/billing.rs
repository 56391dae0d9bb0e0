//! Billing-cycle arithmetic anchored on the lease start date's day of month.
//!
//! Every function here is pure: callers pass `today` explicitly so results are reproducible.
//! Month arithmetic clips to the last day of shorter months (a January 31 anchor falls due on
//! February 28 or 29) and never panics.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::Payment;

/// Payment standing of a lease relative to the current month's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentStatus {
    Current,
    Late,
    Overdue,
    Unpaid,
}

/// Half-open window `[start, end)` in which one rent payment is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingCycle {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Shifts `date` by `months`, clipping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Due date inside `reference`'s month for a lease anchored on `anchor_day`.
pub fn due_date_for(anchor_day: u32, reference: NaiveDate) -> NaiveDate {
    let day = anchor_day.clamp(1, days_in_month(reference.year(), reference.month()));
    reference.with_day(day).unwrap_or(reference)
}

pub fn cycle_start(lease_start: NaiveDate, today: NaiveDate) -> NaiveDate {
    let months_elapsed = (today.year() - lease_start.year()) * 12 + today.month() as i32
        - lease_start.month() as i32;
    let candidate = add_months(lease_start, months_elapsed);

    if today < candidate {
        add_months(candidate, -1)
    } else {
        candidate
    }
}

pub fn billing_cycle(lease_start: NaiveDate, today: NaiveDate) -> BillingCycle {
    let start = cycle_start(lease_start, today);
    BillingCycle {
        start,
        end: add_months(start, 1),
    }
}

/// True when any recorded payment falls inside the cycle containing `today`.
pub fn is_paid_for_cycle(lease_start: NaiveDate, payments: &[Payment], today: NaiveDate) -> bool {
    let cycle = billing_cycle(lease_start, today);
    payments
        .iter()
        .any(|payment| cycle.contains(payment.payment_date))
}

pub fn rent_status(lease_start: NaiveDate, payments: &[Payment], today: NaiveDate) -> RentStatus {
    let due_date = due_date_for(lease_start.day(), today);

    let latest = payments
        .iter()
        .filter(|payment| payment.is_completed())
        .map(|payment| payment.payment_date)
        .max();

    match latest {
        None if today > due_date => RentStatus::Overdue,
        None => RentStatus::Unpaid,
        Some(paid_on) if paid_on <= due_date => RentStatus::Current,
        Some(_) => RentStatus::Late,
    }
}
