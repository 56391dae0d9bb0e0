use super::super::domain::{MaintenanceRequest, Payment, Review};

/// Score used when nobody has reviewed the subject yet.
pub(crate) const NEUTRAL_RATING: f64 = 3.5;
/// Score used when a tenant has no completed payments.
pub(crate) const NEUTRAL_PAYMENT: f64 = 3.0;

pub(crate) fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return NEUTRAL_RATING;
    }
    let total: u32 = reviews
        .iter()
        .map(|review| u32::from(review.rating.clamp(1, 5)))
        .sum();
    f64::from(total) / reviews.len() as f64
}

/// Rounded mean of whole response hours, or `None` without completed requests.
pub(crate) fn average_response_hours(requests: &[MaintenanceRequest]) -> Option<i64> {
    if requests.is_empty() {
        return None;
    }
    let total: i64 = requests.iter().map(MaintenanceRequest::response_hours).sum();
    Some((total as f64 / requests.len() as f64).round() as i64)
}

pub(crate) fn maintenance_score(avg_hours: Option<i64>) -> f64 {
    match avg_hours {
        None => 5.0,
        Some(hours) if hours <= 24 => 5.0,
        Some(hours) if hours <= 72 => 4.0,
        Some(hours) if hours <= 120 => 3.0,
        Some(hours) if hours <= 168 => 2.0,
        Some(_) => 1.0,
    }
}

pub(crate) fn behavior_score(flagged_properties: u32) -> f64 {
    match flagged_properties {
        0 | 1 => 5.0,
        2 => 4.0,
        3 => 3.0,
        4 => 2.0,
        _ => 1.0,
    }
}

/// Punctuality tallies over a tenant's completed payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaymentTally {
    pub total: u32,
    pub late: u32,
}

impl PaymentTally {
    pub fn from_payments(payments: &[Payment]) -> Self {
        let completed = payments.iter().filter(|payment| payment.is_completed());
        let (total, late) = completed.fold((0u32, 0u32), |(total, late), payment| {
            (total + 1, late + u32::from(payment.is_late()))
        });
        Self { total, late }
    }

    pub fn on_time(self) -> u32 {
        self.total - self.late
    }

    pub fn punctuality_ratio(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.on_time()) / f64::from(self.total)
        }
    }
}

pub(crate) fn payment_score(tally: PaymentTally) -> f64 {
    if tally.total == 0 {
        return NEUTRAL_PAYMENT;
    }
    if tally.late == 0 {
        return 5.0;
    }

    let late_ratio = f64::from(tally.late) / f64::from(tally.total);
    if late_ratio <= 0.05 {
        5.0
    } else if late_ratio <= 0.15 {
        4.0
    } else if late_ratio <= 0.3 {
        3.0
    } else if late_ratio <= 0.5 {
        2.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::domain::{PropertyId, ReviewId, ReviewType, UserId};

    fn rated(rating: u8) -> Review {
        Review {
            id: ReviewId(u64::from(rating)),
            review_type: ReviewType::TenantToLandlord,
            landlord_id: UserId(1),
            tenant_id: UserId(2),
            property_id: PropertyId(3),
            rating,
        }
    }

    #[test]
    fn mean_rating_stays_on_the_rating_scale() {
        assert_eq!(mean_rating(&[]), NEUTRAL_RATING);
        assert_eq!(mean_rating(&[rated(2), rated(4)]), 3.0);
        assert_eq!(mean_rating(&[rated(0)]), 1.0);
        assert_eq!(mean_rating(&[rated(9), rated(5)]), 5.0);
    }

    #[test]
    fn maintenance_steps_follow_response_hours() {
        assert_eq!(maintenance_score(None), 5.0);
        assert_eq!(maintenance_score(Some(0)), 5.0);
        assert_eq!(maintenance_score(Some(24)), 5.0);
        assert_eq!(maintenance_score(Some(25)), 4.0);
        assert_eq!(maintenance_score(Some(72)), 4.0);
        assert_eq!(maintenance_score(Some(120)), 3.0);
        assert_eq!(maintenance_score(Some(168)), 2.0);
        assert_eq!(maintenance_score(Some(169)), 1.0);
    }

    #[test]
    fn behavior_steps_follow_flag_count() {
        let scores: Vec<f64> = (0..=6).map(behavior_score).collect();
        assert_eq!(scores, vec![5.0, 5.0, 4.0, 3.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn payment_score_bands() {
        let score = |total, late| payment_score(PaymentTally { total, late });
        assert_eq!(score(0, 0), 3.0);
        assert_eq!(score(3, 0), 5.0);
        assert_eq!(score(20, 1), 5.0);
        assert_eq!(score(10, 1), 4.0);
        assert_eq!(score(10, 3), 3.0);
        assert_eq!(score(10, 5), 2.0);
        assert_eq!(score(10, 6), 1.0);
    }

    #[test]
    fn punctuality_ratio_is_zero_without_payments() {
        let tally = PaymentTally { total: 0, late: 0 };
        assert_eq!(tally.punctuality_ratio(), 0.0);
        let tally = PaymentTally { total: 4, late: 1 };
        assert_eq!(tally.on_time(), 3);
        assert!((tally.punctuality_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
