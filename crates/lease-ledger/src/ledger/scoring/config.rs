use serde::{Deserialize, Serialize};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Landlord composite weights for rating, maintenance responsiveness, and platform behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandlordWeights {
    pub rating: f64,
    pub maintenance: f64,
    pub behavior: f64,
}

impl Default for LandlordWeights {
    fn default() -> Self {
        Self {
            rating: 0.5,
            maintenance: 0.3,
            behavior: 0.2,
        }
    }
}

/// Tenant composite weights for payment punctuality and landlord feedback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TenantWeights {
    pub payment: f64,
    pub feedback: f64,
}

impl Default for TenantWeights {
    fn default() -> Self {
        Self {
            payment: 0.6,
            feedback: 0.4,
        }
    }
}

/// Weight profile injected into the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub landlord: LandlordWeights,
    pub tenant: TenantWeights,
}

impl ScoringWeights {
    /// Each profile must be non-negative and sum to 1.0 so composites stay on the 1–5 scale.
    pub fn validate(self) -> Result<Self, WeightsError> {
        let landlord = [
            self.landlord.rating,
            self.landlord.maintenance,
            self.landlord.behavior,
        ];
        check_profile("landlord", &landlord)?;
        check_profile("tenant", &[self.tenant.payment, self.tenant.feedback])?;
        Ok(self)
    }
}

fn check_profile(profile: &'static str, weights: &[f64]) -> Result<(), WeightsError> {
    if weights
        .iter()
        .any(|weight| !weight.is_finite() || *weight < 0.0)
    {
        return Err(WeightsError::Negative { profile });
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(WeightsError::NotNormalized { profile, sum });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("{profile} weights must be finite and non-negative")]
    Negative { profile: &'static str },
    #[error("{profile} weights must sum to 1.0, got {sum}")]
    NotNormalized { profile: &'static str, sum: f64 },
}
