//! Plan catalog: static plan tiers and their per-feature limits.
//!
//! Immutable at runtime. `PlanTier` and `Feature` are closed enums so an
//! unknown plan or a misspelled feature name is a compile error, not a
//! runtime surprise.

use serde::{Deserialize, Serialize};

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    /// Parses a stored tier name, defaulting to `Free` for anything unknown.
    pub fn from_str_or_free(s: &str) -> Self {
        match s {
            "pro" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A countable, plan-gated feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    AtsChecks,
    AiTailors,
    Resumes,
    Portfolios,
}

impl Feature {
    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::AtsChecks => "ATS check",
            Feature::AiTailors => "AI tailoring",
            Feature::Resumes => "resume",
            Feature::Portfolios => "portfolio",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Numeric limits for the four countable features.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub ats_checks: u32,
    pub ai_tailors: u32,
    pub resumes: u32,
    pub portfolios: u32,
}

impl PlanLimits {
    pub fn limit_for(&self, feature: Feature) -> u32 {
        match feature {
            Feature::AtsChecks => self.ats_checks,
            Feature::AiTailors => self.ai_tailors,
            Feature::Resumes => self.resumes,
            Feature::Portfolios => self.portfolios,
        }
    }
}

const FREE_LIMITS: PlanLimits = PlanLimits {
    ats_checks: 3,
    ai_tailors: 2,
    resumes: 2,
    portfolios: 1,
};

const PRO_LIMITS: PlanLimits = PlanLimits {
    ats_checks: 50,
    ai_tailors: 30,
    resumes: 20,
    portfolios: 10,
};

/// Pure lookup, no failure mode.
pub fn limits_for(tier: PlanTier) -> PlanLimits {
    match tier {
        PlanTier::Free => FREE_LIMITS,
        PlanTier::Pro => PRO_LIMITS,
    }
}

/// Display metadata for the pricing page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
    pub id: PlanTier,
    pub name: &'static str,
    /// USD per month.
    pub price: f64,
    pub limits: PlanLimits,
    pub features: &'static [&'static str],
}

pub fn catalog() -> Vec<PlanInfo> {
    vec![
        PlanInfo {
            id: PlanTier::Free,
            name: "Free",
            price: 0.0,
            limits: FREE_LIMITS,
            features: &[
                "2 Resume templates",
                "1 Portfolio website",
                "3 ATS checks/month",
                "2 AI tailoring/month",
                "Basic support",
            ],
        },
        PlanInfo {
            id: PlanTier::Pro,
            name: "Pro",
            price: 9.99,
            limits: PRO_LIMITS,
            features: &[
                "Unlimited resume templates",
                "10 Portfolio websites",
                "50 ATS checks/month",
                "30 AI tailoring/month",
                "Priority support",
                "Custom domains",
                "Analytics dashboard",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_limits() {
        let limits = limits_for(PlanTier::Free);
        assert_eq!(limits.limit_for(Feature::AtsChecks), 3);
        assert_eq!(limits.limit_for(Feature::AiTailors), 2);
        assert_eq!(limits.limit_for(Feature::Resumes), 2);
        assert_eq!(limits.limit_for(Feature::Portfolios), 1);
    }

    #[test]
    fn test_pro_limits() {
        let limits = limits_for(PlanTier::Pro);
        assert_eq!(limits.limit_for(Feature::AtsChecks), 50);
        assert_eq!(limits.limit_for(Feature::AiTailors), 30);
        assert_eq!(limits.limit_for(Feature::Resumes), 20);
        assert_eq!(limits.limit_for(Feature::Portfolios), 10);
    }

    #[test]
    fn test_unknown_stored_tier_falls_back_to_free() {
        assert_eq!(PlanTier::from_str_or_free("enterprise"), PlanTier::Free);
        assert_eq!(PlanTier::from_str_or_free("pro"), PlanTier::Pro);
    }
}
