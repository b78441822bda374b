use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::FinancialProfile;

/// Assumed loan-to-income ratio applied to annual income. Fixed policy, not a user setting.
pub const LOAN_TO_INCOME_MULTIPLIER: f64 = 5.0;

/// Highest purchase price a [`FinancialProfile`] supports. Negative values are valid and
/// mean the buyer has no purchasing power.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffordabilityCeiling(f64);

impl AffordabilityCeiling {
    pub(crate) const fn new(value: f64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for AffordabilityCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}", self.0)
    }
}

/// `equity + 5 × annual income − existing debt + extra loan`, unclamped.
pub fn compute(profile: &FinancialProfile) -> AffordabilityCeiling {
    AffordabilityCeiling::new(
        profile.equity + LOAN_TO_INCOME_MULTIPLIER * profile.annual_income
            - profile.existing_debt
            + profile.extra_loan,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(
        equity: f64,
        annual_income: f64,
        existing_debt: f64,
        extra_loan: f64,
    ) -> FinancialProfile {
        FinancialProfile {
            equity,
            annual_income,
            existing_debt,
            extra_loan,
        }
    }

    #[test]
    fn ceiling_applies_income_multiplier() {
        let ceiling = compute(&profile(500_000.0, 600_000.0, 200_000.0, 0.0));
        assert_eq!(ceiling.value(), 3_300_000.0);
    }

    #[test]
    fn negative_ceiling_is_not_clamped() {
        let ceiling = compute(&profile(0.0, 100_000.0, 900_000.0, 0.0));
        assert_eq!(ceiling.value(), -400_000.0);
    }

    #[test]
    fn ceiling_moves_with_each_input_in_the_expected_direction() {
        let base = profile(200_000.0, 500_000.0, 100_000.0, 50_000.0);
        let baseline = compute(&base);

        for raised in [
            FinancialProfile { equity: base.equity + 1.0, ..base },
            FinancialProfile { annual_income: base.annual_income + 1.0, ..base },
            FinancialProfile { extra_loan: base.extra_loan + 1.0, ..base },
        ] {
            assert!(compute(&raised) >= baseline);
        }

        let more_debt = FinancialProfile {
            existing_debt: base.existing_debt + 1.0,
            ..base
        };
        assert!(compute(&more_debt) <= baseline);
    }

    #[test]
    fn ceiling_is_deterministic() {
        let base = profile(123_456.0, 654_321.0, 11_111.0, 22_222.0);
        assert_eq!(compute(&base), compute(&base));
    }
}
