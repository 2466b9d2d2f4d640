//! The five directional solvers: given four figures of a plan, compute the fifth.

pub mod duration;
pub mod end_value;
pub mod interest_rate;
pub mod payment;
pub mod simple;
pub mod start_value;

use tracing::debug;

use crate::plan::{PlanField, SavingsPlan};
use crate::root_finding::{bisect_to_target, BisectionConfig, SearchRange};
use crate::SavingsResult;

pub use duration::duration;
pub use end_value::{end_value, end_value_unrounded};
pub use interest_rate::interest_rate;
pub use payment::payment;
pub use start_value::start_value;

/// Compute `field` from the other four figures of `plan`.
///
/// Money results are rounded to cents, interest is in percent, and duration
/// is in years (`+∞` when the end value cannot be reached).
pub fn solve(plan: &SavingsPlan, field: PlanField) -> SavingsResult<f64> {
    debug!(
        %field,
        save = %plan.terms.save_interval,
        interest = %plan.terms.interest_interval,
        compound = plan.terms.use_compound_interest,
        "solving savings plan"
    );
    match field {
        PlanField::EndValue => end_value(plan),
        PlanField::StartValue => start_value(plan),
        PlanField::YearlyInterest => interest_rate(plan),
        PlanField::YearlyDuration => duration(plan),
        PlanField::SavingRate => payment(plan),
    }
}

/// Find the value of `field` for which the plan's unrounded end value hits `target`.
///
/// The end value must be non-decreasing in `field` over `range`.
pub fn invert_field(
    plan: &SavingsPlan,
    field: PlanField,
    target: f64,
    range: SearchRange,
) -> SavingsResult<f64> {
    bisect_to_target(
        field.name(),
        |x| end_value_unrounded(&field.with(plan, x)),
        target,
        range,
        &BisectionConfig::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{InterestInterval, PlanTerms, SaveInterval};

    #[test]
    fn test_solve_dispatches_each_field() {
        let mut plan = SavingsPlan {
            start_value: 1000.0,
            saving_rate: 120.0,
            yearly_duration: 2.0,
            yearly_interest: 12.0,
            end_value: 0.0,
            terms: PlanTerms::new(SaveInterval::Yearly, InterestInterval::Yearly),
        };
        plan.end_value = solve(&plan, PlanField::EndValue).unwrap();
        assert_eq!(plan.end_value, 1539.33);

        let start = solve(&plan, PlanField::StartValue).unwrap();
        assert!((start - 1000.0).abs() <= 0.01 + 1e-9);
        let rate = solve(&plan, PlanField::SavingRate).unwrap();
        assert!((rate - 120.0).abs() <= 0.01 + 1e-9);
        let years = solve(&plan, PlanField::YearlyDuration).unwrap();
        assert!((years - 2.0).abs() < 5e-4);
        let interest = solve(&plan, PlanField::YearlyInterest).unwrap();
        assert!((interest - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_invert_field_over_duration() {
        let plan = SavingsPlan {
            start_value: 1000.0,
            saving_rate: 0.0,
            yearly_duration: 0.0,
            yearly_interest: 12.0,
            end_value: 0.0,
            terms: PlanTerms::new(SaveInterval::Yearly, InterestInterval::Yearly),
        };
        let years = invert_field(&plan, PlanField::YearlyDuration, 1254.4, SearchRange::new(0.0, 1.0)).unwrap();
        assert!((years - 2.0).abs() < 1e-4);
    }
}
