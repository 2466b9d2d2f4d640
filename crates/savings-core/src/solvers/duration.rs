use crate::annuity::{nper, nper_accumulating_taxed};
use crate::normalizer::{normalize, RateTaxation};
use crate::plan::{PlanField, SavingsPlan};
use crate::solvers::simple;
use crate::types::Years;
use crate::SavingsResult;

/// Years until the plan reaches its end value; `+∞` if it never does.
pub fn duration(plan: &SavingsPlan) -> SavingsResult<Years> {
    if !plan.terms.use_compound_interest {
        return Ok(simple::duration(plan));
    }

    let one_year = PlanField::YearlyDuration.with(plan, 1.0);
    let model = normalize(&one_year, RateTaxation::Auto)?;

    let periods = if plan.terms.tax.is_accumulating() {
        nper_accumulating_taxed(
            model.rate,
            -model.payment,
            -plan.start_value,
            plan.end_value,
            model.effective_tax_rate,
            model.timing,
            model.principal_share,
        )
    } else {
        nper(model.rate, -model.payment, -plan.start_value, plan.end_value, model.timing)
    };

    if !periods.is_finite() || periods < 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(periods / model.periods_per_year)
}
