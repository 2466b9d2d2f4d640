use crate::annuity::{pmt, pmt_accumulating_taxed};
use crate::normalizer::{normalize, RateTaxation};
use crate::plan::{PlanField, SavingsPlan};
use crate::solvers::simple;
use crate::types::{round_money, Money};
use crate::SavingsResult;

/// Contribution per save interval that takes the plan to its end value, rounded to cents.
pub fn payment(plan: &SavingsPlan) -> SavingsResult<Money> {
    if !plan.terms.use_compound_interest {
        return simple::payment(plan).map(round_money);
    }

    let without_savings = PlanField::SavingRate.with(plan, 0.0);
    let model = normalize(&without_savings, RateTaxation::Auto)?;

    let canonical = if plan.terms.tax.is_accumulating() {
        -pmt_accumulating_taxed(
            model.rate,
            model.periods,
            -plan.start_value,
            plan.end_value,
            model.effective_tax_rate,
            model.timing,
            model.principal_share,
        )?
    } else {
        -pmt(model.rate, model.periods, -plan.start_value, plan.end_value, model.timing)?
    };

    // A synthetic payment is `P·(months + average·r)`; recover `P`
    let adjustment = match model.synthetic_months() {
        Some((months, average)) => 1.0 / (months + average * model.rate),
        None => 1.0,
    };

    Ok(round_money(canonical * adjustment))
}
