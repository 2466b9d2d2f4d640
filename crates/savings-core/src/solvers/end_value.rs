use crate::annuity::{accumulating_tax, fv};
use crate::normalizer::{normalize, RateTaxation};
use crate::plan::SavingsPlan;
use crate::solvers::simple;
use crate::types::{round_money, Money};
use crate::SavingsResult;

/// End value after tax, rounded to cents.
pub fn end_value(plan: &SavingsPlan) -> SavingsResult<Money> {
    end_value_unrounded(plan).map(round_money)
}

/// End value after tax at full precision; the function the root finders invert.
pub fn end_value_unrounded(plan: &SavingsPlan) -> SavingsResult<Money> {
    if !plan.terms.use_compound_interest {
        return Ok(simple::end_value(plan));
    }

    let model = normalize(plan, RateTaxation::Auto)?;
    let gross = fv(
        model.rate,
        model.periods,
        -model.payment,
        -plan.start_value,
        model.timing,
    );

    // An overflowed balance stays infinite; taxing it would give NaN
    if plan.terms.tax.is_accumulating() && gross.is_finite() {
        return Ok(gross - accumulating_tax(gross, plan.deposits(), model.effective_tax_rate));
    }
    Ok(gross)
}
