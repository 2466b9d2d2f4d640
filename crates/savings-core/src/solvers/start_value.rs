use crate::annuity::{fv, pv, pv_accumulating_taxed};
use crate::normalizer::{normalize, RateTaxation};
use crate::plan::{InterestInterval, PlanField, SaveInterval, SavingsPlan};
use crate::root_finding::SearchRange;
use crate::solvers::{invert_field, simple};
use crate::types::{round_money, Money};
use crate::SavingsResult;

/// Start capital needed to reach the plan's end value, rounded to cents.
pub fn start_value(plan: &SavingsPlan) -> SavingsResult<Money> {
    if !plan.terms.use_compound_interest {
        return Ok(round_money(simple::start_value(plan)));
    }

    let model = normalize(plan, RateTaxation::Auto)?;
    let terms = &plan.terms;

    let value = if terms.tax.is_accumulating() {
        if terms.save_interval == SaveInterval::Monthly && terms.interest_interval == InterestInterval::Monthly {
            -pv_accumulating_taxed(
                model.rate,
                model.periods,
                -model.payment,
                plan.end_value,
                model.effective_tax_rate,
                model.timing,
            )
        } else {
            // After tax each unit of start capital ends as at least `(1-t)·g + t`
            let growth = fv(model.rate, model.periods, 0.0, -1.0, model.timing);
            let t = model.effective_tax_rate;
            let upper = (plan.end_value / ((1.0 - t) * growth + t)).max(1.0);
            invert_field(plan, PlanField::StartValue, plan.end_value, SearchRange::new(0.0, upper))?
        }
    } else {
        -pv(model.rate, model.periods, -model.payment, plan.end_value, model.timing)
    };

    Ok(round_money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DistributionType, PlanTerms, TaxTreatment};

    fn plan(save: SaveInterval, interest: InterestInterval, end_value: f64) -> SavingsPlan {
        let mut terms = PlanTerms::new(save, interest);
        terms.tax = TaxTreatment {
            consider_capital_gains_tax: true,
            capital_gains_tax: 50.0,
            partial_exemption: 0.0,
            distribution_type: DistributionType::Accumulating,
        };
        SavingsPlan {
            start_value: 0.0,
            saving_rate: if save == SaveInterval::Monthly { 10.0 } else { 120.0 },
            yearly_duration: 2.0,
            yearly_interest: 12.0,
            end_value,
            terms,
        }
    }

    #[test]
    fn test_accumulating_closed_form_monthly() {
        let p = plan(SaveInterval::Monthly, InterestInterval::Monthly, 1391.09);
        let start = start_value(&p).unwrap();
        assert!((start - 1000.0).abs() <= 0.01 + 1e-9, "got {start}");
    }

    #[test]
    fn test_accumulating_by_inversion() {
        let p = plan(SaveInterval::Yearly, InterestInterval::Quarterly, 1396.92);
        let start = start_value(&p).unwrap();
        assert!((start - 1000.0).abs() <= 0.01 + 1e-6, "got {start}");
    }

    #[test]
    fn test_without_contributions_discounts_end_value() {
        let mut p = plan(SaveInterval::Yearly, InterestInterval::Yearly, 1254.4);
        p.saving_rate = 0.0;
        p.terms.tax.consider_capital_gains_tax = false;
        assert_eq!(start_value(&p).unwrap(), 1000.0);
    }

    #[test]
    fn test_accumulating_inversion_over_a_millennium() {
        for (save, interest) in [
            (SaveInterval::Yearly, InterestInterval::Yearly),
            (SaveInterval::Monthly, InterestInterval::Quarterly),
        ] {
            let mut p = plan(save, interest, 0.0);
            p.start_value = 1000.0;
            p.saving_rate = if save == SaveInterval::Monthly { 100.0 } else { 1200.0 };
            p.yearly_duration = 1000.0;
            p.end_value = crate::solvers::end_value::end_value_unrounded(&p).unwrap();
            assert!(p.end_value.is_finite());

            let start = start_value(&p).unwrap();
            assert!((start - 1000.0).abs() <= 1.0, "{save:?}/{interest:?}: got {start}");
        }
    }
}
