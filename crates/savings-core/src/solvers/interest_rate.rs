use crate::annuity::{rate, DEFAULT_RATE_GUESS};
use crate::error::SavingsError;
use crate::normalizer::{convert_to_yearly, normalize, PeriodModel, RateTaxation};
use crate::plan::{PlanField, SavingsPlan};
use crate::root_finding::{newton, NewtonConfig, SearchRange};
use crate::solvers::{invert_field, simple};
use crate::types::{Percent, Rate};
use crate::SavingsResult;

const ZERO_RATE: f64 = 1e-12;

/// Nominal yearly interest, in percent, that takes the plan to its end value.
///
/// For distributing plans this is the rate before tax.
pub fn interest_rate(plan: &SavingsPlan) -> SavingsResult<Percent> {
    if !plan.terms.use_compound_interest {
        return simple::interest_rate(plan);
    }

    if plan.terms.tax.is_accumulating() {
        return invert_field(
            plan,
            PlanField::YearlyInterest,
            plan.end_value,
            SearchRange::new(0.0, 100.0),
        );
    }

    let untaxed = PlanField::YearlyInterest.with(plan, 0.0);
    let model = normalize(&untaxed, RateTaxation::Auto)?;

    let yearly = match model.synthetic_months() {
        Some((months, average)) if plan.saving_rate > 0.0 => {
            synthetic_period_rate(plan, &model, months, average)? * model.periods_per_year
        }
        _ => {
            let guess = growth_guess(
                model.periods,
                plan.start_value + model.payment,
                plan.end_value,
                DEFAULT_RATE_GUESS,
            );
            let period_rate = rate(
                model.periods,
                -model.payment,
                -plan.start_value,
                plan.end_value,
                model.timing,
                guess,
            )?;
            convert_to_yearly(&model, period_rate)
        }
    };

    if plan.terms.tax.is_distributing() {
        let kept = 1.0 - model.effective_tax_rate;
        if kept <= 0.0 {
            return Err(SavingsError::UnderdeterminedSystem {
                context: "capital gains tax absorbs all interest".into(),
            });
        }
        return Ok(yearly / kept * 100.0);
    }
    Ok(yearly * 100.0)
}

/// The synthetic payment itself depends on the rate, so RATE does not apply;
/// solve `P·(m + a·r)·A(r) + S·(1+r)^n = E` by Newton instead.
fn synthetic_period_rate(plan: &SavingsPlan, model: &PeriodModel, months: f64, average: f64) -> SavingsResult<Rate> {
    let (p, s, e, n) = (plan.saving_rate, plan.start_value, plan.end_value, model.periods);

    let equation = |r: f64| {
        let payment = p * (months + average * r);
        let (factor, factor_slope) = if r.abs() < ZERO_RATE {
            (n, n * (n - 1.0) / 2.0)
        } else {
            let g = (1.0 + r).powf(n);
            (
                (g - 1.0) / r,
                (r * n * (1.0 + r).powf(n - 1.0) - (g - 1.0)) / (r * r),
            )
        };
        let value = payment * factor + s * (1.0 + r).powf(n) - e;
        let slope = p * average * factor + payment * factor_slope + s * n * (1.0 + r).powf(n - 1.0);
        (value, slope)
    };

    let guess = growth_guess(n, s + p * months, e, 0.1 / model.periods_per_year).min(1.9);
    newton(equation, guess, &NewtonConfig::default())
}

/// Starting rate for Newton: the per-period growth that would turn the first
/// period's money into the end value on its own.
///
/// Over long horizons a fixed guess like 10% overflows `(1+r)^n` before the
/// first step, while this one starts close to the answer.
fn growth_guess(periods: f64, principal: f64, end_value: f64, fallback: Rate) -> Rate {
    if periods < 2.0 || principal <= 0.0 || end_value <= 0.0 {
        return fallback;
    }
    let guess = (end_value / principal).powf(1.0 / (periods - 1.0)) - 1.0;
    if guess.is_finite() && guess > -1.0 {
        guess
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DistributionType, InterestInterval, PlanTerms, SaveInterval, TaxTreatment};

    fn plan(save: SaveInterval, interest: InterestInterval, saving_rate: f64, end_value: f64) -> SavingsPlan {
        SavingsPlan {
            start_value: 1000.0,
            saving_rate,
            yearly_duration: 2.0,
            yearly_interest: 0.0,
            end_value,
            terms: PlanTerms::new(save, interest),
        }
    }

    #[test]
    fn test_lump_sum_yearly() {
        let p = plan(SaveInterval::Yearly, InterestInterval::Yearly, 0.0, 1254.4);
        assert!((interest_rate(&p).unwrap() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_compounded_basis_converts_back() {
        let p = plan(SaveInterval::Yearly, InterestInterval::Monthly, 0.0, 1269.73);
        assert!((interest_rate(&p).unwrap() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_synthetic_row_uses_newton() {
        let p = plan(SaveInterval::Monthly, InterestInterval::Yearly, 10.0, 1525.34);
        assert!((interest_rate(&p).unwrap() - 12.0).abs() < 1e-3);

        let q = plan(SaveInterval::Monthly, InterestInterval::Quarterly, 10.0, 1538.88);
        assert!((interest_rate(&q).unwrap() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_distributing_reports_pre_tax_rate() {
        let mut p = plan(SaveInterval::Yearly, InterestInterval::Yearly, 0.0, 1123.6);
        p.terms.tax = TaxTreatment {
            consider_capital_gains_tax: true,
            capital_gains_tax: 50.0,
            partial_exemption: 0.0,
            distribution_type: DistributionType::Distributing,
        };
        assert!((interest_rate(&p).unwrap() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_accumulating_by_inversion() {
        let mut p = plan(SaveInterval::Yearly, InterestInterval::Yearly, 0.0, 1127.2);
        p.terms.tax = TaxTreatment {
            consider_capital_gains_tax: true,
            capital_gains_tax: 50.0,
            partial_exemption: 0.0,
            distribution_type: DistributionType::Accumulating,
        };
        assert!((interest_rate(&p).unwrap() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_millennium_plan_solves_back() {
        for (save, interest, saving_rate) in [
            (SaveInterval::Monthly, InterestInterval::Monthly, 100.0),
            (SaveInterval::Yearly, InterestInterval::Yearly, 1200.0),
            (SaveInterval::Monthly, InterestInterval::Yearly, 100.0),
        ] {
            let mut p = plan(save, interest, saving_rate, 0.0);
            p.yearly_duration = 1000.0;
            p.yearly_interest = 12.0;
            p.end_value = crate::solvers::end_value::end_value_unrounded(&p).unwrap();
            assert!(p.end_value.is_finite());

            let solved = interest_rate(&p).unwrap();
            assert!((solved - 12.0).abs() < 1e-3, "{save:?}/{interest:?}: got {solved}");
        }
    }

    #[test]
    fn test_growth_guess_falls_back_without_principal() {
        assert_eq!(growth_guess(24.0, 0.0, 1000.0, 0.1), 0.1);
        assert_eq!(growth_guess(1.0, 1000.0, 1254.4, 0.1), 0.1);
        assert!((growth_guess(3.0, 1000.0, 1254.4, 0.1) - 0.12).abs() < 1e-12);
    }
}
