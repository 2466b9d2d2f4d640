//! Simple (non-compounding) interest on the start capital and on each contribution.
//!
//! Contributions earn interest linearly from the period they are paid in, so
//! the total interest-bearing contribution periods form a triangular number
//! `n·(n+1)/2` in advance or `n·(n-1)/2` in arrear.

use crate::error::SavingsError;
use crate::plan::{SavingType, SavingsPlan};
use crate::types::{Money, Percent, Rate, Years};
use crate::SavingsResult;

#[derive(Debug, Clone, Copy)]
struct SimpleTerms {
    /// Per-contribution-period rate, net of tax when tax is considered.
    rate: Rate,
    periods: f64,
    /// Contribution periods summed over all contributions.
    triangular: f64,
    periods_per_year: f64,
    tax_factor: f64,
}

impl SimpleTerms {
    fn of(plan: &SavingsPlan) -> Self {
        let tax = &plan.terms.tax;
        let tax_factor = if tax.consider_capital_gains_tax {
            tax.tax_factor()
        } else {
            1.0
        };
        let periods_per_year = plan.terms.save_interval.per_year();
        let periods = plan.yearly_duration * periods_per_year;
        let triangular = periods * (periods + timing_sign(plan.terms.saving_type)) / 2.0;
        Self {
            rate: plan.yearly_interest / periods_per_year * tax_factor / 100.0,
            periods,
            triangular,
            periods_per_year,
            tax_factor,
        }
    }
}

fn timing_sign(saving_type: SavingType) -> f64 {
    match saving_type {
        SavingType::InAdvance => 1.0,
        SavingType::InArrear => -1.0,
    }
}

pub fn end_value(plan: &SavingsPlan) -> Money {
    let t = SimpleTerms::of(plan);
    let (s, p) = (plan.start_value, plan.saving_rate);
    s + p * t.periods + p * t.triangular * t.rate + s * t.rate * t.periods
}

pub fn start_value(plan: &SavingsPlan) -> Money {
    let t = SimpleTerms::of(plan);
    let p = plan.saving_rate;
    (plan.end_value - (p * t.periods + p * t.triangular * t.rate)) / (1.0 + t.rate * t.periods)
}

pub fn payment(plan: &SavingsPlan) -> SavingsResult<Money> {
    let t = SimpleTerms::of(plan);
    let denominator = t.periods + t.triangular * t.rate;
    if denominator == 0.0 {
        return Err(SavingsError::UnderdeterminedSystem {
            context: "simple interest payment over zero contribution periods".into(),
        });
    }
    Ok((plan.end_value - plan.start_value * (1.0 + t.rate * t.periods)) / denominator)
}

/// Yearly interest in percent, before tax.
pub fn interest_rate(plan: &SavingsPlan) -> SavingsResult<Percent> {
    let t = SimpleTerms::of(plan);
    let (s, p) = (plan.start_value, plan.saving_rate);
    let coefficient = s * plan.yearly_duration + p * t.triangular / t.periods_per_year;
    if coefficient == 0.0 {
        return Err(SavingsError::UnderdeterminedSystem {
            context: "no capital earns interest, so any rate fits".into(),
        });
    }
    if t.tax_factor == 0.0 {
        return Err(SavingsError::UnderdeterminedSystem {
            context: "capital gains tax absorbs all interest".into(),
        });
    }
    Ok((plan.end_value - s - p * t.periods) / coefficient / t.tax_factor * 100.0)
}

/// Duration in years, `+∞` when the end value is out of reach.
pub fn duration(plan: &SavingsPlan) -> Years {
    let mut one_year = *plan;
    one_year.yearly_duration = 1.0;
    let t = SimpleTerms::of(&one_year);
    let (s, p, e, r) = (plan.start_value, plan.saving_rate, plan.end_value, t.rate);

    let to_years = |periods: f64| {
        if periods <= 0.0 {
            f64::INFINITY
        } else {
            periods / t.periods_per_year
        }
    };

    if p == 0.0 {
        if s == 0.0 {
            return f64::INFINITY;
        }
        if r == 0.0 {
            return if s == e { 0.0 } else { f64::INFINITY };
        }
        return to_years((e / s - 1.0) / r);
    }

    // a·n² + b·n + c = 0
    let a = p * r / 2.0;
    let b = s * r + p * (1.0 + r * timing_sign(plan.terms.saving_type) / 2.0);
    let c = s - e;

    if a == 0.0 {
        return to_years((e - s) / p);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return f64::INFINITY;
    }
    let root = discriminant.sqrt();
    to_years(((-b + root) / (2.0 * a)).max((-b - root) / (2.0 * a)))
}
