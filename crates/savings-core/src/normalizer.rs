use crate::annuity::PaymentTiming;
use crate::error::SavingsError;
use crate::plan::{InterestInterval, SaveInterval, SavingType, SavingsPlan};
use crate::types::{Money, Percent, Rate};
use crate::SavingsResult;

/// How the per-period rate is derived from the yearly rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBasis {
    /// `y / divisor`
    Nominal,
    /// `(1 + y/divisor)^divisor - 1`, the effective yearly rate of sub-yearly crediting.
    Compounded,
}

/// Monthly contributions credited on a coarser interest interval are folded
/// into one synthetic payment per interest period: the deposits plus the
/// simple interest they earn before the period closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticPayment {
    /// Contributions per interest period.
    pub months: f64,
    /// Average months an in-advance contribution earns interest within the period.
    pub average_months_in_advance: f64,
    /// Same for in-arrear contributions.
    pub average_months_in_arrear: f64,
}

impl SyntheticPayment {
    pub fn average_months(&self, saving_type: SavingType) -> f64 {
        match saving_type {
            SavingType::InAdvance => self.average_months_in_advance,
            SavingType::InArrear => self.average_months_in_arrear,
        }
    }
}

/// One row of the interval lookup table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalRule {
    pub save: SaveInterval,
    pub interest: InterestInterval,
    pub basis: RateBasis,
    pub divisor: f64,
    pub periods_per_year: f64,
    pub synthetic: Option<SyntheticPayment>,
}

const INTERVAL_RULES: [IntervalRule; 6] = [
    IntervalRule {
        save: SaveInterval::Yearly,
        interest: InterestInterval::Yearly,
        basis: RateBasis::Nominal,
        divisor: 1.0,
        periods_per_year: 1.0,
        synthetic: None,
    },
    IntervalRule {
        save: SaveInterval::Yearly,
        interest: InterestInterval::Quarterly,
        basis: RateBasis::Compounded,
        divisor: 4.0,
        periods_per_year: 1.0,
        synthetic: None,
    },
    IntervalRule {
        save: SaveInterval::Yearly,
        interest: InterestInterval::Monthly,
        basis: RateBasis::Compounded,
        divisor: 12.0,
        periods_per_year: 1.0,
        synthetic: None,
    },
    IntervalRule {
        save: SaveInterval::Monthly,
        interest: InterestInterval::Monthly,
        basis: RateBasis::Nominal,
        divisor: 12.0,
        periods_per_year: 12.0,
        synthetic: None,
    },
    IntervalRule {
        save: SaveInterval::Monthly,
        interest: InterestInterval::Quarterly,
        basis: RateBasis::Nominal,
        divisor: 4.0,
        periods_per_year: 4.0,
        synthetic: Some(SyntheticPayment {
            months: 3.0,
            average_months_in_advance: 2.0,
            average_months_in_arrear: 1.0,
        }),
    },
    IntervalRule {
        save: SaveInterval::Monthly,
        interest: InterestInterval::Yearly,
        basis: RateBasis::Nominal,
        divisor: 1.0,
        periods_per_year: 1.0,
        synthetic: Some(SyntheticPayment {
            months: 12.0,
            average_months_in_advance: 6.5,
            average_months_in_arrear: 5.5,
        }),
    },
];

/// Look up the rule for a save/interest interval pairing.
pub fn rule_for(save: SaveInterval, interest: InterestInterval) -> SavingsResult<&'static IntervalRule> {
    INTERVAL_RULES
        .iter()
        .find(|rule| rule.save == save && rule.interest == interest)
        .ok_or_else(|| SavingsError::InvalidIntervalCombination {
            save: save.to_string(),
            interest: interest.to_string(),
        })
}

impl IntervalRule {
    /// Per-period rate for a yearly rate given as a decimal.
    pub fn period_rate(&self, yearly: Rate) -> Rate {
        match self.basis {
            RateBasis::Nominal => yearly / self.divisor,
            RateBasis::Compounded => (1.0 + yearly / self.divisor).powf(self.divisor) - 1.0,
        }
    }

    /// Yearly rate (decimal) for a per-period rate; the inverse of [`period_rate`](Self::period_rate).
    pub fn yearly_rate(&self, period_rate: Rate) -> Rate {
        match self.basis {
            RateBasis::Nominal => period_rate * self.divisor,
            RateBasis::Compounded => self.divisor * ((1.0 + period_rate).powf(1.0 / self.divisor) - 1.0),
        }
    }
}

/// Whether the capital gains tax factor scales the nominal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTaxation {
    /// Only for distributing plans that consider tax.
    Auto,
    /// Whenever the plan considers tax, regardless of distribution type.
    Forced,
}

/// The canonical per-period annuity model of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodModel {
    pub rate: Rate,
    pub periods: f64,
    pub payment: Money,
    pub timing: PaymentTiming,
    pub effective_tax_rate: Rate,
    pub periods_per_year: f64,
    /// Fraction of `payment` that is deposit rather than folded-in interest.
    pub principal_share: f64,
    pub rule: &'static IntervalRule,
    pub saving_type: SavingType,
}

impl PeriodModel {
    /// Average months of the synthetic row, if this model has one.
    pub fn synthetic_months(&self) -> Option<(f64, f64)> {
        self.rule
            .synthetic
            .map(|s| (s.months, s.average_months(self.saving_type)))
    }
}

/// Multiplier on the nominal rate when gains are taxed as they accrue.
pub fn tax_factor(capital_gains_tax: Percent, partial_exemption: Percent) -> f64 {
    1.0 - (capital_gains_tax / 100.0) * (1.0 - partial_exemption / 100.0)
}

/// Share of a gain that is paid as tax.
pub fn effective_tax_rate(capital_gains_tax: Percent, partial_exemption: Percent) -> Rate {
    (1.0 - partial_exemption / 100.0) * capital_gains_tax / 100.0
}

/// Map a plan onto its canonical per-period model.
pub fn normalize(plan: &SavingsPlan, taxation: RateTaxation) -> SavingsResult<PeriodModel> {
    let terms = &plan.terms;
    let rule = rule_for(terms.save_interval, terms.interest_interval)?;
    let tax = &terms.tax;

    let taxed = match taxation {
        RateTaxation::Forced => tax.consider_capital_gains_tax,
        RateTaxation::Auto => tax.is_distributing(),
    };
    let factor = if taxed {
        tax_factor(tax.capital_gains_tax, tax.partial_exemption)
    } else {
        1.0
    };
    let yearly = plan.yearly_interest * factor / 100.0;
    let rate = rule.period_rate(yearly);

    let (payment, timing, principal_share) = match rule.synthetic {
        Some(synthetic) => {
            let average = synthetic.average_months(terms.saving_type);
            let carried = synthetic.months + average * rate;
            (
                plan.saving_rate * carried,
                PaymentTiming::End,
                synthetic.months / carried,
            )
        }
        None => {
            let timing = match terms.saving_type {
                SavingType::InAdvance => PaymentTiming::Begin,
                SavingType::InArrear => PaymentTiming::End,
            };
            (plan.saving_rate, timing, 1.0)
        }
    };

    Ok(PeriodModel {
        rate,
        periods: plan.yearly_duration * rule.periods_per_year,
        payment,
        timing,
        effective_tax_rate: effective_tax_rate(tax.capital_gains_tax, tax.partial_exemption),
        periods_per_year: rule.periods_per_year,
        principal_share,
        rule,
        saving_type: terms.saving_type,
    })
}

/// Convert a solved per-period rate back to a yearly rate (decimal).
///
/// Synthetic rows have no intra-period compounding, so their rate scales by
/// the number of periods per year.
pub fn convert_to_yearly(model: &PeriodModel, period_rate: Rate) -> Rate {
    if model.rule.synthetic.is_some() {
        period_rate * model.periods_per_year
    } else {
        model.rule.yearly_rate(period_rate)
    }
}
