use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annuity::accumulating_tax;
use crate::error::SavingsError;
use crate::plan::{InterestInterval, SaveInterval, SavingType, SavingsPlan, MAX_DURATION_YEARS};
use crate::types::Amount;
use crate::SavingsResult;

/// Month-end capital and accumulated interest of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Deposited capital at the end of each month.
    pub capital: Vec<Amount>,
    /// Interest accumulated up to the end of each month; the final entry is net of
    /// accumulating tax.
    pub interest: Vec<Amount>,
    pub last_capital: Amount,
    pub last_interest: Amount,
    pub total: Amount,
}

impl Trajectory {
    fn empty() -> Self {
        Self {
            capital: Vec::new(),
            interest: Vec::new(),
            last_capital: Decimal::ZERO,
            last_interest: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Ledger precision: tenths of a cent.
fn ledger(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(3, RoundingStrategy::MidpointNearestEven)
}

fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn to_decimal(field: &str, value: f64) -> SavingsResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| SavingsError::LedgerOverflow {
        context: format!("{field} = {value}"),
    })
}

fn add(a: Decimal, b: Decimal) -> SavingsResult<Decimal> {
    a.checked_add(b).ok_or_else(|| SavingsError::LedgerOverflow {
        context: "projection balance".into(),
    })
}

fn accrue(balance: Decimal, rate: Decimal) -> SavingsResult<Decimal> {
    balance
        .checked_mul(rate)
        .map(ledger)
        .ok_or_else(|| SavingsError::LedgerOverflow {
            context: "projection interest".into(),
        })
}

/// Whole months covered by a duration; solved durations a hair under a month
/// boundary still count the month.
pub fn whole_months(yearly_duration: f64) -> usize {
    (yearly_duration * 12.0 + 1e-6).floor().max(0.0) as usize
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Step a complete plan month by month.
///
/// Contributions in advance are booked before the month's interest, in
/// arrear after it. Monthly contributions credited on a coarser interest
/// interval earn interest on the same average-months basis the closed-form
/// solvers use.
///
/// Every interest credit is rounded to a tenth of a cent, and with a steady
/// balance those roundings lean the same way. The final total therefore
/// stays within `0.015 + 0.0005·credits·(1+y)^years` of the solved end value,
/// where `y` is the yearly rate as a decimal: a cent over short horizons,
/// several cents over decades.
pub fn project(plan: &SavingsPlan) -> SavingsResult<Trajectory> {
    let duration = plan.yearly_duration;
    if !duration.is_finite() || duration < 0.0 || duration > MAX_DURATION_YEARS {
        return Err(SavingsError::InvalidInput {
            field: "yearly_duration".into(),
            reason: format!("cannot project {duration} years"),
        });
    }

    let months = whole_months(duration);
    debug!(months, "projecting savings plan");
    if months == 0 {
        return Ok(Trajectory::empty());
    }

    let terms = &plan.terms;
    let tax = &terms.tax;
    let factor = if tax.is_distributing() { tax.tax_factor() } else { 1.0 };
    let yearly = plan.yearly_interest * factor / 100.0;
    let monthly_rate = to_decimal("yearly_interest", yearly / 12.0)?;
    let quarterly_rate = to_decimal("yearly_interest", yearly / 4.0)?;
    let yearly_rate = to_decimal("yearly_interest", yearly)?;

    let saving = ledger(to_decimal("saving_rate", plan.saving_rate)?);
    let monthly_saving = terms.save_interval == SaveInterval::Monthly;
    let in_advance = terms.saving_type == SavingType::InAdvance;

    let mut capital = ledger(to_decimal("start_value", plan.start_value)?);
    let mut interest = Decimal::ZERO;
    let mut capital_list = Vec::with_capacity(months);
    let mut interest_list = Vec::with_capacity(months);

    for month in 1..=months {
        let deposits = monthly_saving || if in_advance { month % 12 == 1 } else { month % 12 == 0 };

        if in_advance && deposits {
            capital = add(capital, saving)?;
        }

        let balance = add(capital, interest)?;
        let accrual = match terms.interest_interval {
            InterestInterval::Monthly => Some(accrue(balance, monthly_rate)?),
            InterestInterval::Quarterly if month % 3 == 0 => {
                // One month of contributions on average has not yet earned a full quarter
                let average = if monthly_saving { balance - saving } else { balance };
                Some(accrue(average, quarterly_rate)?)
            }
            InterestInterval::Yearly if month % 12 == 0 => {
                let average = if monthly_saving {
                    balance - accrue(saving, dec!(5.5))?
                } else {
                    balance
                };
                Some(accrue(average, yearly_rate)?)
            }
            _ => None,
        };
        if let Some(accrued) = accrual {
            interest = add(interest, accrued)?;
        }

        if !in_advance && deposits {
            capital = add(capital, saving)?;
        }

        capital_list.push(cents(capital));
        interest_list.push(cents(interest));
    }

    let last = months - 1;
    if tax.is_accumulating() {
        let gross = add(capital_list[last], interest_list[last])?
            .to_f64()
            .ok_or_else(|| SavingsError::LedgerOverflow {
                context: "accumulating tax base".into(),
            })?;
        let due = accumulating_tax(gross, plan.deposits(), tax.effective_tax_rate());
        interest_list[last] -= cents(to_decimal("capital_gains_tax", due)?);
    }

    let last_capital = capital_list[last];
    let last_interest = interest_list[last];
    let total = add(last_capital, last_interest)?;
    Ok(Trajectory {
        capital: capital_list,
        interest: interest_list,
        last_capital,
        last_interest,
        total,
    })
}
