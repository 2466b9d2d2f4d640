//! Standalone compound-interest table: a start capital plus a fixed monthly
//! payment, with interest credited monthly, quarterly or yearly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::SavingsError;
use crate::format::{format_money, DiagramData};
use crate::plan::{InterestInterval, MAX_DURATION_YEARS};
use crate::types::{with_metadata, Amount, ComputationOutput};
use crate::SavingsResult;

const MAX_INTEREST_PERCENT: Decimal = dec!(10000);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundInterestInput {
    pub start_capital: Amount,
    pub monthly_payment: Amount,
    pub duration_years: Decimal,
    /// Nominal yearly rate in percent; may be negative.
    pub yearly_interest: Decimal,
    pub interval: InterestInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundInterestOutput {
    pub final_capital: Amount,
    pub total_payments: Amount,
    pub total_interest: Amount,
    pub final_capital_display: String,
    pub total_payments_display: String,
    pub total_interest_display: String,
    pub diagram: DiagramData,
}

/// Periods per year and months per period.
fn interval_multipliers(interval: InterestInterval) -> (Decimal, Decimal) {
    match interval {
        InterestInterval::Monthly => (dec!(12), dec!(1)),
        InterestInterval::Quarterly => (dec!(4), dec!(3)),
        InterestInterval::Yearly => (dec!(1), dec!(12)),
    }
}

fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn overflow(context: &str) -> SavingsError {
    SavingsError::LedgerOverflow {
        context: context.into(),
    }
}

fn validate(input: &CompoundInterestInput) -> SavingsResult<()> {
    let max_years = Decimal::from(MAX_DURATION_YEARS as u32);
    if input.duration_years < Decimal::ZERO || input.duration_years > max_years {
        return Err(SavingsError::InvalidInput {
            field: "duration_years".into(),
            reason: format!("must be between 0 and {max_years}"),
        });
    }
    if input.yearly_interest.abs() > MAX_INTEREST_PERCENT {
        return Err(SavingsError::InvalidInput {
            field: "yearly_interest".into(),
            reason: "must be between -10000 and 10000 percent".into(),
        });
    }
    Ok(())
}

/// Step the table one interest period at a time.
///
/// Each period's payment is deposited first; interest for the period is
/// earned on the previous period's closing balance only.
pub fn compound_interest(
    input: &CompoundInterestInput,
) -> SavingsResult<ComputationOutput<CompoundInterestOutput>> {
    let start = Instant::now();
    validate(input)?;

    let (periods_per_year, months_per_period) = interval_multipliers(input.interval);
    let start_capital = cents(input.start_capital);
    let payment = cents(input.monthly_payment * months_per_period);
    let rate = input.yearly_interest / dec!(100) / periods_per_year;
    let periods = (input.duration_years * periods_per_year)
        .ceil()
        .to_usize()
        .ok_or_else(|| overflow("period count"))?;
    debug!(periods, interval = %input.interval, "compound interest table");

    let total_payments = input
        .monthly_payment
        .checked_mul(input.duration_years * dec!(12))
        .and_then(|paid| start_capital.checked_add(cents(paid)))
        .ok_or_else(|| overflow("total payments"))?;

    let mut capital = start_capital;
    let mut interest = Decimal::ZERO;
    let mut closing = capital;
    let mut capital_list = Vec::with_capacity(periods);
    let mut interest_list = Vec::with_capacity(periods);

    for _ in 0..periods {
        capital = capital
            .checked_add(payment)
            .ok_or_else(|| overflow("capital"))?;
        capital_list.push(capital);

        let earned = closing
            .checked_mul(rate)
            .map(cents)
            .ok_or_else(|| overflow("interest"))?;
        interest = interest
            .checked_add(earned)
            .ok_or_else(|| overflow("interest"))?;
        interest_list.push(interest);

        closing = capital
            .checked_add(interest)
            .ok_or_else(|| overflow("closing balance"))?;
    }

    let total_interest = closing - total_payments;
    let mut warnings = Vec::new();
    if input.yearly_interest < Decimal::ZERO {
        warnings.push("Negative interest: the table shrinks capital every period".into());
    }

    let output = CompoundInterestOutput {
        final_capital: closing,
        total_payments,
        total_interest,
        final_capital_display: format_money(closing),
        total_payments_display: format_money(total_payments),
        total_interest_display: format_money(total_interest),
        diagram: DiagramData::new(capital_list, interest_list, capital, interest),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Compound interest table (deposit at period start, interest on prior closing balance)",
        &serde_json::json!({
            "interval": input.interval,
            "periods": periods,
            "period_rate": rate.to_string(),
            "payment_per_period": payment.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
