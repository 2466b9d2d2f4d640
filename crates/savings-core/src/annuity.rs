use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SavingsError;
use crate::root_finding::{bisect_to_target, BisectionConfig, SearchRange};
use crate::types::{Money, Rate};
use crate::SavingsResult;

const RATE_TOLERANCE: f64 = 1e-10;
const MAX_RATE_ITERATIONS: u32 = 100;
const ZERO_RATE: f64 = 1e-12;

/// Default seed for [`rate`].
pub const DEFAULT_RATE_GUESS: Rate = 0.1;

/// When within a period a payment falls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentTiming {
    #[default]
    End = 0,
    Begin = 1,
}

impl PaymentTiming {
    fn factor(self) -> f64 {
        match self {
            PaymentTiming::End => 0.0,
            PaymentTiming::Begin => 1.0,
        }
    }
}

/// `(1+r)^n - 1`, accurate for rates close to zero.
fn growth_minus_one(rate: Rate, periods: f64) -> f64 {
    if rate > -1.0 {
        (periods * rate.ln_1p()).exp_m1()
    } else {
        (1.0 + rate).powf(periods) - 1.0
    }
}

/// `((1+r)^n - 1) / r`, with the limit `n` at zero rate.
fn annuity_factor(rate: Rate, periods: f64) -> f64 {
    if rate.abs() < ZERO_RATE {
        periods
    } else {
        growth_minus_one(rate, periods) / rate
    }
}

/// Growth factor and timing-adjusted annuity factor, the two coefficients of
/// `pv·g + pmt·kA + fv = 0`.
fn coefficients(rate: Rate, periods: f64, timing: PaymentTiming) -> (f64, f64) {
    let g = growth_minus_one(rate, periods) + 1.0;
    let ka = (1.0 + rate * timing.factor()) * annuity_factor(rate, periods);
    (g, ka)
}

/// Future Value
pub fn fv(rate: Rate, periods: f64, payment: Money, present_value: Money, timing: PaymentTiming) -> Money {
    if rate == 0.0 {
        return -(present_value + payment * periods);
    }
    let (g, ka) = coefficients(rate, periods, timing);
    -(present_value * g + payment * ka)
}

/// Present Value
pub fn pv(rate: Rate, periods: f64, payment: Money, future_value: Money, timing: PaymentTiming) -> Money {
    if rate == 0.0 {
        return -(future_value + payment * periods);
    }
    let (g, ka) = coefficients(rate, periods, timing);
    -(future_value + payment * ka) / g
}

/// Payment (PMT)
pub fn pmt(
    rate: Rate,
    periods: f64,
    present_value: Money,
    future_value: Money,
    timing: PaymentTiming,
) -> SavingsResult<Money> {
    if periods <= 0.0 {
        return Err(SavingsError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate == 0.0 {
        return Ok(-(present_value + future_value) / periods);
    }

    let (g, ka) = coefficients(rate, periods, timing);
    if ka == 0.0 {
        return Err(SavingsError::UnderdeterminedSystem {
            context: "PMT annuity factor is zero".into(),
        });
    }
    Ok(-(present_value * g + future_value) / ka)
}

/// Number of periods (NPER).
///
/// Returns a non-finite value when no period count satisfies the equation;
/// callers treat that as "unreachable".
pub fn nper(rate: Rate, payment: Money, present_value: Money, future_value: Money, timing: PaymentTiming) -> f64 {
    if rate == 0.0 {
        return -(present_value + future_value) / payment;
    }
    let k = payment * (1.0 + rate * timing.factor());
    let ratio = (k - future_value * rate) / (k + present_value * rate);
    ratio.ln() / rate.ln_1p()
}

/// Interest rate per period (RATE), by Newton iteration from `guess`.
pub fn rate(
    periods: f64,
    payment: Money,
    present_value: Money,
    future_value: Money,
    timing: PaymentTiming,
    guess: Rate,
) -> SavingsResult<Rate> {
    let t = timing.factor();
    let mut r = guess;

    for i in 0..MAX_RATE_ITERATIONS {
        let (value, slope) = if r.abs() < ZERO_RATE {
            (
                present_value + payment * periods + future_value,
                present_value * periods + payment * (t * periods + periods * (periods - 1.0) / 2.0),
            )
        } else {
            let g = growth_minus_one(r, periods) + 1.0;
            let a = (g - 1.0) / r;
            let da = (periods * g / (1.0 + r) * r - (g - 1.0)) / (r * r);
            (
                present_value * g + payment * (1.0 + r * t) * a + future_value,
                present_value * periods * g / (1.0 + r) + payment * t * a + payment * (1.0 + r * t) * da,
            )
        };

        if value.abs() < RATE_TOLERANCE {
            return Ok(r);
        }
        if slope == 0.0 || !slope.is_finite() {
            warn!(iteration = i, "RATE derivative vanished");
            return Err(SavingsError::RateConvergenceFailure { iterations: i });
        }

        let next = r - value / slope;
        // Rates at or below -100% have no growth factor
        if !next.is_finite() || next <= -1.0 {
            warn!(iteration = i, next, "RATE left the admissible range");
            return Err(SavingsError::RateConvergenceFailure { iterations: i });
        }
        if (next - r).abs() < RATE_TOLERANCE {
            return Ok(next);
        }
        r = next;
    }

    warn!(iterations = MAX_RATE_ITERATIONS, "RATE did not converge");
    Err(SavingsError::RateConvergenceFailure {
        iterations: MAX_RATE_ITERATIONS,
    })
}

// ---------------------------------------------------------------------------
// Accumulating capital gains tax
// ---------------------------------------------------------------------------

/// Tax due at maturity on the gain over deposits. Never negative.
pub fn accumulating_tax(gross: Money, deposits: Money, tax_rate: Rate) -> Money {
    ((gross - deposits) * tax_rate).max(0.0)
}

/// Present value such that the end value after accumulating tax equals `future_value`.
///
/// Solves `(1-t)·gross + t·deposits = fv` in closed form. If that solution
/// would leave no taxable gain, the untaxed present value applies.
pub fn pv_accumulating_taxed(
    rate: Rate,
    periods: f64,
    payment: Money,
    future_value: Money,
    tax_rate: Rate,
    timing: PaymentTiming,
) -> Money {
    let (g, ka) = coefficients(rate, periods, timing);
    let t = tax_rate;
    let candidate = -(future_value + (1.0 - t) * payment * ka + t * payment * periods) / ((1.0 - t) * g + t);

    let gross = fv(rate, periods, payment, candidate, timing);
    let deposits = -(candidate + payment * periods);
    if gross - deposits <= 0.0 {
        return pv(rate, periods, payment, future_value, timing);
    }
    candidate
}

/// Payment such that the end value after accumulating tax equals `future_value`.
///
/// `principal_share` is the part of each canonical payment that is an actual
/// deposit; the rest is interest folded in by the interval normalization and
/// is not part of the cost basis.
pub fn pmt_accumulating_taxed(
    rate: Rate,
    periods: f64,
    present_value: Money,
    future_value: Money,
    tax_rate: Rate,
    timing: PaymentTiming,
    principal_share: f64,
) -> SavingsResult<Money> {
    let (g, ka) = coefficients(rate, periods, timing);
    let t = tax_rate;
    let denominator = (1.0 - t) * ka + t * principal_share * periods;
    if denominator == 0.0 {
        return pmt(rate, periods, present_value, future_value, timing);
    }
    let candidate = -(future_value + present_value * ((1.0 - t) * g + t)) / denominator;

    let gross = fv(rate, periods, candidate, present_value, timing);
    let deposits = -(present_value + candidate * principal_share * periods);
    if gross - deposits <= 0.0 {
        return pmt(rate, periods, present_value, future_value, timing);
    }
    Ok(candidate)
}

/// Number of periods until the end value after accumulating tax reaches `future_value`.
///
/// There is no closed form, so this brackets and bisects over the period
/// count. A target that is unreachable, or already below the start value,
/// yields `+∞`.
pub fn nper_accumulating_taxed(
    rate: Rate,
    payment: Money,
    present_value: Money,
    future_value: Money,
    tax_rate: Rate,
    timing: PaymentTiming,
    principal_share: f64,
) -> f64 {
    let net = |n: f64| -> SavingsResult<f64> {
        let gross = fv(rate, n, payment, present_value, timing);
        if !gross.is_finite() {
            return Ok(gross);
        }
        let deposits = -(present_value + payment * principal_share * n);
        Ok(gross - accumulating_tax(gross, deposits, tax_rate))
    };

    // Same sentinels as `nper`: a target already passed lies in the past
    let start = -present_value;
    if start == future_value {
        return 0.0;
    }
    if start > future_value {
        return f64::INFINITY;
    }

    let untaxed = nper(rate, payment, present_value, future_value, timing);
    let upper = if untaxed.is_finite() && untaxed > 1.0 { untaxed } else { 1.0 };

    match bisect_to_target(
        "nper_accumulating_taxed",
        net,
        future_value,
        SearchRange::new(0.0, upper),
        &BisectionConfig::default(),
    ) {
        Ok(n) => n,
        Err(_) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() < tolerance
    }

    #[test]
    fn test_pmt_excel_reference() {
        let end = pmt(0.03, 180.0, -20_000.0, 0.0, PaymentTiming::End).unwrap();
        assert!(close(end, 602.948, 1e-3), "got {end}");
        let begin = pmt(0.03, 180.0, -20_000.0, 0.0, PaymentTiming::Begin).unwrap();
        assert!(close(begin, 585.387, 1e-3), "got {begin}");
    }

    #[test]
    fn test_pv_excel_reference() {
        let end = pv(0.03, 180.0, 100.0, 30_000.0, PaymentTiming::End);
        assert!(close(end, -3463.73, 1e-2), "got {end}");
        let begin = pv(0.03, 180.0, 100.0, 30_000.0, PaymentTiming::Begin);
        assert!(close(begin, -3563.24, 1e-2), "got {begin}");
    }

    #[test]
    fn test_fv_excel_reference() {
        let end = fv(0.0025, 180.0, -150.0, 8000.0, PaymentTiming::End);
        assert!(close(end, 21_506.45, 1e-2), "got {end}");
        let begin = fv(0.0025, 180.0, -150.0, 8000.0, PaymentTiming::Begin);
        assert!(close(begin, 21_591.56, 1e-2), "got {begin}");
    }

    #[test]
    fn test_nper_excel_reference() {
        let end = nper(0.0025, -150.0, 0.0, 34_000.0, PaymentTiming::End);
        assert!(close(end, 179.80, 1e-2), "got {end}");
        let begin = nper(0.0025, -150.0, 0.0, 34_000.0, PaymentTiming::Begin);
        assert!(close(begin, 179.44, 1e-2), "got {begin}");
    }

    #[test]
    fn test_rate_excel_reference() {
        let end = rate(15.0, 1800.0, 0.0, -80_000.0, PaymentTiming::End, DEFAULT_RATE_GUESS).unwrap();
        assert!(close(end, 0.141671, 1e-6), "got {end}");
        let begin = rate(15.0, 1800.0, 0.0, -80_000.0, PaymentTiming::Begin, DEFAULT_RATE_GUESS).unwrap();
        assert!(close(begin, 0.126969, 1e-6), "got {begin}");
        let lump = rate(15.0, 0.0, -1000.0, 1_000_000.0, PaymentTiming::Begin, DEFAULT_RATE_GUESS).unwrap();
        assert!(close(lump, 0.584893, 1e-6), "got {lump}");
    }

    #[test]
    fn test_zero_rate_is_linear() {
        assert_eq!(fv(0.0, 10.0, -100.0, -1000.0, PaymentTiming::Begin), 2000.0);
        assert_eq!(pv(0.0, 10.0, -100.0, 2000.0, PaymentTiming::End), -1000.0);
        assert_eq!(pmt(0.0, 10.0, -1000.0, 2000.0, PaymentTiming::End).unwrap(), -100.0);
        assert_eq!(nper(0.0, -100.0, -1000.0, 2000.0, PaymentTiming::End), 10.0);
    }

    #[test]
    fn test_tiny_rate_matches_linear_limit() {
        let v = fv(1e-14, 12.0, -100.0, -1000.0, PaymentTiming::End);
        assert!(close(v, 2200.0, 1e-6), "got {v}");
    }

    #[test]
    fn test_pmt_rejects_zero_periods() {
        assert!(pmt(0.01, 0.0, -100.0, 200.0, PaymentTiming::End).is_err());
    }

    #[test]
    fn test_nper_unreachable_is_not_finite() {
        // Nothing paid in and nothing invested cannot grow
        let n = nper(0.01, 0.0, 0.0, 1000.0, PaymentTiming::End);
        assert!(!n.is_finite());
    }

    #[test]
    fn test_rate_failure_is_an_error() {
        // Paying in and getting less back than paid with no periods to grow
        let result = rate(0.0, 0.0, -100.0, 200.0, PaymentTiming::End, DEFAULT_RATE_GUESS);
        assert!(matches!(result, Err(SavingsError::RateConvergenceFailure { .. })));
    }

    #[test]
    fn test_accumulating_tax_never_negative() {
        assert_eq!(accumulating_tax(900.0, 1000.0, 0.5), 0.0);
        assert!(close(accumulating_tax(1254.4, 1000.0, 0.5), 127.2, 1e-9));
    }

    #[test]
    fn test_pv_accumulating_taxed_hits_target() {
        let (r, n, p, t) = (0.01, 24.0, -10.0, 0.5);
        let start = pv_accumulating_taxed(r, n, p, 1391.09, t, PaymentTiming::Begin);
        let gross = fv(r, n, p, start, PaymentTiming::Begin);
        let net = gross - accumulating_tax(gross, -(start + p * n), t);
        assert!(close(net, 1391.09, 1e-6), "got {net}");
        assert!(close(-start, 1000.0, 0.01), "got {start}");
    }

    #[test]
    fn test_pv_accumulating_taxed_falls_back_without_gain() {
        let plain = pv(0.0, 12.0, -10.0, 500.0, PaymentTiming::End);
        let taxed = pv_accumulating_taxed(0.0, 12.0, -10.0, 500.0, 0.5, PaymentTiming::End);
        assert_eq!(plain, taxed);
    }

    #[test]
    fn test_pmt_accumulating_taxed_hits_target() {
        let (r, n, t) = (0.01, 24.0, 0.5);
        let payment =
            pmt_accumulating_taxed(r, n, -1000.0, 1391.09, t, PaymentTiming::Begin, 1.0).unwrap();
        assert!(close(-payment, 10.0, 0.01), "got {payment}");
    }

    #[test]
    fn test_nper_accumulating_taxed() {
        let n = nper_accumulating_taxed(0.01, -10.0, -1000.0, 1391.09, 0.5, PaymentTiming::Begin, 1.0);
        assert!(close(n, 24.0, 0.01), "got {n}");

        let at_start = nper_accumulating_taxed(0.01, -10.0, -1000.0, 1000.0, 0.5, PaymentTiming::Begin, 1.0);
        assert_eq!(at_start, 0.0);

        let already_passed = nper_accumulating_taxed(0.01, -10.0, -1000.0, 900.0, 0.5, PaymentTiming::Begin, 1.0);
        assert_eq!(already_passed, f64::INFINITY);

        let unreachable = nper_accumulating_taxed(0.0, 0.0, -1000.0, 2000.0, 0.5, PaymentTiming::End, 1.0);
        assert_eq!(unreachable, f64::INFINITY);
    }
}
