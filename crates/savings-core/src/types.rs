use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Plan figures handed to the solvers. Plain floats; rounding happens at the boundary.
pub type Money = f64;

/// Rates expressed as decimals per period (0.05 = 5%).
pub type Rate = f64;

/// Rates expressed as percentages (5.0 = 5%), the unit of `yearly_interest`.
pub type Percent = f64;

/// Year fractions or counts
pub type Years = f64;

/// Fixed-point ledger amounts used by the month-stepped projections.
pub type Amount = Decimal;

/// Round a solver result to cents, half away from zero.
///
/// Non-finite values (the `+∞` "unreachable" sentinel) pass through untouched.
pub fn round_money(value: Money) -> Money {
    if !value.is_finite() {
        return value;
    }
    match Decimal::from_f64(value) {
        Some(d) => d
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        // Beyond the Decimal range a cent is below f64 resolution anyway
        None => (value * 100.0).round() / 100.0,
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "f64 formulas, rust_decimal 3dp ledger".to_string(),
        },
    }
}
