use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::Amount;

/// Chart data and terminal figures of a month- or period-stepped ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramData {
    pub capital_list: Vec<Amount>,
    pub interest_list: Vec<Amount>,
    pub last_capital: String,
    pub last_interest: String,
    pub total_capital: String,
}

impl DiagramData {
    pub fn new(capital_list: Vec<Amount>, interest_list: Vec<Amount>, last_capital: Amount, last_interest: Amount) -> Self {
        Self {
            capital_list,
            interest_list,
            last_capital: format_money(last_capital),
            last_interest: format_money(last_interest),
            total_capital: format_money(last_capital + last_interest),
        }
    }
}

/// Group the integer digits in threes with `.`.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Render `value` with exactly `decimals` places, German style (`1.234,56`).
fn render(value: Decimal, decimals: u32, drop_zero_fraction: bool) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let magnitude = rounded.abs();
    let whole = magnitude.trunc().normalize();
    let fraction = magnitude.fract();

    let mut out = format!("{sign}{}", group_thousands(&whole.to_string()));
    if decimals > 0 && !(drop_zero_fraction && fraction.is_zero()) {
        let scaled = (fraction * Decimal::from(10u64.pow(decimals))).trunc().to_u64().unwrap_or(0);
        out.push(',');
        out.push_str(&format!("{scaled:0width$}", width = decimals as usize));
    }
    out
}

/// Euro amount with two optional decimals: `1.254,40€`, `1.240€`.
pub fn format_money(amount: Decimal) -> String {
    format!("{}€", render(amount, 2, true))
}

/// Figures outside the `Decimal` range: `±∞`, or the float's own digits.
fn render_f64(value: f64, decimals: u32, drop_zero_fraction: bool) -> String {
    if value.is_infinite() {
        return if value < 0.0 { "-∞" } else { "∞" }.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut out = format!("{sign}{}", group_thousands(whole));
    if !fraction.is_empty() && !(drop_zero_fraction && fraction.bytes().all(|b| b == b'0')) {
        out.push(',');
        out.push_str(fraction);
    }
    out
}

/// Euro amount from a solver figure; `∞€` for an unreachable one.
pub fn format_money_f64(amount: f64) -> String {
    match Decimal::from_f64(amount) {
        Some(d) => format_money(d),
        None => format!("{}€", render_f64(amount, 2, true)),
    }
}

/// Plain number with a fixed number of decimals: `24,00`.
pub fn format_number(value: f64, decimals: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => render(d, decimals, false),
        None => render_f64(value, decimals, false),
    }
}

/// A rate given in percent units: `12,00 %`.
pub fn format_percent(value: f64, decimals: u32) -> String {
    format!("{} %", format_number(value, decimals))
}
