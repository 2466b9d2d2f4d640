use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SavingsError;
use crate::format::{format_money_f64, format_number, format_percent, DiagramData};
use crate::plan::{PlanField, SavingsPlan, SavingsQuery, MAX_DURATION_YEARS};
use crate::projection::project;
use crate::solvers::solve;
use crate::types::{with_metadata, ComputationOutput, Money, Years};
use crate::SavingsResult;

/// A solved plan with its derived figures and month-by-month chart data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsReport {
    pub solved_for: PlanField,
    /// The plan with the solved figure filled in.
    pub plan: SavingsPlan,
    pub deposits: Money,
    pub interest_after_tax: Money,
    pub monthly_duration: Years,
    pub display: SavingsDisplay,
    /// Absent when the plan never reaches its end value.
    pub diagram: Option<DiagramData>,
}

/// The report's figures rendered for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsDisplay {
    pub end_value: String,
    pub start_capital: String,
    pub saving_rate: String,
    pub yearly_duration: String,
    pub monthly_duration: String,
    pub yearly_interest: String,
    pub deposits: String,
    pub interest_after_tax: String,
}

impl SavingsDisplay {
    fn of(plan: &SavingsPlan, deposits: Money, interest_after_tax: Money) -> Self {
        Self {
            end_value: format_money_f64(plan.end_value),
            start_capital: format_money_f64(plan.start_value),
            saving_rate: format_money_f64(plan.saving_rate),
            yearly_duration: format_number(plan.yearly_duration, 2),
            monthly_duration: format_number(plan.yearly_duration * 12.0, 2),
            yearly_interest: format_percent(plan.yearly_interest, 2),
            deposits: format_money_f64(deposits),
            interest_after_tax: format_money_f64(interest_after_tax),
        }
    }
}

/// Solve the figure missing from `query` and project the completed plan.
pub fn project_savings(query: &SavingsQuery) -> SavingsResult<ComputationOutput<SavingsReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Validation ---
    query.validate()?;
    let (solved_for, mut plan) = query.into_plan()?;

    let value = solve(&plan, solved_for)?;
    solved_for.set(&mut plan, value);

    let deposits = plan.deposits();
    let interest_after_tax = plan.end_value - deposits;

    let diagram = if plan.yearly_duration.is_finite() && plan.yearly_duration <= MAX_DURATION_YEARS {
        if !plan.terms.use_compound_interest {
            warnings.push(
                "Chart compounds interest; simple-interest plans end below the charted total".into(),
            );
        }
        match project(&plan) {
            Ok(trajectory) => Some(DiagramData::new(
                trajectory.capital,
                trajectory.interest,
                trajectory.last_capital,
                trajectory.last_interest,
            )),
            Err(SavingsError::LedgerOverflow { context }) => {
                warnings.push(format!("Chart values exceed the ledger range ({context}); no chart data"));
                None
            }
            Err(e) => return Err(e),
        }
    } else if plan.yearly_duration.is_finite() {
        warnings.push(format!(
            "Duration exceeds {MAX_DURATION_YEARS} years; no chart data"
        ));
        None
    } else {
        warnings.push("End value is never reached; no chart data".into());
        None
    };

    if solved_for == PlanField::SavingRate && plan.saving_rate < 0.0 {
        warnings.push("Start capital alone exceeds the end value; saving rate is negative".into());
    }
    if solved_for == PlanField::StartValue && plan.start_value < 0.0 {
        warnings.push("Contributions alone exceed the end value; start capital is negative".into());
    }

    let report = SavingsReport {
        solved_for,
        display: SavingsDisplay::of(&plan, deposits, interest_after_tax),
        plan,
        deposits,
        interest_after_tax,
        monthly_duration: plan.yearly_duration * 12.0,
        diagram,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Savings plan solver (annuity closed forms, bisection and Newton inversions, monthly ledger)",
        &serde_json::json!({
            "solved_for": solved_for,
            "save_interval": plan.terms.save_interval,
            "interest_interval": plan.terms.interest_interval,
            "saving_type": plan.terms.saving_type,
            "compound_interest": plan.terms.use_compound_interest,
            "capital_gains_tax": plan.terms.tax,
        }),
        warnings,
        elapsed,
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DistributionType, InterestInterval, PlanTerms, SaveInterval, TaxTreatment};

    fn query() -> SavingsQuery {
        let mut terms = PlanTerms::new(SaveInterval::Yearly, InterestInterval::Yearly);
        terms.tax = TaxTreatment {
            consider_capital_gains_tax: true,
            capital_gains_tax: 26.375,
            partial_exemption: 30.0,
            distribution_type: DistributionType::Distributing,
        };
        SavingsQuery {
            start_value: Some(5000.0),
            saving_rate: Some(1800.0),
            yearly_duration: Some(10.0),
            yearly_interest: Some(1.5),
            end_value: None,
            terms,
        }
    }

    #[test]
    fn test_end_value_report() {
        let out = project_savings(&query()).unwrap();
        let report = out.result;
        assert_eq!(report.solved_for, PlanField::EndValue);
        assert_eq!(report.plan.end_value, 24_902.68);
        assert_eq!(report.deposits, 23_000.0);
        assert!((report.interest_after_tax - 1902.68).abs() < 1e-6);
        assert_eq!(report.monthly_duration, 120.0);
        assert_eq!(report.display.end_value, "24.902,68€");
        assert_eq!(report.display.deposits, "23.000€");

        let diagram = report.diagram.unwrap();
        assert_eq!(diagram.capital_list.len(), 120);
        assert_eq!(diagram.total_capital, "24.902,68€");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_unreachable_duration_has_no_diagram() {
        let q = SavingsQuery {
            start_value: Some(0.0),
            saving_rate: Some(0.0),
            yearly_duration: None,
            yearly_interest: Some(5.0),
            end_value: Some(1000.0),
            terms: PlanTerms::new(SaveInterval::Monthly, InterestInterval::Monthly),
        };
        let out = project_savings(&q).unwrap();
        assert_eq!(out.result.plan.yearly_duration, f64::INFINITY);
        assert!(out.result.diagram.is_none());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_validation_runs_first() {
        let mut q = query();
        q.start_value = Some(-1.0);
        assert!(project_savings(&q).is_err());
    }
}
