use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SavingsError;
use crate::normalizer;
use crate::types::{Money, Percent, Years};
use crate::SavingsResult;

// ---------------------------------------------------------------------------
// Plan modifiers
// ---------------------------------------------------------------------------

/// How often a contribution is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveInterval {
    Monthly,
    Yearly,
}

/// How often interest is credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterestInterval {
    Monthly,
    Quarterly,
    Yearly,
}

/// Whether a contribution lands at the start or the end of its period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavingType {
    #[default]
    InAdvance,
    InArrear,
}

/// How capital gains are taxed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistributionType {
    /// Gains are paid out and taxed every period, shrinking the effective rate.
    #[default]
    Distributing,
    /// Gains are retained and taxed once, at maturity.
    Accumulating,
}

impl SaveInterval {
    /// Contributions per year.
    pub fn per_year(self) -> f64 {
        match self {
            SaveInterval::Monthly => 12.0,
            SaveInterval::Yearly => 1.0,
        }
    }
}

impl fmt::Display for SaveInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveInterval::Monthly => write!(f, "monthly"),
            SaveInterval::Yearly => write!(f, "yearly"),
        }
    }
}

impl fmt::Display for InterestInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestInterval::Monthly => write!(f, "monthly"),
            InterestInterval::Quarterly => write!(f, "quarterly"),
            InterestInterval::Yearly => write!(f, "yearly"),
        }
    }
}

/// Longest plan the solvers and the projection accept.
pub const MAX_DURATION_YEARS: f64 = 1000.0;

fn default_true() -> bool {
    true
}

/// Capital-gains-tax regime. Ignored entirely unless `consider_capital_gains_tax` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxTreatment {
    #[serde(default)]
    pub consider_capital_gains_tax: bool,
    /// Tax rate on gains, in percent.
    #[serde(default)]
    pub capital_gains_tax: Percent,
    /// Share of gains exempt from tax, in percent.
    #[serde(default)]
    pub partial_exemption: Percent,
    #[serde(default)]
    pub distribution_type: DistributionType,
}

impl TaxTreatment {
    /// Multiplier on the nominal rate when gains are taxed as they accrue.
    pub fn tax_factor(&self) -> f64 {
        normalizer::tax_factor(self.capital_gains_tax, self.partial_exemption)
    }

    /// Share of a gain that goes to tax.
    pub fn effective_tax_rate(&self) -> f64 {
        normalizer::effective_tax_rate(self.capital_gains_tax, self.partial_exemption)
    }

    pub fn is_accumulating(&self) -> bool {
        self.consider_capital_gains_tax && self.distribution_type == DistributionType::Accumulating
    }

    pub fn is_distributing(&self) -> bool {
        self.consider_capital_gains_tax && self.distribution_type == DistributionType::Distributing
    }
}

/// Everything about a plan except its five figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTerms {
    #[serde(rename = "saveIntervalType")]
    pub save_interval: SaveInterval,
    #[serde(rename = "interestIntervalType")]
    pub interest_interval: InterestInterval,
    #[serde(default)]
    pub saving_type: SavingType,
    #[serde(default = "default_true")]
    pub use_compound_interest: bool,
    #[serde(flatten)]
    pub tax: TaxTreatment,
}

impl PlanTerms {
    pub fn new(save_interval: SaveInterval, interest_interval: InterestInterval) -> Self {
        Self {
            save_interval,
            interest_interval,
            saving_type: SavingType::InAdvance,
            use_compound_interest: true,
            tax: TaxTreatment::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// A savings plan with all five figures filled in.
///
/// The solvers read every figure except their own target, which may hold any
/// placeholder value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlan {
    pub start_value: Money,
    /// Contribution per save interval.
    pub saving_rate: Money,
    pub yearly_duration: Years,
    /// Nominal annual rate in percent.
    pub yearly_interest: Percent,
    pub end_value: Money,
    #[serde(flatten)]
    pub terms: PlanTerms,
}

impl SavingsPlan {
    /// Sum of everything paid in over the life of the plan.
    pub fn deposits(&self) -> Money {
        if self.saving_rate == 0.0 {
            return self.start_value;
        }
        self.start_value
            + self.saving_rate * self.yearly_duration * self.terms.save_interval.per_year()
    }
}

/// One of the five figures of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanField {
    StartValue,
    SavingRate,
    YearlyDuration,
    YearlyInterest,
    EndValue,
}

impl PlanField {
    pub const ALL: [PlanField; 5] = [
        PlanField::StartValue,
        PlanField::SavingRate,
        PlanField::YearlyDuration,
        PlanField::YearlyInterest,
        PlanField::EndValue,
    ];

    pub fn get(self, plan: &SavingsPlan) -> f64 {
        match self {
            PlanField::StartValue => plan.start_value,
            PlanField::SavingRate => plan.saving_rate,
            PlanField::YearlyDuration => plan.yearly_duration,
            PlanField::YearlyInterest => plan.yearly_interest,
            PlanField::EndValue => plan.end_value,
        }
    }

    pub fn set(self, plan: &mut SavingsPlan, value: f64) {
        match self {
            PlanField::StartValue => plan.start_value = value,
            PlanField::SavingRate => plan.saving_rate = value,
            PlanField::YearlyDuration => plan.yearly_duration = value,
            PlanField::YearlyInterest => plan.yearly_interest = value,
            PlanField::EndValue => plan.end_value = value,
        }
    }

    /// Returns a copy of `plan` with this field replaced.
    pub fn with(self, plan: &SavingsPlan, value: f64) -> SavingsPlan {
        let mut next = *plan;
        self.set(&mut next, value);
        next
    }

    pub fn name(self) -> &'static str {
        match self {
            PlanField::StartValue => "start_value",
            PlanField::SavingRate => "saving_rate",
            PlanField::YearlyDuration => "yearly_duration",
            PlanField::YearlyInterest => "yearly_interest",
            PlanField::EndValue => "end_value",
        }
    }
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A plan as a caller supplies it: exactly one figure is left out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsQuery {
    #[serde(default)]
    pub start_value: Option<Money>,
    #[serde(default)]
    pub saving_rate: Option<Money>,
    #[serde(default)]
    pub yearly_duration: Option<Years>,
    #[serde(default)]
    pub yearly_interest: Option<Percent>,
    #[serde(default)]
    pub end_value: Option<Money>,
    #[serde(flatten)]
    pub terms: PlanTerms,
}

impl SavingsQuery {
    fn figure(&self, field: PlanField) -> Option<f64> {
        match field {
            PlanField::StartValue => self.start_value,
            PlanField::SavingRate => self.saving_rate,
            PlanField::YearlyDuration => self.yearly_duration,
            PlanField::YearlyInterest => self.yearly_interest,
            PlanField::EndValue => self.end_value,
        }
    }

    /// The single figure left out, which is what gets solved for.
    pub fn target(&self) -> SavingsResult<PlanField> {
        let missing: Vec<PlanField> = PlanField::ALL
            .into_iter()
            .filter(|f| self.figure(*f).is_none())
            .collect();
        match missing.as_slice() {
            [field] => Ok(*field),
            [] => Err(SavingsError::InvalidInput {
                field: "plan".into(),
                reason: "one of the five figures must be left out as the solve target".into(),
            }),
            _ => Err(SavingsError::InvalidInput {
                field: "plan".into(),
                reason: format!(
                    "only one figure may be left out, missing: {}",
                    missing
                        .iter()
                        .map(|f| f.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }

    /// Splits the query into its target and a plan with the target zeroed.
    pub fn into_plan(self) -> SavingsResult<(PlanField, SavingsPlan)> {
        let target = self.target()?;
        let plan = SavingsPlan {
            start_value: self.start_value.unwrap_or_default(),
            saving_rate: self.saving_rate.unwrap_or_default(),
            yearly_duration: self.yearly_duration.unwrap_or_default(),
            yearly_interest: self.yearly_interest.unwrap_or_default(),
            end_value: self.end_value.unwrap_or_default(),
            terms: self.terms,
        };
        Ok((target, plan))
    }

    /// Range checks on the figures and tax terms that are present.
    pub fn validate(&self) -> SavingsResult<()> {
        for field in PlanField::ALL {
            let Some(value) = self.figure(field) else {
                continue;
            };
            if !value.is_finite() {
                return Err(invalid(field.name(), "must be a finite number"));
            }
            match field {
                PlanField::StartValue | PlanField::SavingRate | PlanField::EndValue => {
                    if value < 0.0 {
                        return Err(invalid(field.name(), "must be >= 0"));
                    }
                }
                PlanField::YearlyDuration => {
                    if value <= 0.0 || value > MAX_DURATION_YEARS {
                        return Err(invalid(field.name(), "must be > 0 and <= 1000 years"));
                    }
                }
                PlanField::YearlyInterest => {
                    if !(0.0..=10_000.0).contains(&value) {
                        return Err(invalid(field.name(), "must be between 0 and 10000 percent"));
                    }
                }
            }
        }

        let tax = &self.terms.tax;
        if !(0.0..=100.0).contains(&tax.capital_gains_tax) {
            return Err(invalid("capital_gains_tax", "must be between 0 and 100 percent"));
        }
        if !(0.0..=100.0).contains(&tax.partial_exemption) {
            return Err(invalid("partial_exemption", "must be between 0 and 100 percent"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> SavingsError {
    SavingsError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}
