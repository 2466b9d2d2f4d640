pub mod annuity;
pub mod error;
pub mod format;
pub mod normalizer;
pub mod plan;
pub mod root_finding;
pub mod solvers;
pub mod types;

#[cfg(feature = "projection")]
pub mod projection;

#[cfg(feature = "projection")]
pub mod savings;

#[cfg(feature = "compound_interest")]
pub mod compound_interest;

pub use error::SavingsError;
pub use plan::{
    DistributionType, InterestInterval, PlanField, PlanTerms, SaveInterval, SavingType, SavingsPlan,
    SavingsQuery, TaxTreatment,
};
pub use solvers::solve;
pub use types::*;

/// Standard result type for all savings computations
pub type SavingsResult<T> = Result<T, SavingsError>;
