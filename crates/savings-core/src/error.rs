use thiserror::Error;

#[derive(Debug, Error)]
pub enum SavingsError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Underdetermined system: {context}")]
    UnderdeterminedSystem { context: String },

    #[error("Bracketing failure: could not bracket target {target} for {subject} (last upper bound {upper})")]
    BracketingFailure {
        subject: String,
        target: f64,
        upper: f64,
    },

    #[error("Newton divergence at iteration {iteration}: {reason}")]
    NewtonDivergence { reason: String, iteration: u32 },

    #[error("Newton non-convergence: no root within {iterations} iterations")]
    NewtonNonConvergence { iterations: u32 },

    #[error("Invalid interval combination: saving {save}, interest {interest}")]
    InvalidIntervalCombination { save: String, interest: String },

    #[error("Rate convergence failure: RATE did not converge after {iterations} iterations")]
    RateConvergenceFailure { iterations: u32 },

    #[error("Ledger overflow in {context}")]
    LedgerOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for SavingsError {
    fn from(e: serde_json::Error) -> Self {
        SavingsError::SerializationError(e.to_string())
    }
}
