use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SavingsError;
use crate::SavingsResult;

/// Iteration limits for [`bisect_to_target`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BisectionConfig {
    /// Stop once `|f(mid) - target|` or the bracket width falls below this.
    pub tolerance: f64,
    pub max_iterations: u32,
    /// How often the upper bound may be doubled while bracketing.
    pub max_expansions: u32,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 100,
            max_expansions: 10,
        }
    }
}

/// Initial `[lower, upper]` search interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRange {
    pub lower: f64,
    pub upper: f64,
}

impl SearchRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }
}

/// Find `x` with `f(x) = target` for a non-decreasing `f`.
///
/// The upper bound is doubled (moving the lower bound up behind it) until the
/// target is bracketed, then the bracket is halved. Returns the midpoint of
/// the final bracket.
pub fn bisect_to_target<F>(
    subject: &str,
    mut f: F,
    target: f64,
    range: SearchRange,
    config: &BisectionConfig,
) -> SavingsResult<f64>
where
    F: FnMut(f64) -> SavingsResult<f64>,
{
    let SearchRange { mut lower, mut upper } = range;

    let mut bracketed = false;
    for _ in 0..config.max_expansions {
        let lower_value = f(lower)?;
        let upper_value = f(upper)?;
        if lower_value <= target && target <= upper_value {
            bracketed = true;
            break;
        }
        if upper_value < target {
            lower = upper;
            upper *= 2.0;
        }
    }

    if !bracketed {
        warn!(subject, target, upper, "could not bracket target");
        return Err(SavingsError::BracketingFailure {
            subject: subject.to_string(),
            target,
            upper,
        });
    }

    for _ in 0..config.max_iterations {
        let mid = (lower + upper) / 2.0;
        let error = f(mid)? - target;
        if error.abs() < config.tolerance {
            return Ok(mid);
        }
        if error < 0.0 {
            lower = mid;
        } else {
            upper = mid;
        }
        if (upper - lower).abs() < config.tolerance {
            break;
        }
    }

    Ok((lower + upper) / 2.0)
}

/// Limits and guards for [`newton`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewtonConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Derivatives smaller than this in magnitude abort the iteration.
    pub derivative_floor: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 50,
            derivative_floor: 1e-15,
            min_value: -0.5,
            max_value: 2.0,
        }
    }
}

/// Newton's method with a caller-supplied derivative.
///
/// `f` returns `(value, derivative)` at a point.
pub fn newton<F>(mut f: F, initial: f64, config: &NewtonConfig) -> SavingsResult<f64>
where
    F: FnMut(f64) -> (f64, f64),
{
    let mut x = initial;

    for i in 0..config.max_iterations {
        let (value, derivative) = f(x);
        if value.abs() < config.tolerance {
            return Ok(x);
        }

        if !derivative.is_finite() || derivative.abs() < config.derivative_floor {
            warn!(iteration = i, x, derivative, "Newton derivative below floor");
            return Err(SavingsError::NewtonDivergence {
                reason: format!("derivative {derivative:e} below floor at x = {x}"),
                iteration: i,
            });
        }

        let next = x - value / derivative;
        if !next.is_finite() || next < config.min_value || next > config.max_value {
            warn!(iteration = i, next, "Newton iterate left the admissible range");
            return Err(SavingsError::NewtonDivergence {
                reason: format!(
                    "iterate {next} outside [{}, {}]",
                    config.min_value, config.max_value
                ),
                iteration: i,
            });
        }

        if (next - x).abs() < config.tolerance {
            return Ok(next);
        }
        x = next;
    }

    warn!(iterations = config.max_iterations, "Newton did not converge");
    Err(SavingsError::NewtonNonConvergence {
        iterations: config.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bisect_finds_square_root() {
        let root = bisect_to_target(
            "square",
            |x| Ok(x * x),
            2.0,
            SearchRange::new(0.0, 2.0),
            &BisectionConfig::default(),
        )
        .unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_bisect_expands_upper_bound() {
        let root = bisect_to_target(
            "linear",
            |x| Ok(3.0 * x),
            300.0,
            SearchRange::new(0.0, 1.0),
            &BisectionConfig::default(),
        )
        .unwrap();
        assert!((root - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_bisect_reports_bracketing_failure() {
        let err = bisect_to_target(
            "flat",
            |_| Ok(1.0),
            5.0,
            SearchRange::new(0.0, 1.0),
            &BisectionConfig::default(),
        )
        .unwrap_err();
        match err {
            SavingsError::BracketingFailure { subject, upper, .. } => {
                assert_eq!(subject, "flat");
                assert_eq!(upper, 1024.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bisect_fails_when_target_below_lower_value() {
        let result = bisect_to_target(
            "shifted",
            |x| Ok(x + 10.0),
            5.0,
            SearchRange::new(0.0, 1.0),
            &BisectionConfig::default(),
        );
        assert!(matches!(result, Err(SavingsError::BracketingFailure { .. })));
    }

    #[test]
    fn test_bisect_propagates_evaluation_errors() {
        let result = bisect_to_target(
            "failing",
            |_| {
                Err(SavingsError::UnderdeterminedSystem {
                    context: "test".into(),
                })
            },
            1.0,
            SearchRange::new(0.0, 1.0),
            &BisectionConfig::default(),
        );
        assert!(matches!(result, Err(SavingsError::UnderdeterminedSystem { .. })));
    }

    #[test]
    fn test_newton_converges() {
        let root = newton(|x| (x * x - 0.25, 2.0 * x), 1.0, &NewtonConfig::default()).unwrap();
        assert!((root - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_newton_flat_derivative_diverges() {
        let result = newton(|_| (1.0, 0.0), 0.1, &NewtonConfig::default());
        assert!(matches!(result, Err(SavingsError::NewtonDivergence { iteration: 0, .. })));
    }

    #[test]
    fn test_newton_out_of_range_diverges() {
        // Root at 10 lies outside the admissible range
        let result = newton(|x| (x - 10.0, 1.0), 0.0, &NewtonConfig::default());
        assert!(matches!(result, Err(SavingsError::NewtonDivergence { .. })));
    }

    #[test]
    fn test_newton_iteration_limit_exhausted() {
        let config = NewtonConfig {
            max_iterations: 2,
            ..NewtonConfig::default()
        };
        let result = newton(|x| (x * x * x - 0.001, 3.0 * x * x), 1.5, &config);
        assert!(matches!(
            result,
            Err(SavingsError::NewtonNonConvergence { iterations: 2 })
        ));
    }
}
