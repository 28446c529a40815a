//! Coverage location models
//!
//! Every model that the alpha search can drive implements [`CoverageModel`].
//! A model owns its instance data and its oracle; `build` always starts a new
//! [`MipProblem`](solver::MipProblem) from scratch.

pub mod best_coupling;
pub mod double_standard;
pub mod model_one;
pub mod solver;

#[cfg(test)]
pub(crate) mod enumerate;

pub use best_coupling::{BestCouplingModel, CouplingSolution};
pub use double_standard::{DoubleStandardModel, DoubleStandardSolution};
pub use model_one::{ModelOne, ModelOneSolution, ObjectiveMode};

use crate::error::{LocateError, LocateResult};

/// Shared contract of the searchable coverage models.
pub trait CoverageModel {
    /// Typed result of a full solve.
    type Solution;

    /// Build a fresh problem for `facility_count` open facilities and a
    /// minimum coverage fraction of `alpha`, replacing any previous one.
    fn build(&mut self, facility_count: usize, alpha: f64) -> LocateResult<()>;

    /// Whether the built problem has any feasible point.
    fn is_feasible(&self) -> LocateResult<bool>;

    /// Solve the built problem to optimality.
    fn solve(&self) -> LocateResult<Self::Solution>;
}

/// Check the common `build` preconditions.
pub(crate) fn check_build_args(facility_count: usize, alpha: f64) -> LocateResult<()> {
    if facility_count == 0 {
        return Err(LocateError::InvalidParameter(
            "facility count must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(LocateError::InvalidParameter(format!(
            "alpha must lie in [0, 1], got {}",
            alpha
        )));
    }
    Ok(())
}
