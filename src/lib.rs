//! Maximal demand coverage for facility location models.
//!
//! For each number of facilities, a bisection on the coverage fraction
//! `alpha` finds the largest value for which a coverage model stays
//! feasible. Feasibility is decided by a MILP oracle (HiGHS by default), and
//! the searches for different facility counts run on a worker pool.
//!
//! ```no_run
//! use std::sync::Arc;
//! use apsloc::{DoubleStandardModel, FacilitySweep, HighsOracle, Instance, ModelConfig};
//!
//! # fn main() -> apsloc::LocateResult<()> {
//! let instance = Arc::new(Instance::from_json_file("instance.json")?);
//! let config = ModelConfig::new(10.0, 20.0)?;
//! let oracle = HighsOracle::default();
//!
//! let sweep = FacilitySweep::new(instance.n_sites(), 4, 1e-6)?;
//! let outcome = sweep.run(|| DoubleStandardModel::new(instance.clone(), config, oracle))?;
//! println!("{:?}", outcome.alphas());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod instance;
pub mod locate;
pub mod reach;
pub mod results;
pub mod search;
pub mod settings;

pub use error::{LocateError, LocateResult};
pub use instance::{Instance, ModelConfig, ModelOneInstance};
pub use locate::solver::{HighsOracle, MipProblem, Oracle, OracleStatus, SolveLimit};
pub use locate::{
    BestCouplingModel, CoverageModel, DoubleStandardModel, ModelOne, ObjectiveMode,
};
pub use reach::ReachMatrix;
pub use results::AlphaLog;
pub use search::{find_max_alpha, AlphaSearch, FacilitySweep, SweepOutcome};
pub use settings::{SolverSettings, SweepSettings};
