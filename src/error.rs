//! Error types for coverage search.

use thiserror::Error;

use crate::locate::solver::OracleStatus;

/// Errors that can occur while loading data, building models or searching.
///
/// An infeasible model is not an error: it is the `false` branch of
/// [`CoverageModel::is_feasible`](crate::locate::CoverageModel::is_feasible).
#[derive(Error, Debug)]
pub enum LocateError {
    /// Instance arrays disagree on shape or hold invalid values
    #[error("Malformed instance: {0}")]
    MalformedInstance(String),

    /// A parameter is outside its accepted range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A feasibility check or solve was requested before `build`
    #[error("Model has not been built")]
    NotBuilt,

    /// The MILP backend failed to load or run the problem
    #[error("Oracle failed: {0}")]
    OracleFailure(String),

    /// A full solve finished without a usable solution
    #[error("No solution found (status: {0:?})")]
    NoSolution(OracleStatus),

    /// The sweep worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for coverage operations.
pub type LocateResult<T> = Result<T, LocateError>;
