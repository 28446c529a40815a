//! Configuration settings for the oracle and the facility sweep.

use crate::error::{LocateError, LocateResult};

/// Default bracket width at which the alpha search stops.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Settings handed to every oracle session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverSettings {
    /// Threads per solve. `0` lets the backend decide.
    pub threads: u32,

    /// Forward the backend's own log to the console.
    pub verbose: bool,
}

/// Settings for [`FacilitySweep`](crate::search::FacilitySweep).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSettings {
    /// Number of concurrent workers. Each worker runs one facility count at a time.
    pub jobs: usize,

    /// Alpha search tolerance.
    pub tolerance: f64,

    /// Largest facility count to search. `None` uses the number of candidate sites.
    pub max_facility_count: Option<usize>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            jobs: 1,
            tolerance: DEFAULT_TOLERANCE,
            max_facility_count: None,
        }
    }
}

impl SweepSettings {
    /// Check ranges before any worker is started.
    pub fn validate(&self) -> LocateResult<()> {
        if self.jobs == 0 {
            return Err(LocateError::InvalidParameter(
                "jobs must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(LocateError::InvalidParameter(format!(
                "tolerance must lie in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_facility_count == Some(0) {
            return Err(LocateError::InvalidParameter(
                "max facility count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Facility count limit, falling back to `sites` when unset.
    pub fn facility_limit(&self, sites: usize) -> usize {
        self.max_facility_count.unwrap_or(sites)
    }
}
