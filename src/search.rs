//! Maximal alpha search
//!
//! [`AlphaSearch`] bisects the coverage fraction for one facility count;
//! [`FacilitySweep`] runs one search per facility count on a worker pool.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::error::{LocateError, LocateResult};
use crate::locate::CoverageModel;
use crate::settings::{SweepSettings, DEFAULT_TOLERANCE};

/// Bisection over `alpha ∈ [0, 1]`.
///
/// Assumes feasibility is non-increasing in alpha for a fixed facility
/// count. Nothing checks this; if a model breaks it the result is some
/// point where feasibility flips, not necessarily the largest one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaSearch {
    tolerance: f64,
}

impl Default for AlphaSearch {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl AlphaSearch {
    pub fn new(tolerance: f64) -> LocateResult<Self> {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(LocateError::InvalidParameter(format!(
                "tolerance must lie in (0, 1), got {}",
                tolerance
            )));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Largest alpha for which `model` is feasible with `facility_count` facilities.
    ///
    /// Returns the midpoint of the final bracket, i.e. the last alpha tested.
    /// It lies within the tolerance of the feasibility threshold but may itself
    /// have tested infeasible.
    pub fn run<M: CoverageModel>(&self, model: &mut M, facility_count: usize) -> LocateResult<f64> {
        let mut low = 0.0_f64;
        let mut high = 1.0_f64;
        let mut alpha = 0.5;
        let mut iterations = 0;

        while (high - low).abs() > self.tolerance {
            alpha = (low + high) / 2.0;
            model.build(facility_count, alpha)?;
            let feasible = model.is_feasible()?;
            log::trace!(
                "count={} iter={} alpha={:.8} feasible={}",
                facility_count,
                iterations,
                alpha,
                feasible
            );
            if feasible {
                low = alpha;
            } else {
                high = alpha;
            }
            iterations += 1;
        }

        if low == 0.0 {
            log::warn!(
                "no feasible alpha found with {} facilities; result {:.2e} is the bracket floor",
                facility_count,
                alpha
            );
        }
        log::debug!(
            "count={} converged to alpha={:.6} after {} iterations",
            facility_count,
            alpha,
            iterations
        );
        Ok(alpha)
    }
}

/// Convenience wrapper around [`AlphaSearch::run`].
pub fn find_max_alpha<M: CoverageModel>(model: &mut M, facility_count: usize, tolerance: f64) -> LocateResult<f64> {
    AlphaSearch::new(tolerance)?.run(model, facility_count)
}

/// Per facility count results of a sweep, in facility-count order.
#[derive(Debug)]
pub struct SweepOutcome {
    results: Vec<LocateResult<f64>>,
}

impl SweepOutcome {
    /// Result for facility count `k + 1` at index `k`.
    pub fn results(&self) -> &[LocateResult<f64>] {
        &self.results
    }

    pub fn into_results(self) -> Vec<LocateResult<f64>> {
        self.results
    }

    /// Alphas with `None` where the search failed.
    pub fn alphas(&self) -> Vec<Option<f64>> {
        self.results.iter().map(|r| r.as_ref().ok().copied()).collect()
    }

    /// Failed searches as `(facility_count, error)`.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &LocateError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k + 1, e)))
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }
}

/// Runs an [`AlphaSearch`] for every facility count `1..=max_facility_count`.
#[derive(Debug, Clone, Copy)]
pub struct FacilitySweep {
    max_facility_count: usize,
    jobs: usize,
    search: AlphaSearch,
}

impl FacilitySweep {
    pub fn new(max_facility_count: usize, jobs: usize, tolerance: f64) -> LocateResult<Self> {
        if jobs == 0 {
            return Err(LocateError::InvalidParameter(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_facility_count,
            jobs,
            search: AlphaSearch::new(tolerance)?,
        })
    }

    /// Sweep configured from settings; `sites` is the default facility limit.
    pub fn from_settings(settings: &SweepSettings, sites: usize) -> LocateResult<Self> {
        settings.validate()?;
        Self::new(settings.facility_limit(sites), settings.jobs, settings.tolerance)
    }

    pub fn max_facility_count(&self) -> usize {
        self.max_facility_count
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run the sweep. `factory` is called once per facility count, inside the
    /// worker that searches it, so no model or oracle is shared.
    ///
    /// A failing or panicking search only fails its own facility count.
    pub fn run<M, F>(&self, factory: F) -> LocateResult<SweepOutcome>
    where
        M: CoverageModel,
        F: Fn() -> M + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("alpha-sweep-{}", i))
            .build()?;

        log::info!(
            "sweeping facility counts 1..={} on {} worker(s)",
            self.max_facility_count,
            self.jobs
        );

        let search = self.search;
        let results: Vec<LocateResult<f64>> = pool.install(|| {
            // Half-open so rayon sees an indexed range
            (1..self.max_facility_count + 1)
                .into_par_iter()
                .with_max_len(1)
                .map(|count| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        let mut model = factory();
                        search.run(&mut model, count)
                    }))
                    .unwrap_or_else(|panic| {
                        Err(LocateError::OracleFailure(format!(
                            "search panicked: {}",
                            panic_message(panic.as_ref())
                        )))
                    });
                    match &outcome {
                        Ok(alpha) => log::info!("facilities={} max alpha={:.6}", count, alpha),
                        Err(e) => log::error!("facilities={} search failed: {}", count, e),
                    }
                    outcome
                })
                .collect()
        });

        Ok(SweepOutcome { results })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
