//! Double Standard Coverage Model
//!
//! The ambulance location model of Gendreau, Laporte and Semet: every demand
//! point must be reachable within the large radius, a fraction `alpha` of the
//! demand must be covered within the small radius, and demand covered twice
//! within the small radius is maximized.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{LocateError, LocateResult};
use crate::instance::{Instance, ModelConfig};
use crate::locate::solver::{
    Direction, HighsOracle, MipProblem, Oracle, Relation, SolveLimit, Var, VarKind,
};
use crate::locate::{check_build_args, CoverageModel};
use crate::reach::ReachMatrix;

/// Optimal double-standard configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoubleStandardSolution {
    /// Demand-weighted double coverage.
    pub objective: f64,
    /// Facility units opened per site.
    pub opened: Vec<u32>,
    pub covered_once: Vec<bool>,
    pub covered_twice: Vec<bool>,
    /// Fraction of total demand covered at least once.
    pub single_coverage: f64,
    /// Fraction of total demand covered twice.
    pub double_coverage: f64,
}

#[derive(Debug, Clone)]
struct Built {
    problem: MipProblem,
    y: Vec<Var>,
    x1: Vec<Var>,
    x2: Vec<Var>,
}

/// Double-standard model over one instance and one pair of radii.
#[derive(Debug, Clone)]
pub struct DoubleStandardModel<O = HighsOracle> {
    instance: Arc<Instance>,
    config: ModelConfig,
    gamma: ReachMatrix,
    delta: ReachMatrix,
    oracle: O,
    built: Option<Built>,
}

impl<O: Oracle> DoubleStandardModel<O> {
    pub fn new(instance: Arc<Instance>, config: ModelConfig, oracle: O) -> Self {
        let gamma = ReachMatrix::compute(instance.distances(), config.radius_small());
        let delta = ReachMatrix::compute(instance.distances(), config.radius_large());
        Self {
            instance,
            config,
            gamma,
            delta,
            oracle,
            built: None,
        }
    }

    pub fn config(&self) -> ModelConfig {
        self.config
    }

    /// Reach within the small radius.
    pub fn gamma(&self) -> &ReachMatrix {
        &self.gamma
    }

    /// Reach within the large radius.
    pub fn delta(&self) -> &ReachMatrix {
        &self.delta
    }

    /// The most recently built problem.
    pub fn problem(&self) -> Option<&MipProblem> {
        self.built.as_ref().map(|b| &b.problem)
    }

    fn built(&self) -> LocateResult<&Built> {
        self.built.as_ref().ok_or(LocateError::NotBuilt)
    }

    fn add_variables(&self, pb: &mut MipProblem) -> (Vec<Var>, Vec<Var>, Vec<Var>) {
        let y = self
            .instance
            .locations()
            .iter()
            .map(|&cap| pb.add_variable(VarKind::Integer, 0.0, cap as f64))
            .collect();
        let n_demand = self.instance.n_demand();
        let x1 = (0..n_demand)
            .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
            .collect();
        let x2 = (0..n_demand)
            .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
            .collect();
        (y, x1, x2)
    }
}

impl<O: Oracle> CoverageModel for DoubleStandardModel<O> {
    type Solution = DoubleStandardSolution;

    fn build(&mut self, facility_count: usize, alpha: f64) -> LocateResult<()> {
        check_build_args(facility_count, alpha)?;

        let mut pb = MipProblem::new();
        // y[j]: units opened at site j, bounded by the site capacity
        let (y, x1, x2) = self.add_variables(&mut pb);
        let demand = self.instance.demand();

        // Every demand point reachable within the large radius
        for i in 0..demand.len() {
            let terms = self.delta.sites_reaching(i).map(|j| (y[j], 1.0)).collect();
            pb.add_constraint(terms, Relation::GreaterEq, 1.0);
        }

        // Demand covered once within the small radius reaches alpha
        let terms = x1.iter().zip(demand).map(|(&v, &d)| (v, d)).collect();
        pb.add_constraint(terms, Relation::GreaterEq, alpha * self.instance.total_demand());

        // sum_j gamma[i][j] * y[j] - x1[i] - x2[i] >= 0
        for i in 0..demand.len() {
            let mut terms: Vec<(Var, f64)> =
                self.gamma.sites_reaching(i).map(|j| (y[j], 1.0)).collect();
            terms.push((x1[i], -1.0));
            terms.push((x2[i], -1.0));
            pb.add_constraint(terms, Relation::GreaterEq, 0.0);
        }

        // x2[i] <= x1[i]
        for i in 0..demand.len() {
            pb.add_constraint(vec![(x2[i], 1.0), (x1[i], -1.0)], Relation::LessEq, 0.0);
        }

        // Exactly facility_count units
        let terms = y.iter().map(|&v| (v, 1.0)).collect();
        pb.add_constraint(terms, Relation::Equal, facility_count as f64);

        let objective = x2.iter().zip(demand).map(|(&v, &d)| (v, d)).collect();
        pb.set_objective(objective, Direction::Maximise);

        log::trace!(
            "built double-standard problem: {} columns, {} rows (count={}, alpha={:.6})",
            pb.num_columns(),
            pb.num_rows(),
            facility_count,
            alpha
        );
        self.built = Some(Built {
            problem: pb,
            y,
            x1,
            x2,
        });
        Ok(())
    }

    fn is_feasible(&self) -> LocateResult<bool> {
        let built = self.built()?;
        let result = self.oracle.optimize(&built.problem, SolveLimit::FirstSolution)?;
        Ok(result.status.is_feasible())
    }

    fn solve(&self) -> LocateResult<DoubleStandardSolution> {
        let built = self.built()?;
        let result = self.oracle.optimize(&built.problem, SolveLimit::Optimal)?;
        if !result.status.is_feasible() {
            return Err(LocateError::NoSolution(result.status));
        }

        let opened = built.y.iter().map(|&v| result.value(v).round() as u32).collect();
        let covered_once: Vec<bool> = built.x1.iter().map(|&v| result.is_set(v)).collect();
        let covered_twice: Vec<bool> = built.x2.iter().map(|&v| result.is_set(v)).collect();

        let demand = self.instance.demand();
        let total = self.instance.total_demand();
        let fraction = |flags: &[bool]| {
            if total > 0.0 {
                flags.iter().zip(demand).filter(|(&f, _)| f).map(|(_, &d)| d).sum::<f64>() / total
            } else {
                0.0
            }
        };

        Ok(DoubleStandardSolution {
            objective: result.objective,
            single_coverage: fraction(&covered_once),
            double_coverage: fraction(&covered_twice),
            opened,
            covered_once,
            covered_twice,
        })
    }
}
