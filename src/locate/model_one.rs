//! Single-Model-One
//!
//! Open exactly `p` sites, assign customers to reachable open sites, and
//! serve at least a fraction `alpha` of the customers. The objective rewards
//! the weight of the opened sites and can also penalize assignment distance.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{LocateError, LocateResult};
use crate::instance::ModelOneInstance;
use crate::locate::solver::{
    Direction, HighsOracle, MipProblem, Oracle, Relation, SolveLimit, Var, VarKind,
};
use crate::locate::{check_build_args, CoverageModel};
use crate::reach::ReachMatrix;

/// Objective used by [`ModelOne::solve`]. Feasibility does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ObjectiveMode {
    /// Maximize `sum_j lambda[j] * y[j]`.
    #[default]
    Coverage,
    /// Also subtract `distance_weight * total assigned distance / D`, where
    /// `D` is the sum of all customer-site distances.
    CoverageAndDistance { distance_weight: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOneSolution {
    pub objective: f64,
    /// Indices of the opened sites.
    pub opened: Vec<usize>,
    /// Indices of the served customers.
    pub served: Vec<usize>,
    /// Sites each customer is assigned to.
    pub assignments: Vec<Vec<usize>>,
    pub total_distance: f64,
}

#[derive(Debug, Clone)]
struct Built {
    problem: MipProblem,
    y: Vec<Var>,
    z: Vec<Var>,
    x: Vec<Vec<Var>>,
}

#[derive(Debug, Clone)]
pub struct ModelOne<O = HighsOracle> {
    instance: Arc<ModelOneInstance>,
    delta: ReachMatrix,
    mode: ObjectiveMode,
    oracle: O,
    built: Option<Built>,
}

impl<O: Oracle> ModelOne<O> {
    pub fn new(instance: Arc<ModelOneInstance>, radius: f64, oracle: O) -> Self {
        let delta = ReachMatrix::compute(instance.distances(), radius);
        Self {
            instance,
            delta,
            mode: ObjectiveMode::default(),
            oracle,
            built: None,
        }
    }

    pub fn with_mode(mut self, mode: ObjectiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ObjectiveMode {
        self.mode
    }

    pub fn delta(&self) -> &ReachMatrix {
        &self.delta
    }

    pub fn problem(&self) -> Option<&MipProblem> {
        self.built.as_ref().map(|b| &b.problem)
    }

    fn built(&self) -> LocateResult<&Built> {
        self.built.as_ref().ok_or(LocateError::NotBuilt)
    }

    fn objective_terms(&self, y: &[Var], x: &[Vec<Var>]) -> Vec<(Var, f64)> {
        let mut terms: Vec<(Var, f64)> = y
            .iter()
            .zip(self.instance.lambda_coeff())
            .map(|(&v, &l)| (v, l))
            .collect();

        if let ObjectiveMode::CoverageAndDistance { distance_weight } = self.mode {
            let distances = self.instance.distances();
            let scale: f64 = distances.iter().sum();
            if scale > 0.0 {
                for (i, row) in x.iter().enumerate() {
                    for (j, &v) in row.iter().enumerate() {
                        terms.push((v, -distance_weight * distances[(i, j)] / scale));
                    }
                }
            }
        }
        terms
    }
}

impl<O: Oracle> CoverageModel for ModelOne<O> {
    type Solution = ModelOneSolution;

    fn build(&mut self, facility_count: usize, alpha: f64) -> LocateResult<()> {
        check_build_args(facility_count, alpha)?;

        let n_customers = self.instance.n_customers();
        let n_sites = self.instance.n_sites();

        let mut pb = MipProblem::new();
        let y: Vec<Var> = (0..n_sites)
            .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
            .collect();
        let z: Vec<Var> = (0..n_customers)
            .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
            .collect();
        let x: Vec<Vec<Var>> = (0..n_customers)
            .map(|_| {
                (0..n_sites)
                    .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
                    .collect()
            })
            .collect();

        // sum_j y[j] = p
        let terms = y.iter().map(|&v| (v, 1.0)).collect();
        pb.add_constraint(terms, Relation::Equal, facility_count as f64);

        // z[i] <= sum_j x[i][j]
        for i in 0..n_customers {
            let mut terms: Vec<(Var, f64)> = x[i].iter().map(|&v| (v, -1.0)).collect();
            terms.push((z[i], 1.0));
            pb.add_constraint(terms, Relation::LessEq, 0.0);
        }

        // sum_i z[i] >= alpha * n
        let terms = z.iter().map(|&v| (v, 1.0)).collect();
        pb.add_constraint(terms, Relation::GreaterEq, alpha * n_customers as f64);

        // x[i][j] <= delta[i][j] * y[j]
        for i in 0..n_customers {
            for j in 0..n_sites {
                let terms = vec![(x[i][j], 1.0), (y[j], -self.delta.coefficient(i, j))];
                pb.add_constraint(terms, Relation::LessEq, 0.0);
            }
        }

        pb.set_objective(self.objective_terms(&y, &x), Direction::Maximise);

        log::trace!(
            "built model-one problem: {} columns, {} rows (count={}, alpha={:.6})",
            pb.num_columns(),
            pb.num_rows(),
            facility_count,
            alpha
        );
        self.built = Some(Built { problem: pb, y, z, x });
        Ok(())
    }

    fn is_feasible(&self) -> LocateResult<bool> {
        let built = self.built()?;
        let result = self.oracle.optimize(&built.problem, SolveLimit::FirstSolution)?;
        Ok(result.status.is_feasible())
    }

    fn solve(&self) -> LocateResult<ModelOneSolution> {
        let built = self.built()?;
        let result = self.oracle.optimize(&built.problem, SolveLimit::Optimal)?;
        if !result.status.is_feasible() {
            return Err(LocateError::NoSolution(result.status));
        }

        let distances = self.instance.distances();
        let assignments: Vec<Vec<usize>> = built
            .x
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, &v)| result.is_set(v))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        let total_distance: f64 = assignments
            .iter()
            .enumerate()
            .flat_map(|(i, sites)| sites.iter().map(move |&j| distances[(i, j)]))
            .sum();

        Ok(ModelOneSolution {
            objective: result.objective,
            opened: indices_set(&built.y, |v| result.is_set(v)),
            served: indices_set(&built.z, |v| result.is_set(v)),
            assignments,
            total_distance,
        })
    }
}

fn indices_set(vars: &[Var], is_set: impl Fn(Var) -> bool) -> Vec<usize> {
    vars.iter()
        .enumerate()
        .filter(|(_, &v)| is_set(v))
        .map(|(i, _)| i)
        .collect()
}
