//! Best Coupling Model
//!
//! Assign every customer to exactly one stop, minimizing total distance,
//! with a balance cap on how many customers a stop may take. This model is
//! solved once and is not driven by the alpha search.

use std::sync::Arc;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{LocateError, LocateResult};
use crate::locate::solver::{
    Direction, HighsOracle, MipProblem, Oracle, Relation, SolveLimit, Var, VarKind,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouplingSolution {
    /// Total assignment distance.
    pub objective: f64,
    /// Stop assigned to each customer.
    pub assignment: Vec<usize>,
    /// Customers assigned to each stop.
    pub loads: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Built {
    problem: MipProblem,
    x: Vec<Vec<Var>>,
}

#[derive(Debug, Clone)]
pub struct BestCouplingModel<O = HighsOracle> {
    distances: Arc<DMatrix<f64>>,
    oracle: O,
    built: Option<Built>,
}

/// Per-stop load cap: `ceil(customers / stops) * customers`.
pub fn balance_cap(customers: usize, stops: usize) -> f64 {
    (customers as f64 / stops as f64).ceil() * customers as f64
}

impl<O: Oracle> BestCouplingModel<O> {
    /// `distances` is customers × stops.
    pub fn new(distances: Arc<DMatrix<f64>>, oracle: O) -> Self {
        Self {
            distances,
            oracle,
            built: None,
        }
    }

    pub fn problem(&self) -> Option<&MipProblem> {
        self.built.as_ref().map(|b| &b.problem)
    }

    pub fn build(&mut self) -> LocateResult<()> {
        let (customers, stops) = self.distances.shape();
        if stops == 0 {
            return Err(LocateError::InvalidParameter(
                "coupling needs at least one stop".to_string(),
            ));
        }

        let mut pb = MipProblem::new();
        let x: Vec<Vec<Var>> = (0..customers)
            .map(|_| {
                (0..stops)
                    .map(|_| pb.add_variable(VarKind::Binary, 0.0, 1.0))
                    .collect()
            })
            .collect();

        // Each customer coupled with exactly one stop
        for row in &x {
            let terms = row.iter().map(|&v| (v, 1.0)).collect();
            pb.add_constraint(terms, Relation::Equal, 1.0);
        }

        let cap = balance_cap(customers, stops);
        for j in 0..stops {
            let terms = x.iter().map(|row| (row[j], 1.0)).collect();
            pb.add_constraint(terms, Relation::LessEq, cap);
        }

        let mut objective = Vec::with_capacity(customers * stops);
        for (i, row) in x.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                objective.push((v, self.distances[(i, j)]));
            }
        }
        pb.set_objective(objective, Direction::Minimise);

        self.built = Some(Built { problem: pb, x });
        Ok(())
    }

    pub fn solve(&self) -> LocateResult<CouplingSolution> {
        let built = self.built.as_ref().ok_or(LocateError::NotBuilt)?;
        let result = self.oracle.optimize(&built.problem, SolveLimit::Optimal)?;
        if !result.status.is_feasible() {
            return Err(LocateError::NoSolution(result.status));
        }

        let stops = self.distances.ncols();
        let mut loads = vec![0; stops];
        let assignment: Vec<usize> = built
            .x
            .iter()
            .map(|row| {
                let j = row
                    .iter()
                    .position(|&v| result.is_set(v))
                    .unwrap_or_default();
                loads[j] += 1;
                j
            })
            .collect();

        log::debug!("coupled {} customers, loads {:?}", assignment.len(), loads);
        Ok(CouplingSolution {
            objective: result.objective,
            assignment,
            loads,
        })
    }
}
