//! Exhaustive enumeration oracle for tiny pure-integer problems.
//!
//! Walks every integer point inside the column bounds. Only usable on test
//! sized problems, but it needs no solver and can list every feasible point.

use crate::error::{LocateError, LocateResult};
use crate::locate::solver::{Direction, MipProblem, Oracle, OracleStatus, SolveLimit, SolveResult};

const MAX_POINTS: u128 = 5_000_000;

/// Integer points are exact, so rows only need to absorb rounding in `alpha * total`.
const POINT_TOL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveOracle;

impl ExhaustiveOracle {
    /// Every feasible point of `problem`, in enumeration order.
    pub fn feasible_points(problem: &MipProblem) -> LocateResult<Vec<Vec<f64>>> {
        let mut points = Vec::new();
        for_each_point(problem, |point| {
            if problem.is_satisfied_by(point, POINT_TOL) {
                points.push(point.to_vec());
            }
            true
        })?;
        Ok(points)
    }
}

impl Oracle for ExhaustiveOracle {
    fn optimize(&self, problem: &MipProblem, limit: SolveLimit) -> LocateResult<SolveResult> {
        let maximise = problem.direction() == Direction::Maximise;
        let mut best: Option<(f64, Vec<f64>)> = None;

        for_each_point(problem, |point| {
            if !problem.is_satisfied_by(point, POINT_TOL) {
                return true;
            }
            let obj = problem.objective_value(point);
            let better = match &best {
                None => true,
                Some((b, _)) => (maximise && obj > *b) || (!maximise && obj < *b),
            };
            if better {
                best = Some((obj, point.to_vec()));
            }
            limit == SolveLimit::Optimal
        })?;

        Ok(match best {
            Some((objective, solution)) => SolveResult {
                status: match limit {
                    SolveLimit::Optimal => OracleStatus::Optimal,
                    SolveLimit::FirstSolution => OracleStatus::SolutionLimit,
                },
                objective,
                solution,
            },
            None => SolveResult {
                status: OracleStatus::Infeasible,
                objective: f64::NAN,
                solution: vec![0.0; problem.num_columns()],
            },
        })
    }
}

/// Visit every integer point within bounds until `visit` returns false.
fn for_each_point<F>(problem: &MipProblem, mut visit: F) -> LocateResult<()>
where
    F: FnMut(&[f64]) -> bool,
{
    let mut lower = Vec::with_capacity(problem.num_columns());
    let mut upper = Vec::with_capacity(problem.num_columns());
    let mut total: u128 = 1;
    for col in problem.columns() {
        if !col.is_integer() || !col.lower.is_finite() || !col.upper.is_finite() {
            return Err(LocateError::OracleFailure(
                "enumeration needs bounded integer columns".to_string(),
            ));
        }
        let lo = col.lower.ceil() as i64;
        let hi = col.upper.floor() as i64;
        if hi < lo {
            return Ok(());
        }
        total = total.saturating_mul((hi - lo + 1) as u128);
        lower.push(lo);
        upper.push(hi);
    }
    if total > MAX_POINTS {
        return Err(LocateError::OracleFailure(format!(
            "{} points is too many to enumerate",
            total
        )));
    }

    let mut current = lower.clone();
    let mut point: Vec<f64> = current.iter().map(|&v| v as f64).collect();
    loop {
        if !visit(&point) {
            return Ok(());
        }
        // Odometer increment
        let mut k = 0;
        loop {
            if k == current.len() {
                return Ok(());
            }
            if current[k] < upper[k] {
                current[k] += 1;
                point[k] = current[k] as f64;
                break;
            }
            current[k] = lower[k];
            point[k] = lower[k] as f64;
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::solver::{Relation, VarKind};

    #[test]
    fn test_enumerates_small_problem() {
        let mut pb = MipProblem::new();
        let a = pb.add_variable(VarKind::Integer, 0.0, 2.0);
        let b = pb.add_variable(VarKind::Binary, 0.0, 1.0);
        pb.add_constraint(vec![(a, 1.0), (b, 1.0)], Relation::Equal, 2.0);
        pb.set_objective(vec![(a, 1.0)], Direction::Minimise);

        let points = ExhaustiveOracle::feasible_points(&pb).unwrap();
        assert_eq!(points, vec![vec![2.0, 0.0], vec![1.0, 1.0]]);

        let best = ExhaustiveOracle.optimize(&pb, SolveLimit::Optimal).unwrap();
        assert_eq!(best.status, OracleStatus::Optimal);
        assert_eq!(best.value(a), 1.0);

        let first = ExhaustiveOracle.optimize(&pb, SolveLimit::FirstSolution).unwrap();
        assert_eq!(first.status, OracleStatus::SolutionLimit);
        assert_eq!(first.solution, vec![2.0, 0.0]);
    }

    #[test]
    fn test_reports_infeasible() {
        let mut pb = MipProblem::new();
        let a = pb.add_variable(VarKind::Binary, 0.0, 1.0);
        pb.add_constraint(vec![(a, 1.0)], Relation::GreaterEq, 2.0);
        let result = ExhaustiveOracle.optimize(&pb, SolveLimit::Optimal).unwrap();
        assert_eq!(result.status, OracleStatus::Infeasible);
    }

    #[test]
    fn test_rejects_continuous_columns() {
        let mut pb = MipProblem::new();
        pb.add_variable(VarKind::Continuous, 0.0, 1.0);
        assert!(ExhaustiveOracle.optimize(&pb, SolveLimit::Optimal).is_err());
    }
}
