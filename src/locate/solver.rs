//! MILP oracle interface
//!
//! Models describe their problem as a [`MipProblem`] and hand it to an
//! [`Oracle`]. The production oracle is HiGHS; the problem is converted into
//! a fresh `highs::RowProblem` on every call, so no solver state survives
//! between calls.

use highs::{Col, HighsModelStatus, RowProblem, Sense};

use crate::error::{LocateError, LocateResult};
use crate::settings::SolverSettings;

/// Tolerance used when checking a returned point against the rows.
pub const FEASIBILITY_TOL: f64 = 1e-6;

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

/// Row relation between a linear expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Minimise,
    Maximise,
}

/// Handle to a variable of a [`MipProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(usize);

impl Var {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    pub objective: f64,
}

impl Column {
    pub fn is_integer(&self) -> bool {
        matches!(self.kind, VarKind::Binary | VarKind::Integer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub terms: Vec<(Var, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Row {
    /// Left-hand side value at `point`.
    fn activity(&self, point: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * point[v.0]).sum()
    }

    pub fn is_satisfied_by(&self, point: &[f64], tol: f64) -> bool {
        let lhs = self.activity(point);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tol,
            Relation::GreaterEq => lhs >= self.rhs - tol,
            Relation::Equal => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// A mixed-integer linear problem under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MipProblem {
    columns: Vec<Column>,
    rows: Vec<Row>,
    direction: Direction,
}

impl MipProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with objective coefficient 0.
    ///
    /// Binary variables always get bounds `[0, 1]`.
    pub fn add_variable(&mut self, kind: VarKind, lower: f64, upper: f64) -> Var {
        let (lower, upper) = match kind {
            VarKind::Binary => (0.0, 1.0),
            _ => (lower, upper),
        };
        self.columns.push(Column {
            kind,
            lower,
            upper,
            objective: 0.0,
        });
        Var(self.columns.len() - 1)
    }

    /// Add `Σ coef·var (relation) rhs`. Zero coefficients are dropped.
    pub fn add_constraint(&mut self, terms: Vec<(Var, f64)>, relation: Relation, rhs: f64) {
        let terms = terms
            .into_iter()
            .filter(|(_, coef)| coef.abs() > 1e-12)
            .collect();
        self.rows.push(Row {
            terms,
            relation,
            rhs,
        });
    }

    /// Replace the objective. Variables not listed get coefficient 0.
    pub fn set_objective(&mut self, terms: Vec<(Var, f64)>, direction: Direction) {
        for col in &mut self.columns {
            col.objective = 0.0;
        }
        for (var, coef) in terms {
            self.columns[var.0].objective += coef;
        }
        self.direction = direction;
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn objective_value(&self, point: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(point)
            .map(|(col, &x)| col.objective * x)
            .sum()
    }

    /// Check bounds, integrality and every row at `point`.
    pub fn is_satisfied_by(&self, point: &[f64], tol: f64) -> bool {
        if point.len() != self.columns.len() {
            return false;
        }
        let columns_ok = self.columns.iter().zip(point).all(|(col, &x)| {
            x >= col.lower - tol
                && x <= col.upper + tol
                && (!col.is_integer() || (x - x.round()).abs() <= tol)
        });
        columns_ok && self.rows.iter().all(|row| row.is_satisfied_by(point, tol))
    }

    /// Same problem with every objective coefficient set to zero.
    pub fn without_objective(&self) -> Self {
        let mut stripped = self.clone();
        for col in &mut stripped.columns {
            col.objective = 0.0;
        }
        stripped
    }
}

/// How far the oracle should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveLimit {
    /// Prove optimality.
    Optimal,
    /// Stop as soon as any feasible point is known.
    FirstSolution,
}

/// Termination status reported by an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleStatus {
    Optimal,
    SolutionLimit,
    Infeasible,
    Unbounded,
    Unknown(String),
}

impl OracleStatus {
    /// Both an optimal and a limit-terminated run carry a feasible point.
    pub fn is_feasible(&self) -> bool {
        matches!(self, OracleStatus::Optimal | OracleStatus::SolutionLimit)
    }
}

/// Result of an oracle call.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: OracleStatus,
    pub objective: f64,
    pub solution: Vec<f64>,
}

impl SolveResult {
    pub fn value(&self, var: Var) -> f64 {
        self.solution[var.0]
    }

    /// Integer-rounded reading of a binary variable.
    pub fn is_set(&self, var: Var) -> bool {
        self.solution[var.0] > 0.5
    }

    fn without_solution(status: OracleStatus, n_vars: usize) -> Self {
        Self {
            status,
            objective: f64::NAN,
            solution: vec![0.0; n_vars],
        }
    }
}

/// The feasibility oracle: answers one problem per call, holding no state
/// between calls.
pub trait Oracle: Send {
    fn optimize(&self, problem: &MipProblem, limit: SolveLimit) -> LocateResult<SolveResult>;
}

/// HiGHS-backed oracle. Every call builds and drops its own HiGHS instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsOracle {
    settings: SolverSettings,
}

impl HighsOracle {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> SolverSettings {
        self.settings
    }
}

impl Oracle for HighsOracle {
    fn optimize(&self, problem: &MipProblem, limit: SolveLimit) -> LocateResult<SolveResult> {
        let threads = i32::try_from(self.settings.threads).map_err(|_| {
            LocateError::InvalidParameter(format!(
                "solver threads must be at most {}, got {}",
                i32::MAX,
                self.settings.threads
            ))
        })?;

        // With a zero objective the first incumbent closes the gap, so HiGHS
        // stops there and reports it as optimal.
        let stripped;
        let problem = match limit {
            SolveLimit::Optimal => problem,
            SolveLimit::FirstSolution => {
                stripped = problem.without_objective();
                &stripped
            }
        };
        let n_vars = problem.num_columns();

        let mut pb = RowProblem::new();
        let cols: Vec<Col> = problem
            .columns()
            .iter()
            .map(|c| pb.add_column_with_integrality(c.objective, c.lower..=c.upper, c.is_integer()))
            .collect();

        for row in problem.rows() {
            let terms: Vec<(Col, f64)> = row.terms.iter().map(|&(v, coef)| (cols[v.0], coef)).collect();
            match row.relation {
                Relation::LessEq => {
                    pb.add_row(..=row.rhs, terms);
                }
                Relation::GreaterEq => {
                    pb.add_row(row.rhs.., terms);
                }
                Relation::Equal => {
                    pb.add_row(row.rhs..=row.rhs, terms);
                }
            }
        }

        let sense = match problem.direction() {
            Direction::Maximise => Sense::Maximise,
            Direction::Minimise => Sense::Minimise,
        };
        let mut model = pb.optimise(sense);
        model.set_option("output_flag", self.settings.verbose);
        model.set_option("threads", threads);

        let solved = model
            .try_solve()
            .map_err(|status| LocateError::OracleFailure(format!("HiGHS run failed: {:?}", status)))?;

        let status = solved.status();
        log::trace!("HiGHS finished with status {:?}", status);

        match status {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {
                let solution = solved.get_solution().columns().to_vec();
                let status = match limit {
                    SolveLimit::Optimal => OracleStatus::Optimal,
                    SolveLimit::FirstSolution => OracleStatus::SolutionLimit,
                };
                Ok(SolveResult {
                    status,
                    objective: solved.objective_value(),
                    solution,
                })
            }
            HighsModelStatus::Infeasible => {
                Ok(SolveResult::without_solution(OracleStatus::Infeasible, n_vars))
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(SolveResult::without_solution(OracleStatus::Unbounded, n_vars))
            }
            HighsModelStatus::LoadError
            | HighsModelStatus::ModelError
            | HighsModelStatus::PresolveError
            | HighsModelStatus::SolveError
            | HighsModelStatus::PostsolveError => Err(LocateError::OracleFailure(format!(
                "HiGHS returned {:?}",
                status
            ))),
            other => {
                // A limit may stop the run with an incumbent already in hand
                let solution = solved.get_solution().columns().to_vec();
                if problem.is_satisfied_by(&solution, FEASIBILITY_TOL) {
                    Ok(SolveResult {
                        objective: problem.objective_value(&solution),
                        status: OracleStatus::SolutionLimit,
                        solution,
                    })
                } else {
                    Ok(SolveResult::without_solution(
                        OracleStatus::Unknown(format!("{:?}", other)),
                        n_vars,
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack() -> (MipProblem, Var, Var) {
        let mut pb = MipProblem::new();
        let a = pb.add_variable(VarKind::Binary, 0.0, 5.0);
        let b = pb.add_variable(VarKind::Integer, 0.0, 3.0);
        pb.add_constraint(vec![(a, 2.0), (b, 1.0)], Relation::LessEq, 4.0);
        pb.set_objective(vec![(a, 3.0), (b, 1.0)], Direction::Maximise);
        (pb, a, b)
    }

    #[test]
    fn test_binary_bounds_are_forced() {
        let (pb, a, b) = knapsack();
        assert_eq!(pb.columns()[a.index()].upper, 1.0);
        assert_eq!(pb.columns()[b.index()].upper, 3.0);
        assert_eq!(pb.direction(), Direction::Maximise);
    }

    #[test]
    fn test_zero_terms_are_dropped() {
        let mut pb = MipProblem::new();
        let a = pb.add_variable(VarKind::Binary, 0.0, 1.0);
        let b = pb.add_variable(VarKind::Binary, 0.0, 1.0);
        pb.add_constraint(vec![(a, 0.0), (b, 1.0)], Relation::GreaterEq, 1.0);
        assert_eq!(pb.rows()[0].terms, vec![(b, 1.0)]);
    }

    #[test]
    fn test_point_checks() {
        let (pb, _, _) = knapsack();
        assert!(pb.is_satisfied_by(&[1.0, 2.0], FEASIBILITY_TOL));
        // Row violated
        assert!(!pb.is_satisfied_by(&[1.0, 3.0], FEASIBILITY_TOL));
        // Fractional integer
        assert!(!pb.is_satisfied_by(&[0.0, 1.5], FEASIBILITY_TOL));
        // Wrong length
        assert!(!pb.is_satisfied_by(&[1.0], FEASIBILITY_TOL));
        assert_eq!(pb.objective_value(&[1.0, 2.0]), 5.0);
    }

    #[test]
    fn test_without_objective_keeps_constraints() {
        let (pb, _, _) = knapsack();
        let stripped = pb.without_objective();
        assert_eq!(stripped.rows(), pb.rows());
        assert!(stripped.columns().iter().all(|c| c.objective == 0.0));
        assert_eq!(stripped.objective_value(&[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_set_objective_replaces_previous() {
        let (mut pb, a, b) = knapsack();
        pb.set_objective(vec![(b, 2.0)], Direction::Minimise);
        assert_eq!(pb.columns()[a.index()].objective, 0.0);
        assert_eq!(pb.columns()[b.index()].objective, 2.0);
        assert_eq!(pb.direction(), Direction::Minimise);
    }

    #[test]
    fn test_status_feasibility() {
        assert!(OracleStatus::Optimal.is_feasible());
        assert!(OracleStatus::SolutionLimit.is_feasible());
        assert!(!OracleStatus::Infeasible.is_feasible());
        assert!(!OracleStatus::Unbounded.is_feasible());
        assert!(!OracleStatus::Unknown("time limit".into()).is_feasible());
    }

    #[test]
    fn test_thread_count_beyond_i32_is_rejected() {
        let (pb, _, _) = knapsack();
        let oracle = HighsOracle::new(SolverSettings {
            threads: u32::MAX,
            verbose: false,
        });
        assert!(matches!(
            oracle.optimize(&pb, SolveLimit::Optimal),
            Err(LocateError::InvalidParameter(_))
        ));
    }
}
