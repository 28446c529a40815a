use std::sync::Arc;

use apsloc::locate::solver::{Direction, Relation, VarKind};
use apsloc::{
    AlphaLog, BestCouplingModel, CoverageModel, DoubleStandardModel, FacilitySweep, HighsOracle,
    Instance, MipProblem, ModelConfig, ModelOne, ModelOneInstance, ObjectiveMode, Oracle,
    OracleStatus, SolveLimit, SolverSettings,
};
use approx::assert_relative_eq;
use nalgebra::DMatrix;

const SCENARIO: &str = r#"{
    "demand": [1, 2, 3],
    "distances": [[13, 21], [7, 8], [17, 10]],
    "locations": [2, 2]
}"#;

fn oracle() -> HighsOracle {
    HighsOracle::new(SolverSettings {
        threads: 1,
        verbose: false,
    })
}

fn scenario() -> (Arc<Instance>, ModelConfig) {
    (
        Arc::new(Instance::from_json_str(SCENARIO).unwrap()),
        ModelConfig::new(10.0, 20.0).unwrap(),
    )
}

#[test]
fn scenario_sweep_yields_non_decreasing_alphas() {
    let (instance, config) = scenario();
    let oracle = oracle();
    let sweep = FacilitySweep::new(instance.n_sites(), 1, 1e-6).unwrap();
    let outcome = sweep
        .run(|| DoubleStandardModel::new(instance.clone(), config, oracle))
        .unwrap();

    assert!(outcome.is_complete());
    let alphas: Vec<f64> = outcome.alphas().into_iter().map(Option::unwrap).collect();
    assert_eq!(alphas.len(), 2);
    assert!(alphas.iter().all(|a| (0.0..=1.0).contains(a)));
    assert!(alphas[0] <= alphas[1]);
    assert!((alphas[0] - 1.0 / 3.0).abs() < 1e-5);
    assert!((alphas[1] - 5.0 / 6.0).abs() < 1e-5);
}

#[test]
fn parallel_sweep_matches_sequential() {
    let (instance, config) = scenario();
    let oracle = oracle();

    let run = |jobs| {
        FacilitySweep::new(4, jobs, 1e-6)
            .unwrap()
            .run(|| DoubleStandardModel::new(instance.clone(), config, oracle))
            .unwrap()
            .alphas()
    };
    let sequential = run(1);
    let parallel = run(3);
    assert_eq!(sequential.len(), 4);
    for (a, b) in sequential.iter().zip(&parallel) {
        assert_relative_eq!(a.unwrap(), b.unwrap(), epsilon = 1e-5);
    }
}

#[test]
fn capacity_exceeded_is_infeasible_at_every_alpha() {
    let (instance, config) = scenario();
    let mut model = DoubleStandardModel::new(instance, config, oracle());
    for &alpha in &[0.0, 0.25, 1.0] {
        model.build(5, alpha).unwrap();
        assert!(!model.is_feasible().unwrap());
    }
    model.build(4, 0.5).unwrap();
    assert!(model.is_feasible().unwrap());
}

#[test]
fn double_standard_solve_reports_double_coverage() {
    let (instance, config) = scenario();
    let mut model = DoubleStandardModel::new(instance, config, oracle());
    model.build(2, 0.5).unwrap();
    let solution = model.solve().unwrap();

    assert_eq!(solution.opened, vec![1, 1]);
    assert_relative_eq!(solution.objective, 2.0, epsilon = 1e-6);
    for (once, twice) in solution.covered_once.iter().zip(&solution.covered_twice) {
        assert!(!*twice || *once);
    }
}

#[test]
fn oracle_distinguishes_optimal_limit_and_infeasible() {
    let mut pb = MipProblem::new();
    let a = pb.add_variable(VarKind::Integer, 0.0, 4.0);
    let b = pb.add_variable(VarKind::Binary, 0.0, 1.0);
    pb.add_constraint(vec![(a, 1.0), (b, 2.0)], Relation::LessEq, 4.5);
    pb.set_objective(vec![(a, 1.0), (b, 3.0)], Direction::Maximise);

    let optimal = oracle().optimize(&pb, SolveLimit::Optimal).unwrap();
    assert_eq!(optimal.status, OracleStatus::Optimal);
    assert_relative_eq!(optimal.objective, 5.0, epsilon = 1e-6);
    assert_relative_eq!(optimal.value(a), 2.0, epsilon = 1e-6);

    let first = oracle().optimize(&pb, SolveLimit::FirstSolution).unwrap();
    assert_eq!(first.status, OracleStatus::SolutionLimit);
    assert!(pb.is_satisfied_by(&first.solution, 1e-6));

    pb.add_constraint(vec![(a, 1.0)], Relation::GreaterEq, 5.0);
    let infeasible = oracle().optimize(&pb, SolveLimit::FirstSolution).unwrap();
    assert!(!infeasible.status.is_feasible());
}

#[test]
fn model_one_sweep_and_solve() {
    let distances = DMatrix::from_row_slice(3, 2, &[1.0, 9.0, 9.0, 2.0, 3.0, 4.0]);
    let instance = Arc::new(ModelOneInstance::new(vec![5.0, 1.0], distances).unwrap());
    let oracle = oracle();

    let outcome = FacilitySweep::new(2, 2, 1e-6)
        .unwrap()
        .run(|| ModelOne::new(instance.clone(), 5.0, oracle))
        .unwrap();
    let alphas = outcome.alphas();
    assert!((alphas[0].unwrap() - 2.0 / 3.0).abs() < 1e-5);
    assert!((alphas[1].unwrap() - 1.0).abs() < 1e-5);

    let mut model = ModelOne::new(instance, 5.0, oracle)
        .with_mode(ObjectiveMode::CoverageAndDistance { distance_weight: 1.0 });
    model.build(1, 2.0 / 3.0).unwrap();
    let solution = model.solve().unwrap();
    assert_eq!(solution.opened, vec![0]);
    assert_eq!(solution.served, vec![0, 2]);
    assert_relative_eq!(solution.total_distance, 4.0, epsilon = 1e-6);
}

#[test]
fn best_coupling_with_highs() {
    let distances = DMatrix::from_row_slice(4, 2, &[1.0, 6.0, 7.0, 2.0, 3.0, 3.5, 8.0, 1.0]);
    let mut model = BestCouplingModel::new(Arc::new(distances), oracle());
    model.build().unwrap();
    let solution = model.solve().unwrap();

    assert_eq!(solution.assignment, vec![0, 1, 0, 1]);
    assert_eq!(solution.loads, vec![2, 2]);
    assert_relative_eq!(solution.objective, 7.0, epsilon = 1e-6);
}

#[test]
fn sweep_results_round_trip_through_log() {
    let (instance, config) = scenario();
    let oracle = oracle();
    let outcome = FacilitySweep::new(2, 2, 1e-4)
        .unwrap()
        .run(|| DoubleStandardModel::new(instance.clone(), config, oracle))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alphas.json");
    let mut log = AlphaLog::new(&path);
    log.add_entry(config.key(), outcome.alphas());
    log.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<((f64, f64), Vec<Option<f64>>)> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].0, (10.0, 20.0));
    assert_eq!(parsed[0].1, outcome.alphas());
}
