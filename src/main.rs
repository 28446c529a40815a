//! Command-line driver for the coverage searches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use apsloc::instance::{load_distances, load_radii, load_radius_pairs};
use apsloc::{
    AlphaLog, BestCouplingModel, CoverageModel, DoubleStandardModel, FacilitySweep, HighsOracle,
    Instance, ModelOne, ModelOneInstance, ObjectiveMode, SolverSettings, SweepOutcome,
    SweepSettings,
};

#[derive(Parser, Debug)]
#[command(name = "apsloc", version, about = "Maximal coverage search for facility location models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep the double-standard model over every radius pair in CONFIG
    DoubleStandard {
        #[command(flatten)]
        files: SweepFiles,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// Sweep Single-Model-One over every radius in CONFIG
    ModelOne {
        #[command(flatten)]
        files: SweepFiles,
        #[command(flatten)]
        sweep: SweepArgs,
        /// Weight of the normalized distance penalty (0 disables it)
        #[arg(long, default_value_t = 0.0)]
        distance_weight: f64,
    },
    /// Solve Single-Model-One exactly for one alpha, radius and facility count
    SolveModelOne {
        /// JSON instance file
        instance: PathBuf,
        /// Coverage fraction in [0, 1]
        alpha: f64,
        /// Reach radius
        radius: f64,
        /// Number of sites to open
        aps_count: usize,
        #[command(flatten)]
        solver: SolverArgs,
        #[arg(long, default_value_t = 0.0)]
        distance_weight: f64,
    },
    /// Solve the best customer-stop coupling
    BestCoupling {
        /// JSON file with a `distances` matrix
        distances: PathBuf,
        #[command(flatten)]
        solver: SolverArgs,
    },
}

#[derive(Args, Debug)]
struct SweepFiles {
    /// JSON file containing the instance. Loaded values are validated
    instance: PathBuf,
    /// JSON file containing the radius values
    config: PathBuf,
    /// Output log JSON file. If existing will be overwritten
    log_file: PathBuf,
}

#[derive(Args, Debug)]
struct SolverArgs {
    /// Threads for the backend solver. 0 is automatic
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(..=i32::MAX as i64))]
    threads: u32,
    /// Show the backend solver log
    #[arg(long)]
    verbose_solver: bool,
}

impl SolverArgs {
    fn settings(&self) -> SolverSettings {
        SolverSettings {
            threads: self.threads,
            verbose: self.verbose_solver,
        }
    }
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    solver: SolverArgs,
    /// Number of parallel jobs
    #[arg(long, default_value_t = 1)]
    jobs: usize,
    /// Largest facility count to try. Defaults to the number of sites
    #[arg(long)]
    max_facilities: Option<usize>,
    /// Alpha search tolerance
    #[arg(long, default_value_t = apsloc::settings::DEFAULT_TOLERANCE)]
    tolerance: f64,
}

impl SweepArgs {
    fn settings(&self) -> SweepSettings {
        SweepSettings {
            jobs: self.jobs,
            tolerance: self.tolerance,
            max_facility_count: self.max_facilities,
        }
    }

    fn oracle(&self) -> HighsOracle {
        if self.jobs > 1 && self.solver.threads == 0 {
            log::warn!(
                "{} jobs with automatic solver threads may oversubscribe the CPU; consider --threads 1",
                self.jobs
            );
        }
        HighsOracle::new(self.solver.settings())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::DoubleStandard { files, sweep } => run_double_standard(&files, &sweep),
        Command::ModelOne {
            files,
            sweep,
            distance_weight,
        } => run_model_one(&files, &sweep, objective_mode(distance_weight)),
        Command::SolveModelOne {
            instance,
            alpha,
            radius,
            aps_count,
            solver,
            distance_weight,
        } => {
            let instance = ModelOneInstance::from_json_file(&instance)
                .with_context(|| format!("loading instance {}", instance.display()))?;
            let oracle = HighsOracle::new(solver.settings());
            let mut model = ModelOne::new(Arc::new(instance), radius, oracle)
                .with_mode(objective_mode(distance_weight));
            model.build(aps_count, alpha)?;
            let solution = model.solve()?;
            println!("{}", serde_json::to_string_pretty(&solution)?);
            Ok(())
        }
        Command::BestCoupling { distances, solver } => {
            let matrix = load_distances(&distances)
                .with_context(|| format!("loading distances {}", distances.display()))?;
            let mut model = BestCouplingModel::new(Arc::new(matrix), HighsOracle::new(solver.settings()));
            model.build()?;
            let solution = model.solve()?;
            println!("{}", serde_json::to_string_pretty(&solution)?);
            Ok(())
        }
    }
}

fn objective_mode(distance_weight: f64) -> ObjectiveMode {
    if distance_weight == 0.0 {
        ObjectiveMode::Coverage
    } else {
        ObjectiveMode::CoverageAndDistance { distance_weight }
    }
}

fn run_double_standard(files: &SweepFiles, args: &SweepArgs) -> Result<()> {
    let instance = Instance::from_json_file(&files.instance)
        .with_context(|| format!("loading instance {}", files.instance.display()))?;
    let configs = load_radius_pairs(&files.config)
        .with_context(|| format!("loading config {}", files.config.display()))?;
    let instance = Arc::new(instance);
    let oracle = args.oracle();
    let sweep = FacilitySweep::from_settings(&args.settings(), instance.n_sites())?;

    let mut alpha_log = AlphaLog::new(&files.log_file);
    let mut failed = 0;
    for config in configs {
        log::info!(
            "double-standard radii ({}, {})",
            config.radius_small(),
            config.radius_large()
        );
        let outcome = sweep.run(|| DoubleStandardModel::new(instance.clone(), config, oracle));
        failed += record(&mut alpha_log, config.key(), outcome)?;
    }
    finish(&alpha_log, failed)
}

fn run_model_one(files: &SweepFiles, args: &SweepArgs, mode: ObjectiveMode) -> Result<()> {
    let instance = ModelOneInstance::from_json_file(&files.instance)
        .with_context(|| format!("loading instance {}", files.instance.display()))?;
    let radii = load_radii(&files.config)
        .with_context(|| format!("loading config {}", files.config.display()))?;
    let instance = Arc::new(instance);
    let oracle = args.oracle();
    let sweep = FacilitySweep::from_settings(&args.settings(), instance.n_sites())?;

    let mut alpha_log = AlphaLog::new(&files.log_file);
    let mut failed = 0;
    for radius in radii {
        log::info!("model-one radius {}", radius);
        let outcome = sweep.run(|| ModelOne::new(instance.clone(), radius, oracle).with_mode(mode));
        failed += record(&mut alpha_log, radius, outcome)?;
    }
    finish(&alpha_log, failed)
}

/// Add a sweep to the log and return how many facility counts failed.
///
/// A pool error is logged and saved before it is returned.
fn record<K: serde::Serialize>(
    alpha_log: &mut AlphaLog<K>,
    key: K,
    outcome: apsloc::LocateResult<SweepOutcome>,
) -> Result<usize> {
    match outcome {
        Ok(outcome) => {
            let failed = outcome.failures().count();
            alpha_log.add_entry(key, outcome.alphas());
            Ok(failed)
        }
        Err(e) => {
            alpha_log.save()?;
            Err(e).context("sweep could not start")
        }
    }
}

fn finish<K: serde::Serialize>(alpha_log: &AlphaLog<K>, failed: usize) -> Result<()> {
    alpha_log
        .save()
        .with_context(|| format!("writing log {}", alpha_log.path().display()))?;
    if failed > 0 {
        bail!("{} facility count search(es) failed; see log for details", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_flag_range() {
        let parse = |threads: &str| {
            Cli::try_parse_from(["apsloc", "best-coupling", "d.json", "--threads", threads])
        };
        assert!(parse("4").is_ok());
        assert!(parse("2147483647").is_ok());
        assert!(parse("2147483648").is_err());
    }
}
