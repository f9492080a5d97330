//! `featsel` binary: one-shot energy-aware feature selection run.
//!
//! # Usage
//!
//! ```bash
//! featsel "UCI HAR Dataset" --strategy greedy
//! featsel SPHERE --strategy pso-multi --config sphere.toml --output front.json
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

use featsel_core::config::dataset::DEFAULT_DATASET;
use featsel_core::config::{ConfigLoader, ConfigSummary, SearchConfig};
use featsel_core::dataset::{ClassDistribution, Dataset};
use featsel_core::energy::{EnergyEstimator, EnergyModel};
use featsel_core::error::SelectionResult;
use featsel_core::evaluation::{BaselineReport, ModelEvaluator};
use featsel_core::selection::{
    write_json_report, GreedySearch, MutualInformationSearch, ObjectiveMode, ParticleSwarmSearch,
    ScoreFunction, StepwiseReport, SwarmReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Greedy,
    MutualInfo,
    PsoSingle,
    PsoMulti,
    /// Every search strategy in turn
    All,
    /// All-features accuracy over several seeds
    Baseline,
    /// Label percentages of each split
    Distribution,
}

/// Command-line arguments for the selection binary.
#[derive(Parser, Debug)]
#[command(
    name = "featsel",
    version,
    about = "Energy-aware feature selection for activity recognition",
    long_about = None
)]
struct Args {
    /// Dataset name, a directory under the configured data root.
    #[arg(default_value = DEFAULT_DATASET)]
    dataset: String,

    /// TOML configuration file; replaces the default discovery list.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Strategy::Greedy)]
    strategy: Strategy,

    /// Write the run report as JSON.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the swarm seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the swarm population size.
    #[arg(long)]
    particles: Option<usize>,

    /// Override the number of swarm iterations.
    #[arg(long)]
    iterations: Option<usize>,

    /// Evaluate swarm populations in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Everything a run produced, written with `--output`
#[derive(Debug, Default, Serialize)]
struct RunReport {
    config: Option<ConfigSummary>,
    raw_energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    greedy: Option<StepwiseReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mutual_information: Option<StepwiseReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pso_single: Option<SwarmReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pso_multi: Option<SwarmReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline: Option<BaselineReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    distribution: Vec<ClassDistribution>,
}

fn main() {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("featsel v{}", featsel_core::VERSION);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(errors) = config.validate_consistency() {
        for e in &errors {
            error!("Configuration error: {e}");
        }
        std::process::exit(1);
    }

    let summary = config.get_summary();
    info!("Configuration validated successfully");
    info!("  dataset      : {}", summary.dataset);
    info!("  grouping     : {:?}", summary.grouping);
    info!("  trees        : {}", summary.num_trees);
    info!("  cross-val    : {}", summary.cross_validation);
    info!("  particles    : {}", summary.num_particles);
    info!("  iterations   : {}", summary.num_iterations);

    let report = match run(&args, &config) {
        Ok(report) => report,
        Err(e) => {
            error!("Run failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = args.output.as_deref() {
        if let Err(e) = write_json_report(&report, path) {
            error!("Failed to write report: {e}");
            std::process::exit(1);
        }
        info!("Report written to {}", path.display());
    }
}

fn load_config(args: &Args) -> Result<SearchConfig, featsel_core::config::ConfigError> {
    let loader = match args.config.as_ref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ConfigLoader::with_paths(vec![path.clone()])
        }
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    // The positional dataset always wins over files and environment
    config.dataset.name = args.dataset.clone();
    if let Some(seed) = args.seed {
        config.pso.seed = seed;
    }
    if let Some(particles) = args.particles {
        config.pso.num_particles = particles;
    }
    if let Some(iterations) = args.iterations {
        config.pso.num_iterations = iterations;
    }
    if args.parallel {
        config.pso.parallel_evaluation = true;
    }
    Ok(config)
}

fn run(args: &Args, config: &SearchConfig) -> SelectionResult<RunReport> {
    let dataset = Dataset::load(&config.dataset)?;
    let mut report = RunReport {
        config: Some(config.get_summary()),
        ..RunReport::default()
    };

    if args.strategy == Strategy::Distribution {
        for distribution in dataset.class_distribution() {
            println!("{}", distribution);
        }
        report.distribution = dataset.class_distribution();
        return Ok(report);
    }

    let energy = EnergyModel::new(&config.energy);
    report.raw_energy = energy.calc_raw().total();
    let evaluator = ModelEvaluator::random_forest(&dataset, &config.evaluation, &config.scoring)?;
    if let Some(subject) = evaluator.held_out_subject() {
        info!(subject, "cross-validation holds out one subject");
    }

    let run_all = args.strategy == Strategy::All;
    let groups = dataset.catalog.groups();
    let scores = || ScoreFunction::new(&evaluator, &energy, groups, config.scoring.clone());

    if args.strategy == Strategy::Baseline {
        let baseline = evaluator.evaluate_baseline(config.evaluation.baseline_trials)?;
        println!("{}", baseline);
        report.baseline = Some(baseline);
        return Ok(report);
    }

    if run_all || args.strategy == Strategy::Greedy {
        let scores = scores();
        let greedy = GreedySearch::new(&scores, &config.greedy).run()?;
        print_stepwise(&greedy);
        report.greedy = Some(greedy);
    }

    if run_all || args.strategy == Strategy::MutualInfo {
        let scores = scores();
        let mi = MutualInformationSearch::new(&scores, &dataset, &config.mutual_information).run()?;
        print_stepwise(&mi);
        report.mutual_information = Some(mi);
    }

    if run_all || args.strategy == Strategy::PsoSingle {
        let scores = scores();
        let swarm = ParticleSwarmSearch::new(&scores, &config.pso).run(ObjectiveMode::Single)?;
        print_swarm(&swarm);
        report.pso_single = Some(swarm);
    }

    if run_all || args.strategy == Strategy::PsoMulti {
        let scores = scores();
        let swarm = ParticleSwarmSearch::new(&scores, &config.pso).run(ObjectiveMode::Multi)?;
        print_swarm(&swarm);
        report.pso_multi = Some(swarm);
    }

    info!(trainings = evaluator.trainings(), "run finished");
    Ok(report)
}

fn print_stepwise(report: &StepwiseReport) {
    println!("{} (raw energy {:.4})", report.strategy, report.raw_energy);
    for step in &report.steps {
        println!("  + {}", step.name);
    }
    if let Some(score) = report.final_score() {
        println!(
            "  validation={:.4} test={:.4} energy={:.4} score={:.4}",
            score.validation, score.test, score.energy, score.score
        );
    }
    println!("  stopped: {}", report.stop);
}

fn print_swarm(report: &SwarmReport) {
    println!(
        "pso {:?}: {} particles, {} iterations, {} distinct subsets, {} cache hits",
        report.mode,
        report.population,
        report.iterations,
        report.distinct_subsets_evaluated,
        report.cache_hits
    );
    if let Some(best) = &report.best {
        println!("  best:{}", best);
    }
    for member in &report.front {
        println!(" {}", member);
    }
}

