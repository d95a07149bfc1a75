//! Command-line entry point (spec C8, §6): loads a control file and an
//! input-stand file, builds the event tree once, and drives every stand
//! against it, following the teacher's `#[[bin]]` + `clap::Parser` shape
//! (`src/bin/*.rs`).
mod control;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use control::{ControlStructure, RunMode};
use forest_core::ForestError;
use forest_persistence::MemorySink;
use forest_treatments::{NullGrowth, TreatmentContext, UnboundedTable};

/// Runs the discrete-time forest-management simulation described by a
/// control file against a list of stands.
#[derive(Debug, Parser)]
#[command(name = "forest-cli", version, about)]
struct Cli {
    /// Path to the stand-list input file (JSON array of stands).
    input: PathBuf,

    /// Path to the control structure (spec §6 `app_configuration` +
    /// `simulation_instructions`).
    #[arg(long, default_value = "control.json")]
    control_file: PathBuf,

    /// Run mode(s) to perform, in declaration order; overrides the control
    /// file's `app_configuration.run_modes` when given. May be repeated.
    #[arg(long = "run-mode")]
    run_mode: Vec<RunMode>,

    /// Evaluate stands with a `rayon` thread pool instead of sequentially.
    /// Requires the `parallel` feature.
    #[arg(long)]
    parallel: bool,

    /// Postgres connection string for the persistence sink (spec §4.7).
    /// Falls back to the in-memory sink when omitted. Requires the
    /// `database` feature.
    #[arg(long)]
    database_url: Option<String>,
}

fn main() -> ExitCode {
    #[cfg(feature = "server")]
    forest_core::log();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut control = ControlStructure::load(&cli.control_file)?;
    if !cli.run_mode.is_empty() {
        control.app_configuration.run_modes = cli.run_mode.clone();
    }
    let run_modes = control.app_configuration.run_modes.clone();
    if run_modes.is_empty() {
        log::warn!("no run modes declared; nothing to do");
        return Ok(());
    }

    for mode in &run_modes {
        match mode {
            RunMode::Preprocess | RunMode::ExportPrepro | RunMode::PostProcess | RunMode::Export => {
                log::info!("run mode {mode:?} is an external adapter; skipping");
            }
            RunMode::Simulate => simulate(&cli, &control)?,
        }
    }

    Ok(())
}

fn simulate(cli: &Cli, control: &ControlStructure) -> Result<(), ForestError> {
    let stands = input::load_stands(&cli.input)?;
    log::info!("loaded {} stand(s) from {}", stands.len(), cli.input.display());

    let ctx = TreatmentContext {
        growth: &NullGrowth,
        basal_area_limit: &UnboundedTable,
        stems_after_thinning: &UnboundedTable,
    };
    let driver = forest_driver::Driver::build(&control.simulation_instructions, ctx)?;

    #[cfg(feature = "database")]
    if let Some(url) = &cli.database_url {
        let mut sink = forest_persistence::PostgresSink::connect(url)?;
        let results = driver.run_many(stands, &mut sink);
        log::info!("{} stand(s) processed", results.len());
        return Ok(());
    }
    #[cfg(not(feature = "database"))]
    if cli.database_url.is_some() {
        log::warn!("--database-url requires the `database` feature; using the in-memory sink");
    }

    let mut sink = MemorySink::new();
    #[cfg(feature = "parallel")]
    if cli.parallel {
        let sink = std::sync::Mutex::new(sink);
        let results = driver.run_many_parallel(stands, &sink);
        log::info!("{} stand(s) processed (parallel)", results.len());
        return Ok(());
    }
    #[cfg(not(feature = "parallel"))]
    if cli.parallel {
        log::warn!("--parallel requires the `parallel` feature; running sequentially");
    }

    let results = driver.run_many(stands, &mut sink);
    log::info!("{} stand(s) processed", results.len());
    Ok(())
}
