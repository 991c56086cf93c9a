//! Command-line driver.
//!
//! Rank 0 reads the starting pattern (an input file or a built-in pattern),
//! shares the run header with the other ranks, writes every gathered
//! snapshot and appends the slowest rank's wall time to the timing file.
//!
//! ```bash
//! # 4 in-process ranks, output every 10 generations to output1
//! game_of_life_bands --input input1 --ranks 4 --output output1
//!
//! # built-in pattern, printed to stdout
//! game_of_life_bands --pattern glider --generations 40 --output-every 10 --output -
//!
//! # real processes (built with --features mpi)
//! mpirun -n 4 game_of_life_bands --input input1 --output output1
//! ```

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use game_of_life_bands::config::{share_run_config, InputFile, RunConfig};
use game_of_life_bands::engine::{Engine, NeverStop, RunSummary};
use game_of_life_bands::pattern::{find_pattern, pattern_names};
use game_of_life_bands::report::{append_timing, NullSink, SnapshotSink, TextSink};
use game_of_life_bands::{Communicator, Grid, LifeError, Result};

/// Game of Life on a torus, split into row bands across ranks
#[derive(Parser, Debug)]
#[command(name = "game_of_life_bands")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file: `N G O` or `R C G O` header, then rows of 0/1
    #[arg(short, long, conflicts_with = "pattern")]
    input: Option<PathBuf>,

    /// Built-in pattern name (used when no input file is given)
    #[arg(short, long, default_value = "glider")]
    pattern: String,

    /// Number of in-process ranks (ignored when running under MPI)
    #[arg(short = 'n', long, default_value_t = 1)]
    ranks: usize,

    /// Generations to run (overrides the input file's G)
    #[arg(short, long)]
    generations: Option<u64>,

    /// Gather and output every this many generations (overrides O)
    #[arg(short = 'e', long)]
    output_every: Option<u64>,

    /// Snapshot output file, `-` for stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File to append the run time to
    #[arg(short, long)]
    timing: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_thread_names(true)
        .with_target(false)
        .init();
}

/// Rank 0's view of the run: configuration plus starting grid.
fn load_start(cli: &Cli) -> Result<(RunConfig, Grid)> {
    let (mut config, grid) = match &cli.input {
        Some(path) => {
            let input = InputFile::read(path)?;
            (input.config, input.grid)
        }
        None => {
            let named = find_pattern(&cli.pattern).ok_or_else(|| {
                LifeError::Pattern(format!(
                    "unknown pattern {:?}, choose one of: {}",
                    cli.pattern,
                    pattern_names().join(", ")
                ))
            })?;
            let grid = named.to_pattern().to_grid()?;
            (RunConfig::new(grid.rows(), grid.cols()).with_generations(100), grid)
        }
    };

    if let Some(generations) = cli.generations {
        config.generations = Some(generations);
    }
    if let Some(output_every) = cli.output_every {
        config.output_every = output_every;
    }
    config.validate()?;
    Ok((config, grid))
}

fn open_sink(cli: &Cli) -> Result<Box<dyn SnapshotSink>> {
    Ok(match &cli.output {
        None => Box::new(NullSink),
        Some(path) if path.as_os_str() == "-" => Box::new(TextSink::new(io::stdout())),
        Some(path) => Box::new(TextSink::new(BufWriter::new(File::create(path)?))),
    })
}

/// Everything one rank does, from reading input to the final timing.
fn run_rank<C: Communicator>(comm: C, cli: &Cli) -> Result<Option<RunSummary>> {
    // Only rank 0 touches the input; the others learn the header from it.
    let start = if comm.is_root() { Some(load_start(cli)) } else { None };
    let root_config = match &start {
        Some(Ok((config, _))) => Some(config),
        _ => None,
    };
    let shared = share_run_config(&comm, root_config);

    let (config, grid) = match (start, shared) {
        (Some(Err(e)), _) => return Err(e),
        (_, Err(e)) => return Err(e),
        (Some(Ok((_, grid))), Ok(config)) => (config, Some(grid)),
        (None, Ok(config)) => (config, None),
    };

    let mut sink: Box<dyn SnapshotSink> = if comm.is_root() {
        open_sink(cli)?
    } else {
        Box::new(NullSink)
    };

    let is_root = comm.is_root();
    let mut engine = Engine::new(comm, config, grid.as_ref())?;
    let summary = engine.run(&mut NeverStop, sink.as_mut())?;

    if !is_root {
        return Ok(None);
    }
    if let (Some(path), Some(seconds)) = (&cli.timing, summary.max_elapsed) {
        append_timing(path, seconds)?;
    }
    Ok(Some(summary))
}

fn report(result: Result<Option<RunSummary>>) -> ExitCode {
    match result {
        Ok(Some(summary)) => {
            info!(
                generations = summary.generations,
                live = summary.final_live.unwrap_or(0),
                seconds = summary.max_elapsed.unwrap_or_default(),
                "finished"
            );
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(not(feature = "mpi"))]
fn main() -> ExitCode {
    use game_of_life_bands::comm::local::run_group;

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let results = match run_group(cli.ranks, |comm| run_rank(comm, &cli)) {
        Ok(results) => results,
        Err(e) => return report(Err(e)),
    };

    // A failing rank takes its peers down with it; report the root cause,
    // which is the first error that is not just a peer hanging up.
    let mut root_summary = None;
    let mut first_error: Option<LifeError> = None;
    for result in results {
        match result {
            Ok(Some(summary)) => root_summary = Some(summary),
            Ok(None) => {}
            Err(e) => {
                let replace = match &first_error {
                    None => true,
                    Some(LifeError::Communication { .. }) => {
                        !matches!(e, LifeError::Communication { .. })
                    }
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => report(Err(e)),
        None => report(Ok(root_summary)),
    }
}

#[cfg(feature = "mpi")]
fn main() -> ExitCode {
    use game_of_life_bands::comm::mpi::MpiComm;

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let Some(universe) = mpi::initialize() else {
        error!("MPI could not be initialised");
        return ExitCode::FAILURE;
    };
    let comm = MpiComm::new(universe.world());

    match run_rank(&comm, &cli) {
        Err(e) => {
            // One rank failing leaves the others blocked; take the whole job down.
            error!(rank = comm.rank(), "{e}");
            comm.abort(i32::from(e.exit_code()))
        }
        ok => report(ok),
    }
}
