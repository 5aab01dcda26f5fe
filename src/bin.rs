//! git-vanity - make the current git commit's hash start with a chosen prefix
//!
//! The search either extends the committer's name with a 16-digit hex nonce
//! (the default, reproducible with `git commit --amend`) or, with `--raw`,
//! adds a `vanity` header line to the raw commit object.

mod benchmark;

use anyhow::{Context, Result};
use clap::Parser;
#[cfg(feature = "opencl")]
use git_vanity::OpenClBackend;
use git_vanity::{
    run,
    search::{GLOBAL_SIZE, WORK_SIZE},
    ComputeBackend, CpuBackend, GitCli, Nonce, SearchConfig, SearchSpace, Strategy, Target,
    VanityOptions,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Create vanity commits by extending the committer's name or the commit object
#[derive(Parser, Debug)]
#[command(name = "git-vanity")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The desired hex prefix
    #[arg(value_parser = Target::new, required_unless_present = "benchmark")]
    hex_prefix: Option<Target>,

    /// Start the search from this number (hex)
    #[arg(short, long, default_value = "0")]
    start: Nonce,

    /// Stop the search before this number (hex); searches all 2^64 nonces if omitted
    #[arg(long)]
    stop: Option<Nonce>,

    /// Nonces per batch, i.e. the OpenCL global size (use carefully)
    #[arg(short, long = "global-size", env = "GIT_VANITY_GLOBAL_SIZE", default_value_t = GLOBAL_SIZE)]
    global_size: u32,

    /// OpenCL work size (64, 128, 256, ...)
    #[arg(short, long = "work-size", env = "GIT_VANITY_WORK_SIZE", default_value_t = WORK_SIZE)]
    work_size: u32,

    /// Write the result to the repository
    #[arg(short = 'W', long)]
    write: bool,

    /// Quiet mode, disables progress
    #[arg(short, long)]
    quiet: bool,

    /// Change the raw commit instead of the committer
    #[arg(short, long)]
    raw: bool,

    /// Search on CPU threads even if a GPU is available
    #[arg(long)]
    cpu: bool,

    /// Number of CPU threads (defaults to the number of physical cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Run a fixed search that never succeeds, for performance testing
    #[arg(long, conflicts_with_all = ["write", "raw"])]
    benchmark: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let config = SearchConfig {
        global_size: cli.global_size,
        work_size: cli.work_size,
        quiet: cli.quiet,
        ..SearchConfig::default()
    };
    config.validate()?;

    let backend = select_backend(&cli, &config)?;

    if cli.benchmark {
        return benchmark::run_benchmark(backend.as_ref(), config);
    }

    let target = cli
        .hex_prefix
        .context("a hex prefix is required unless --benchmark is given")?;

    let options = VanityOptions {
        target,
        strategy: if cli.raw {
            Strategy::Raw
        } else {
            Strategy::Committer
        },
        space: SearchSpace {
            start: cli.start.0,
            stop: cli.stop.map(|stop| stop.0),
        },
        search: config,
        write: cli.write,
    };

    match run(&options, &GitCli::new(), backend.as_ref()) {
        Ok(_) => Ok(()),
        Err(error) if error.is_resumable() => Err(anyhow::Error::new(error)
            .context("search space exhausted; rerun with a higher --start to keep searching")),
        Err(error) => Err(error.into()),
    }
}

#[cfg_attr(not(feature = "opencl"), allow(unused_variables))]
fn select_backend(cli: &Cli, config: &SearchConfig) -> Result<Box<dyn ComputeBackend>> {
    #[cfg(feature = "opencl")]
    if !cli.cpu && cli.threads.is_none() && OpenClBackend::gpus_available() {
        return Ok(Box::new(
            OpenClBackend::new(config).context("failed to set up the OpenCL backend")?,
        ));
    }

    Ok(Box::new(match cli.threads {
        Some(threads) => CpuBackend::with_threads(threads),
        None => CpuBackend::new(),
    }))
}
