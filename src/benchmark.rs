use anyhow::{ensure, Result};
use git_vanity::{
    commit::rewrite_raw, ComputeBackend, SearchConfig, SearchDriver, SearchJob, SearchOutcome,
    SearchSpace, Target,
};
use std::time::Instant;
use tracing::info;

const BENCHMARK_COMMIT: &[u8] = b"\
    tree 6f4e79123e206448f80ec73b9a53e07eb0784fef\n\
    author Foo Bar <foo@example.com> 1611912738 -0500\n\
    committer Foo Bar <foo@example.com> 1611912738 -0500\n\
    \n\
    Test commit for benchmarking performance changes\n";

pub fn run_benchmark(backend: &dyn ComputeBackend, config: SearchConfig) -> Result<()> {
    // Runs a benchmark for performance testing. This does a constant hash search that is
    // practically guaranteed to fail, so every run hashes the same number of candidates.
    // Caveats:
    // * The benchmark doesn't spawn any git commands or interact with the filesystem.
    //
    // To use: run `time target/release/git-vanity --benchmark`.
    let prepared = rewrite_raw(BENCHMARK_COMMIT)?;
    let job = SearchJob::new(
        prepared.preprocess(),
        prepared.placeholder_offset(),
        Target::new("000000000000000000000000000000000000000")?,
    )?;

    let workload = (1u64 << 28) / config.global_size.max(1) as u64 * config.global_size as u64;
    let started = Instant::now();
    let outcome = SearchDriver::new(backend, SearchConfig { quiet: true, ..config })?
        .search(&job, SearchSpace::new(0, workload))?;
    let elapsed = started.elapsed();

    ensure!(
        outcome == SearchOutcome::Exhausted { completed: workload },
        "benchmark search unexpectedly ended with {:?}",
        outcome
    );

    info!(
        "Hashed {} candidates in {:.3?} ({:.4} MH/s)",
        workload,
        elapsed,
        workload as f64 / elapsed.as_secs_f64() / 1e6
    );

    Ok(())
}
