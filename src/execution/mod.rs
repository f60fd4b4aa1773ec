//! Batch execution: many independent pipeline runs on a rayon thread pool.
//!
//! Each configuration in a batch is a separate run with its own in-memory workbook; runs share
//! nothing but the [`PipelineExecutor`] (store, options, metrics). The only coordination is an
//! up-front check that no two runs write the same output path, plus an in-flight limit on how
//! many workbooks are held in memory at once.

mod semaphore;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{CleanError, CleanResult};
use crate::pipeline::{PipelineExecutor, PipelineMetrics, PipelineResult};

use semaphore::Semaphore;

/// Configuration for the [`BatchRunner`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on runs executing at the same time.
    ///
    /// This is an additional throttle on top of `num_threads`.
    pub max_in_flight: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight: n,
        }
    }
}

/// Runs batches of pipeline configurations concurrently.
pub struct BatchRunner {
    pool: ThreadPool,
    opts: BatchOptions,
    executor: Arc<PipelineExecutor>,
}

impl BatchRunner {
    /// Create a runner backed by the filesystem ([`PipelineExecutor::default`]).
    pub fn new(opts: BatchOptions) -> CleanResult<Self> {
        Self::with_executor(PipelineExecutor::default(), opts)
    }

    /// Create a runner that executes every run through `executor`.
    pub fn with_executor(executor: PipelineExecutor, opts: BatchOptions) -> CleanResult<Self> {
        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);
        let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;
        Ok(Self {
            pool,
            opts,
            executor: Arc::new(executor),
        })
    }

    /// Options the runner's pool was built with.
    pub fn options(&self) -> &BatchOptions {
        &self.opts
    }

    /// Metrics accumulated over every run of every batch.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        self.executor.metrics()
    }

    /// Run every configuration; results come back in input order.
    ///
    /// The outer `Err` is [`CleanError::DuplicateOutput`] when two configurations name the same
    /// `output_path`; in that case nothing runs. Otherwise each run succeeds or fails on its own.
    pub fn run(&self, configs: &[Value]) -> CleanResult<Vec<CleanResult<PipelineResult>>> {
        check_unique_outputs(configs)?;

        let started = Instant::now();
        info!(runs = configs.len(), threads = self.pool.current_num_threads(), "batch started");

        let sem = Semaphore::new(self.opts.max_in_flight);
        let results: Vec<CleanResult<PipelineResult>> = self.pool.install(|| {
            configs
                .par_iter()
                .map(|config| {
                    let permit = sem.acquire();
                    if !permit.waited.is_zero() {
                        debug!(waited = ?permit.waited, "run throttled");
                    }
                    self.executor.run(config)
                })
                .collect()
        });

        let ok = results.iter().filter(|r| matches!(r, Ok(p) if p.is_ok())).count();
        info!(
            runs = results.len(),
            ok,
            elapsed = ?started.elapsed(),
            metrics = %self.metrics().snapshot(),
            "batch finished"
        );
        Ok(results)
    }

    /// Typed form of [`Self::run`].
    pub fn run_configs(&self, configs: &[PipelineConfig]) -> CleanResult<Vec<CleanResult<PipelineResult>>> {
        let values = configs
            .iter()
            .map(PipelineConfig::to_value)
            .collect::<CleanResult<Vec<_>>>()?;
        self.run(&values)
    }
}

fn check_unique_outputs(configs: &[Value]) -> CleanResult<()> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for path in configs
        .iter()
        .filter_map(|c| c.get("output_path").and_then(Value::as_str))
        .filter(|p| !p.is_empty())
    {
        let path = normalize(Path::new(path));
        if !seen.insert(path.clone()) {
            return Err(CleanError::DuplicateOutput { path });
        }
    }
    Ok(())
}

/// Lexical normalization (drops `.` components) so `out/a.xlsx` and `./out/a.xlsx` collide.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// Clone `template` once per file matching the glob `pattern`.
///
/// Each clone reads the matched file and writes a file of the same name under `output_dir`.
/// Directories are skipped; matches come back in glob (alphabetical) order.
pub fn expand_glob(
    template: &PipelineConfig,
    pattern: &str,
    output_dir: impl AsRef<Path>,
) -> CleanResult<Vec<Value>> {
    let output_dir = output_dir.as_ref();
    let mut out = Vec::new();
    for entry in glob::glob(pattern)? {
        let input = entry.map_err(|e| CleanError::Io(e.into()))?;
        if !input.is_file() {
            continue;
        }
        let Some(name) = input.file_name() else {
            continue;
        };
        let mut config = template.clone();
        config.output_path = Some(output_dir.join(name));
        config.input_path = Some(input);
        out.push(config.to_value()?);
    }
    debug!(pattern, matched = out.len(), "expanded batch glob");
    Ok(out)
}
