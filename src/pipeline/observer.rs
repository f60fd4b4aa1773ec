use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{OperationKind, ValidationIssue};

use super::PipelineStage;

/// Events emitted by the executor, in the order they happen during one run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The configuration was received. `input_path` is `None` when it is missing or not a
    /// string, which validation will then reject.
    RunStarted {
        input_path: Option<PathBuf>,
        operations: usize,
    },
    /// Validation failed; no file was read or written.
    Rejected {
        issues: Vec<ValidationIssue>,
    },
    /// The input workbook was read; `sheets` lists its sheets in workbook order.
    Loaded {
        sheets: Vec<String>,
    },
    /// One operation finished across every sheet it selected.
    OperationApplied {
        /// Position of the operation in the configuration's list.
        index: usize,
        kind: OperationKind,
        sheets: Vec<String>,
        cells_changed: usize,
        rows_removed: usize,
    },
    /// The output workbook was renamed into place.
    Written {
        path: PathBuf,
    },
    /// The run succeeded. `metrics` is a snapshot of the executor's counters at that point.
    RunFinished {
        elapsed: Duration,
        metrics: PipelineMetricsSnapshot,
    },
    /// The run aborted with an error during `stage`.
    RunFailed {
        stage: PipelineStage,
        error: String,
    },
}

/// Observer hook for pipeline events.
pub trait PipelineObserver: Send + Sync {
    /// Called synchronously on the thread running the pipeline.
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { input_path, operations } => {
                info!(input = ?input_path, operations, "pipeline run started");
            }
            PipelineEvent::Rejected { issues } => {
                for issue in issues {
                    warn!(path = ?issue.path, "configuration rejected: {}", issue.message);
                }
            }
            PipelineEvent::Loaded { sheets } => info!(?sheets, "workbook loaded"),
            PipelineEvent::OperationApplied {
                index,
                kind,
                sheets,
                cells_changed,
                rows_removed,
            } => info!(
                index,
                kind = %kind,
                ?sheets,
                cells_changed,
                rows_removed,
                "operation applied"
            ),
            PipelineEvent::Written { path } => info!(path = %path.display(), "workbook written"),
            PipelineEvent::RunFinished { elapsed, metrics } => {
                info!(?elapsed, %metrics, "pipeline run finished");
            }
            PipelineEvent::RunFailed { stage, error } => {
                error!(?stage, %error, "pipeline run failed");
            }
        }
    }
}

/// Fans events out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Appends one line per event to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_event(&self, event: &PipelineEvent) {
        let ts = Utc::now().to_rfc3339();
        let line = match event {
            PipelineEvent::RunStarted { input_path, operations } => format!(
                "{ts} start input={} operations={operations}",
                input_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
            ),
            PipelineEvent::Rejected { issues } => format!(
                "{ts} rejected issues={}",
                issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
            ),
            PipelineEvent::Loaded { sheets } => format!("{ts} loaded sheets={sheets:?}"),
            PipelineEvent::OperationApplied {
                index,
                kind,
                sheets,
                cells_changed,
                rows_removed,
            } => format!(
                "{ts} op index={index} kind={kind} sheets={sheets:?} cells_changed={cells_changed} rows_removed={rows_removed}"
            ),
            PipelineEvent::Written { path } => format!("{ts} written path={}", path.display()),
            PipelineEvent::RunFinished { elapsed, metrics } => {
                format!("{ts} finished elapsed={elapsed:?} {metrics}")
            }
            PipelineEvent::RunFailed { stage, error } => {
                format!("{ts} FAILED stage={stage:?} err={error}")
            }
        };
        self.append_line(&line);
    }
}

/// Cumulative counters for every run that shares this instance.
///
/// Runs update these concurrently; callers can snapshot them at any time.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_rejected: AtomicU64,
    runs_failed: AtomicU64,
    operations_applied: AtomicU64,
    cells_changed: AtomicU64,
    rows_removed: AtomicU64,

    active_runs: AtomicUsize,
    max_active_runs: AtomicUsize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new run and raise the high-water mark of concurrent runs if needed.
    pub fn on_run_start(&self) {
        let _ = self.runs_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_runs.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_runs, now);
    }

    /// The `on_run_*` outcome hooks each end a run begun with [`Self::on_run_start`].
    pub fn on_run_completed(&self) {
        let _ = self.runs_completed.fetch_add(1, Ordering::SeqCst);
        self.leave_run();
    }

    pub fn on_run_rejected(&self) {
        let _ = self.runs_rejected.fetch_add(1, Ordering::SeqCst);
        self.leave_run();
    }

    pub fn on_run_failed(&self) {
        let _ = self.runs_failed.fetch_add(1, Ordering::SeqCst);
        self.leave_run();
    }

    /// Record one applied operation and what it did across all selected sheets.
    pub fn on_operation(&self, cells_changed: usize, rows_removed: usize) {
        let _ = self.operations_applied.fetch_add(1, Ordering::SeqCst);
        let _ = self.cells_changed.fetch_add(cells_changed as u64, Ordering::SeqCst);
        let _ = self.rows_removed.fetch_add(rows_removed as u64, Ordering::SeqCst);
    }

    fn leave_run(&self) {
        let _ = self.active_runs.fetch_sub(1, Ordering::SeqCst);
    }

    /// Read every counter. Counters are loaded one at a time, so a snapshot taken while runs
    /// are in flight may mix values from slightly different moments.
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::SeqCst),
            runs_completed: self.runs_completed.load(Ordering::SeqCst),
            runs_rejected: self.runs_rejected.load(Ordering::SeqCst),
            runs_failed: self.runs_failed.load(Ordering::SeqCst),
            operations_applied: self.operations_applied.load(Ordering::SeqCst),
            cells_changed: self.cells_changed.load(Ordering::SeqCst),
            rows_removed: self.rows_removed.load(Ordering::SeqCst),
            max_active_runs: self.max_active_runs.load(Ordering::SeqCst),
        }
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    let _ = dst.fetch_max(now, Ordering::SeqCst);
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineMetricsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_rejected: u64,
    pub runs_failed: u64,
    pub operations_applied: u64,
    pub cells_changed: u64,
    pub rows_removed: u64,
    /// Largest number of runs that were in flight at the same time.
    pub max_active_runs: usize,
}

impl fmt::Display for PipelineMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runs={}/{} (rejected={}, failed={}), operations={}, cells_changed={}, rows_removed={}, max_active_runs={}",
            self.runs_completed,
            self.runs_started,
            self.runs_rejected,
            self.runs_failed,
            self.operations_applied,
            self.cells_changed,
            self.rows_removed,
            self.max_active_runs
        )
    }
}
