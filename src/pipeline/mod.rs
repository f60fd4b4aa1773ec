//! Pipeline execution: validate → load → transform → write.
//!
//! Most callers should use [`apply_operations`], which runs one configuration document against
//! the filesystem. [`PipelineExecutor`] is the configurable form: pick a [`WorkbookStore`],
//! force formats, attach a [`PipelineObserver`], or share [`PipelineMetrics`] between runs.
//!
//! A run moves through [`PipelineStage`]s:
//!
//! ```text
//! Idle -> Validating -> Rejected
//!                    \-> Loading -> Transforming -> Writing -> Completed
//! ```
//!
//! Validation failures are *results* ([`PipelineResult::Rejected`]) and perform no I/O. Every
//! other failure is returned as an `Err` and nothing is written.
//!
//! # Examples
//!
//! ```no_run
//! use serde_json::json;
//!
//! # fn main() -> Result<(), sheet_cleaner::CleanError> {
//! let result = sheet_cleaner::apply_operations(&json!({
//!     "input_path": "input.xlsx",
//!     "output_path": "cleaned.xlsx",
//!     "operations": [
//!         {"type": "trim"},
//!         {"type": "deduplicate", "subset": ["Name"]}
//!     ]
//! }))?;
//! println!("{}", result.to_json());
//! # Ok(())
//! # }
//! ```

pub mod observer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{
    validate_config, ColumnSelector, Operation, OperationKind, PipelineConfig, ValidationIssue,
};
use crate::error::{CleanError, CleanResult};
use crate::processing::pattern::build_regex;
use crate::processing::{
    bulk_replace, change_case, date_format, deduplicate, regex_replace, remove_chars, trim,
};
use crate::resolve::{resolve_columns, resolve_sheets, resolve_subset};
use crate::storage::{FileStore, WorkbookFormat, WorkbookStore};
use crate::types::{Sheet, Workbook};

pub use observer::{
    CompositeObserver, FileObserver, LogObserver, PipelineEvent, PipelineMetrics,
    PipelineMetricsSnapshot, PipelineObserver,
};

/// Default number of offending row indices carried by a `date_format` raise error.
pub const DEFAULT_DATE_ERROR_SAMPLES: usize = 5;

/// Where a run is (or stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Validating,
    Rejected,
    Loading,
    Transforming,
    Writing,
    Completed,
}

/// Outcome of a run that did not fail fatally.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    /// Every sheet was written to `output_path`.
    Completed { output_path: PathBuf },
    /// The configuration failed validation; nothing was read or written.
    Rejected { errors: Vec<ValidationIssue> },
}

impl PipelineResult {
    /// `false` when validation rejected the configuration.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The wire form: `{"ok": true, "output_path": ..}` or `{"ok": false, "errors": [..]}`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Completed { output_path } => json!({
                "ok": true,
                "output_path": output_path.to_string_lossy(),
            }),
            Self::Rejected { errors } => json!({
                "ok": false,
                "errors": errors,
            }),
        }
    }
}

/// What one operation did to the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub kind: OperationKind,
    /// Sheets the operation was applied to, in resolution order.
    pub sheets: Vec<String>,
    pub cells_changed: usize,
    pub rows_removed: usize,
}

impl OperationReport {
    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            sheets: Vec::new(),
            cells_changed: 0,
            rows_removed: 0,
        }
    }
}

/// Options controlling a [`PipelineExecutor`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// If `None`, infer the input format from the file extension.
    pub input_format: Option<WorkbookFormat>,
    /// If `None`, infer the output format from the file extension.
    pub output_format: Option<WorkbookFormat>,
    /// Optional observer for run events.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Maximum row indices reported by a `date_format` raise error.
    pub date_error_samples: usize,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("input_format", &self.input_format)
            .field("output_format", &self.output_format)
            .field("observer_set", &self.observer.is_some())
            .field("date_error_samples", &self.date_error_samples)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_format: None,
            output_format: None,
            observer: None,
            date_error_samples: DEFAULT_DATE_ERROR_SAMPLES,
        }
    }
}

/// Runs pipeline configurations against a [`WorkbookStore`].
///
/// An executor holds no per-run state, so one instance may serve concurrent runs as long as
/// they write to different output paths.
pub struct PipelineExecutor {
    store: Arc<dyn WorkbookStore>,
    options: PipelineOptions,
    metrics: Arc<PipelineMetrics>,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("options", &self.options)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(Arc::new(FileStore::new()), PipelineOptions::default())
    }
}

impl PipelineExecutor {
    /// Create an executor that reads and writes workbooks through `store`, with its own
    /// fresh metrics.
    pub fn new(store: Arc<dyn WorkbookStore>, options: PipelineOptions) -> Self {
        Self {
            store,
            options,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share `metrics` with other executors instead of keeping private counters.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Options applied to every run.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Counters for every run this executor has made.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Validate and execute a configuration document.
    pub fn run(&self, config: &Value) -> CleanResult<PipelineResult> {
        let started = Instant::now();
        let input_path = config
            .get("input_path")
            .and_then(Value::as_str)
            .map(PathBuf::from);
        let operations = config
            .get("operations")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        self.metrics.on_run_start();
        self.emit(PipelineEvent::RunStarted {
            input_path,
            operations,
        });

        debug!(stage = ?PipelineStage::Validating, "validating configuration");
        let issues = validate_config(config);
        if !issues.is_empty() {
            warn!(issues = issues.len(), "configuration rejected");
            self.metrics.on_run_rejected();
            self.emit(PipelineEvent::Rejected {
                issues: issues.clone(),
            });
            return Ok(PipelineResult::Rejected { errors: issues });
        }

        let mut stage = PipelineStage::Validating;
        let outcome = PipelineConfig::from_value(config)
            .and_then(|typed| self.execute(&typed, &mut stage));

        match outcome {
            Ok(output_path) => {
                self.metrics.on_run_completed();
                let elapsed = started.elapsed();
                info!(output = %output_path.display(), ?elapsed, "pipeline completed");
                self.emit(PipelineEvent::RunFinished {
                    elapsed,
                    metrics: self.metrics.snapshot(),
                });
                Ok(PipelineResult::Completed { output_path })
            }
            Err(e) => {
                self.metrics.on_run_failed();
                warn!(?stage, error = %e, "pipeline failed");
                self.emit(PipelineEvent::RunFailed {
                    stage,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Execute an already-typed configuration. It is validated first, like [`Self::run`].
    pub fn run_config(&self, config: &PipelineConfig) -> CleanResult<PipelineResult> {
        self.run(&config.to_value()?)
    }

    fn execute(&self, config: &PipelineConfig, stage: &mut PipelineStage) -> CleanResult<PathBuf> {
        *stage = PipelineStage::Loading;
        let input = required_path(config.input_path.as_deref(), "input_path")?;
        debug!(stage = ?stage, input = %input.display(), "loading workbook");
        let mut workbook = self.store.load(input, self.options.input_format)?;
        self.emit(PipelineEvent::Loaded {
            sheets: workbook.sheet_names().map(str::to_string).collect(),
        });

        *stage = PipelineStage::Transforming;
        for (index, op) in config.operations.iter().enumerate() {
            let report = apply_operation(&mut workbook, op, self.options.date_error_samples)?;
            debug!(
                index,
                kind = %report.kind,
                sheets = report.sheets.len(),
                cells_changed = report.cells_changed,
                rows_removed = report.rows_removed,
                "operation applied"
            );
            self.metrics.on_operation(report.cells_changed, report.rows_removed);
            self.emit(PipelineEvent::OperationApplied {
                index,
                kind: report.kind,
                sheets: report.sheets,
                cells_changed: report.cells_changed,
                rows_removed: report.rows_removed,
            });
        }

        *stage = PipelineStage::Writing;
        let output = required_path(config.output_path.as_deref(), "output_path")?;
        debug!(stage = ?stage, output = %output.display(), "writing workbook");
        self.store.save(&workbook, output, self.options.output_format)?;
        self.emit(PipelineEvent::Written {
            path: output.to_path_buf(),
        });

        *stage = PipelineStage::Completed;
        Ok(output.to_path_buf())
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_event(&event);
        }
    }
}

fn required_path<'a>(path: Option<&'a Path>, field: &'static str) -> CleanResult<&'a Path> {
    path.filter(|p| !p.as_os_str().is_empty())
        .ok_or(CleanError::MissingPath { field })
}

/// Validate `config` and, if it passes, run it against the filesystem.
///
/// Returns `Ok(PipelineResult::Rejected { .. })` for configuration problems and `Err` for
/// everything else (missing paths, I/O, `date_format` raise failures, ...).
pub fn apply_operations(config: &Value) -> CleanResult<PipelineResult> {
    PipelineExecutor::default().run(config)
}

/// Apply every operation in order to an in-memory workbook.
pub fn transform(
    workbook: &mut Workbook,
    operations: &[Operation],
    date_error_samples: usize,
) -> CleanResult<Vec<OperationReport>> {
    operations
        .iter()
        .map(|op| apply_operation(workbook, op, date_error_samples))
        .collect()
}

/// Apply one operation to every sheet it resolves to.
///
/// Sheets and columns that do not resolve are skipped silently.
pub fn apply_operation(
    workbook: &mut Workbook,
    op: &Operation,
    date_error_samples: usize,
) -> CleanResult<OperationReport> {
    let targets = resolve_sheets(op.sheets(), workbook);
    let mut report = OperationReport::new(op.kind());
    let selector = op.columns();

    match op {
        Operation::Trim(_) => for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
            Ok(trim(sheet, cols))
        })?,
        Operation::RemoveChars(o) => {
            for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
                Ok(remove_chars(sheet, cols, &o.characters))
            })?
        }
        Operation::RegexReplace(o) => {
            let re = build_regex(&o.pattern, &o.flags)?;
            for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
                regex_replace(sheet, cols, &re, &o.replacement)
            })?
        }
        Operation::Case(o) => for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
            Ok(change_case(sheet, cols, o.mode))
        })?,
        Operation::DateFormat(o) => {
            for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
                date_format(sheet, cols, o, date_error_samples)
            })?
        }
        Operation::Deduplicate(o) => {
            for name in &targets {
                let Some(sheet) = workbook.sheet_mut(name) else {
                    continue;
                };
                let subset = resolve_subset(o.subset.as_deref(), sheet);
                report.rows_removed += deduplicate(sheet, subset.as_deref(), o.keep);
                report.sheets.push(name.clone());
            }
        }
        Operation::BulkReplace(o) => {
            for_each_scoped_sheet(workbook, &targets, selector, &mut report, |sheet, cols| {
                Ok(bulk_replace(sheet, cols, &o.mapping, o.match_mode))
            })?
        }
    }
    Ok(report)
}

fn for_each_scoped_sheet<F>(
    workbook: &mut Workbook,
    targets: &[String],
    selector: Option<&ColumnSelector>,
    report: &mut OperationReport,
    mut f: F,
) -> CleanResult<()>
where
    F: FnMut(&mut Sheet, &[String]) -> CleanResult<usize>,
{
    for name in targets {
        let Some(sheet) = workbook.sheet_mut(name) else {
            continue;
        };
        let columns = resolve_columns(selector, sheet)?;
        report.cells_changed += f(sheet, &columns)?;
        report.sheets.push(name.clone());
    }
    Ok(())
}
