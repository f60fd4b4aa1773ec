//! Workbook storage: the reader/writer the pipeline loads from and saves to.
//!
//! The executor only talks to the [`WorkbookStore`] trait. Two implementations ship with the
//! crate:
//!
//! - [`FileStore`]: the filesystem. The format is inferred from the file extension (or forced by
//!   the caller). Spreadsheet workbooks require the Cargo feature `excel`; CSV is always on.
//! - [`MemoryStore`]: an in-process path → [`Workbook`] map, for embedding and tests.
//!
//! Every write through [`FileStore`] goes to a temporary file next to the destination that is
//! renamed into place once complete, so a failed run never leaves a partial output.

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod memory;

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{CleanError, CleanResult};
use crate::types::Workbook;

pub use memory::MemoryStore;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkbookFormat {
    /// Spreadsheet workbooks (feature-gated behind `excel`). Read: xlsx/xlsm/xlsb/xls/ods.
    /// Write: xlsx.
    Excel,
    /// Comma-separated values, one sheet per file.
    Csv,
}

impl WorkbookFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Excel),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Infer the format of `path` from its extension.
    pub fn from_path(path: &Path) -> CleanResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CleanError::UnsupportedFormat {
                message: format!("cannot infer format: path has no extension ({})", path.display()),
            })?;
        Self::from_extension(ext).ok_or_else(|| CleanError::UnsupportedFormat {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

/// Where workbooks are read from and written to.
///
/// `format` overrides extension inference; stores without a notion of format ignore it.
pub trait WorkbookStore: Send + Sync {
    /// Load every sheet of the workbook at `path`, in workbook order.
    fn load(&self, path: &Path, format: Option<WorkbookFormat>) -> CleanResult<Workbook>;

    /// Persist `workbook` at `path`. Either the whole workbook is written or nothing is.
    fn save(&self, workbook: &Workbook, path: &Path, format: Option<WorkbookFormat>) -> CleanResult<()>;
}

/// Filesystem-backed [`WorkbookStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl WorkbookStore for FileStore {
    fn load(&self, path: &Path, format: Option<WorkbookFormat>) -> CleanResult<Workbook> {
        let fmt = match format {
            Some(f) => f,
            None => WorkbookFormat::from_path(path)?,
        };
        debug!(path = %path.display(), format = ?fmt, "reading workbook");
        match fmt {
            WorkbookFormat::Csv => csv::read_csv(path),
            WorkbookFormat::Excel => read_excel_dispatch(path),
        }
    }

    fn save(&self, workbook: &Workbook, path: &Path, format: Option<WorkbookFormat>) -> CleanResult<()> {
        let fmt = match format {
            Some(f) => f,
            None => WorkbookFormat::from_path(path)?,
        };
        debug!(path = %path.display(), format = ?fmt, sheets = workbook.len(), "writing workbook");
        match fmt {
            WorkbookFormat::Csv => csv::write_csv(workbook, path),
            WorkbookFormat::Excel => write_excel_dispatch(workbook, path),
        }
    }
}

fn read_excel_dispatch(path: &Path) -> CleanResult<Workbook> {
    #[cfg(feature = "excel")]
    {
        excel::read_workbook(path)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = path;
        Err(CleanError::UnsupportedFormat {
            message: "excel support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

fn write_excel_dispatch(workbook: &Workbook, path: &Path) -> CleanResult<()> {
    #[cfg(feature = "excel")]
    {
        excel::write_workbook(workbook, path)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (workbook, path);
        Err(CleanError::UnsupportedFormat {
            message: "excel support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

/// Turn raw header cells into unique column names: blank cells become `Unnamed: <i>`, repeats
/// get `.1`, `.2`, ... suffixes.
pub(crate) fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, cell) in raw.into_iter().enumerate() {
        let base = if cell.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            cell
        };
        let mut name = base.clone();
        while counts.contains_key(&name) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{base}.{n}");
        }
        counts.insert(name.clone(), 0);
        out.push(name);
    }
    out
}

/// Directory a temporary file for `path` must live in so the final rename stays on one
/// filesystem.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
