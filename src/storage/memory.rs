use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{WorkbookFormat, WorkbookStore};
use crate::error::{CleanError, CleanResult};
use crate::types::Workbook;

/// Thread-safe in-memory [`WorkbookStore`] keyed by path.
///
/// Loading a path that was never stored yields a `NotFound` I/O error, like the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: Mutex<HashMap<PathBuf, Workbook>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `workbook` under `path`, replacing any previous entry.
    pub fn put(&self, path: impl Into<PathBuf>, workbook: Workbook) {
        self.lock().insert(path.into(), workbook);
    }

    /// A copy of the workbook stored under `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Workbook> {
        self.lock().get(path.as_ref()).cloned()
    }

    /// Whether a workbook is stored under `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().contains_key(path.as_ref())
    }

    /// Number of stored workbooks, inputs and outputs alike.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Workbook>> {
        // Poisoning is ignored: every update is a single insert.
        self.books.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WorkbookStore for MemoryStore {
    fn load(&self, path: &Path, _format: Option<WorkbookFormat>) -> CleanResult<Workbook> {
        self.get(path).ok_or_else(|| {
            CleanError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no workbook stored at {}", path.display()),
            ))
        })
    }

    fn save(&self, workbook: &Workbook, path: &Path, _format: Option<WorkbookFormat>) -> CleanResult<()> {
        self.put(path, workbook.clone());
        Ok(())
    }
}
