//! Core data model for the cleaning pipeline.
//!
//! A [`Workbook`] is an ordered list of named [`Sheet`]s. Each sheet is a table with uniquely
//! named columns and row-major storage of runtime-typed [`Value`] cells.

use std::fmt;

use chrono::NaiveDateTime;

static NULL: Value = Value::Null;

/// A single cell value.
///
/// Cells are typed at runtime: string-oriented operations only ever touch [`Value::Utf8`],
/// everything else is carried through untouched unless an operation explicitly targets it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Date/time without timezone (spreadsheet date cells).
    DateTime(NaiveDateTime),
}

impl Value {
    /// Convenience constructor for string cells.
    pub fn utf8(s: impl Into<String>) -> Self {
        Self::Utf8(s.into())
    }

    /// `true` for [`Value::Null`], the missing-cell marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string payload for [`Value::Utf8`] cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One named table within a [`Workbook`].
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as [`Sheet::columns`]. Column names
/// are unique within a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    /// Create a sheet from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a sheet from anything string-like for the header, mostly useful in tests.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self::new(columns.into_iter().map(Into::into).collect(), rows)
    }

    /// Number of data rows (the header is not counted).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns, which is also the length of every row.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL))
    }

    /// Keep only rows for which `predicate` returns `true`.
    ///
    /// The predicate also receives the 0-based row index.
    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let mut idx = 0usize;
        self.rows.retain(|row| {
            let keep = predicate(idx, row.as_slice());
            idx += 1;
            keep
        });
    }

    /// Rewrite every cell of column `idx` through `f`, returning how many cells changed.
    ///
    /// `f` returns `None` to leave a cell as-is. Rows shorter than `idx` are padded with
    /// [`Value::Null`] first, so the column set stays rectangular.
    pub fn update_column<F>(&mut self, idx: usize, mut f: F) -> usize
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        let width = self.columns.len();
        let mut changed = 0usize;
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, Value::Null);
            }
            let Some(cell) = row.get_mut(idx) else {
                continue;
            };
            if let Some(next) = f(cell) {
                if *cell != next {
                    *cell = next;
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// The in-memory dataset: an ordered mapping from sheet name to [`Sheet`].
///
/// Sheet order is the source workbook order and is preserved on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<(String, Sheet)>,
}

impl Workbook {
    /// An empty workbook with no sheets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, replacing an existing sheet of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, sheet: Sheet) {
        let name = name.into();
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = sheet,
            None => self.sheets.push((name, sheet)),
        }
    }

    /// Builder-style [`Workbook::insert`].
    pub fn with_sheet(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.insert(name, sheet);
        self
    }

    /// Look up a sheet by exact name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, sheet)` pairs in workbook order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Sheet)> {
        self.sheets.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
