//! In-place sheet transformations: one function per operation kind.
//!
//! Every function receives the whole [`Sheet`] plus a pre-resolved list of column names (except
//! [`deduplicate()`], which takes resolved row-identity column indices) and mutates the sheet in
//! place. Column names missing from the sheet are skipped. The return value is the number of
//! changed cells, or removed rows for `deduplicate`, which the executor reports to observers.
//!
//! String operations only touch [`Value::Utf8`] cells. [`Value::Null`] and non-string scalars
//! pass through unchanged even when their column is selected.
//!
//! ```rust
//! use sheet_cleaner::config::{CaseMode, Keep};
//! use sheet_cleaner::processing::{change_case, deduplicate, trim};
//! use sheet_cleaner::types::{Sheet, Value};
//!
//! let mut sheet = Sheet::from_columns(
//!     ["Name"],
//!     vec![
//!         vec![Value::utf8(" Alice ")],
//!         vec![Value::utf8("Bob")],
//!         vec![Value::utf8("alice")],
//!         vec![Value::Null],
//!     ],
//! );
//! let cols = vec!["Name".to_string()];
//!
//! trim(&mut sheet, &cols);
//! change_case(&mut sheet, &cols, CaseMode::Lower);
//! let removed = deduplicate(&mut sheet, Some(&[0][..]), Keep::First);
//!
//! assert_eq!(removed, 1);
//! assert_eq!(sheet.rows, vec![
//!     vec![Value::utf8("alice")],
//!     vec![Value::utf8("bob")],
//!     vec![Value::Null],
//! ]);
//! ```

pub mod dates;
pub mod dedup;
pub mod pattern;
pub mod replace;
pub mod text;

pub use dates::date_format;
pub use dedup::deduplicate;
pub use pattern::regex_replace;
pub use replace::bulk_replace;
pub use text::{change_case, remove_chars, trim};

use crate::types::{Sheet, Value};

/// Apply `f` to every string cell of the named columns. `f` returns `None` to keep a cell.
pub(crate) fn map_strings<F>(sheet: &mut Sheet, columns: &[String], mut f: F) -> usize
where
    F: FnMut(&str) -> Option<String>,
{
    let mut changed = 0usize;
    for name in columns {
        let Some(idx) = sheet.index_of(name) else {
            continue;
        };
        changed += sheet.update_column(idx, |v| match v {
            Value::Utf8(s) => f(s).map(Value::Utf8),
            _ => None,
        });
    }
    changed
}
