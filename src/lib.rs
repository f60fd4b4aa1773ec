//! `sheet-cleaner` applies a declarative, schema-validated list of cleaning operations to every
//! sheet of a spreadsheet workbook and writes the cleaned workbook.
//!
//! The primary entrypoint is [`apply_operations`], which takes a JSON configuration document:
//!
//! ```json
//! {
//!   "input_path": "input.xlsx",
//!   "output_path": "cleaned.xlsx",
//!   "operations": [
//!     {"type": "trim", "columns": {"names": ["Name"]}},
//!     {"type": "case", "columns": {"names": ["Name"]}, "mode": "lower"},
//!     {"type": "deduplicate", "subset": ["Name"]}
//!   ]
//! }
//! ```
//!
//! ## Operations
//!
//! - `trim`, `remove_chars`, `regex_replace`, `case`, `bulk_replace`: string cells only; nulls
//!   and non-string scalars pass through untouched
//! - `date_format`: parse and re-render date cells (`errors`: `coerce`, `raise` or `ignore`)
//! - `deduplicate`: drop duplicate rows by a subset of columns (`keep`: `first`, `last` or
//!   `false`)
//!
//! Every operation takes an optional `sheets` scope (names or 0-based positions). All but
//! `deduplicate` take an optional `columns` selector (`names`, `indices`, `excel_range` such
//! as `"A:C"`). Selectors that do not match are skipped, never errors.
//!
//! ## Formats
//!
//! - **Workbooks** (requires the Cargo feature `excel`, on by default): read `.xlsx`, `.xlsm`,
//!   `.xlsb`, `.xls`, `.ods`; write `.xlsx`
//! - **CSV**: `.csv`, as a single sheet named after the file stem
//!
//! ## Quick example: in memory
//!
//! ```rust
//! use sheet_cleaner::config::PipelineConfig;
//! use sheet_cleaner::pipeline::transform;
//! use sheet_cleaner::types::{Sheet, Value, Workbook};
//!
//! let mut wb = Workbook::new().with_sheet(
//!     "Sheet1",
//!     Sheet::from_columns(
//!         ["Name"],
//!         vec![
//!             vec![Value::utf8(" Alice ")],
//!             vec![Value::utf8("Bob")],
//!             vec![Value::utf8("alice")],
//!         ],
//!     ),
//! );
//! let cfg = PipelineConfig::from_json_str(r#"{"operations": [
//!     {"type": "trim", "columns": {"names": ["Name"]}},
//!     {"type": "case", "columns": {"names": ["Name"]}, "mode": "lower"},
//!     {"type": "deduplicate", "subset": ["Name"]}
//! ]}"#).unwrap();
//!
//! transform(&mut wb, &cfg.operations, 5).unwrap();
//! let names: Vec<_> = wb.sheet("Sheet1").unwrap().column_values(0).cloned().collect();
//! assert_eq!(names, vec![Value::utf8("alice"), Value::utf8("bob")]);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: typed configuration, JSON schema and validation
//! - [`resolve`]: sheet/column selector resolution
//! - [`processing`]: the operation functions
//! - [`pipeline`]: the executor, observers and metrics
//! - [`storage`]: workbook readers/writers
//! - [`execution`]: concurrent batch runs
//! - [`types`]: the in-memory workbook model
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod execution;
pub mod pipeline;
pub mod processing;
pub mod resolve;
pub mod storage;
pub mod types;

pub use config::validate_config;
pub use error::{CleanError, CleanResult};
pub use pipeline::apply_operations;
