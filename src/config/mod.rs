//! Pipeline configuration: the typed form of the JSON configuration document.
//!
//! A configuration is first checked against [`schema::clean_schema`] by
//! [`validate::validate_config`], then deserialized into [`PipelineConfig`]. The operation list
//! is a closed sum type ([`Operation`]), so the executor dispatches with an exhaustive `match`.
//!
//! ```rust
//! use sheet_cleaner::config::{Operation, PipelineConfig};
//!
//! let cfg = PipelineConfig::from_json_str(
//!     r#"{
//!         "input_path": "in.xlsx",
//!         "output_path": "out.xlsx",
//!         "operations": [
//!             {"type": "trim", "columns": {"names": ["Name"]}},
//!             {"type": "deduplicate", "subset": ["Name"]}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(cfg.operations.len(), 2);
//! assert!(matches!(cfg.operations[1], Operation::Deduplicate(_)));
//! ```

pub mod schema;
pub mod validate;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CleanError, CleanResult};

pub use validate::{validate_config, ValidationIssue};

/// A full pipeline run: where to read, where to write, and what to do in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub operations: Vec<Operation>,
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    ///
    /// This does not run schema validation; use [`validate_config`] (or
    /// [`crate::pipeline::apply_operations`], which validates first) for that.
    pub fn from_json_str(s: &str) -> CleanResult<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }

    /// Read and parse a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> CleanResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Deserialize from an already-parsed JSON document.
    ///
    /// Any operation whose `type` is not one of the known kinds is reported as
    /// [`CleanError::UnsupportedOperation`] rather than as a generic decoding error.
    pub fn from_value(value: &serde_json::Value) -> CleanResult<Self> {
        let ops = value
            .get("operations")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for op in ops {
            let op_type = op.get("type");
            let known = op_type
                .and_then(|t| t.as_str())
                .and_then(OperationKind::from_name)
                .is_some();
            if !known {
                let op_type = match op_type {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "<missing>".to_string(),
                };
                return Err(CleanError::UnsupportedOperation { op_type });
            }
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Serialize back into a JSON document (e.g. to validate a config built in code).
    pub fn to_value(&self) -> CleanResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The seven known operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Trim,
    RemoveChars,
    RegexReplace,
    Case,
    DateFormat,
    Deduplicate,
    BulkReplace,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        Self::Trim,
        Self::RemoveChars,
        Self::RegexReplace,
        Self::Case,
        Self::DateFormat,
        Self::Deduplicate,
        Self::BulkReplace,
    ];

    /// The `type` tag used in configuration documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::RemoveChars => "remove_chars",
            Self::RegexReplace => "regex_replace",
            Self::Case => "case",
            Self::DateFormat => "date_format",
            Self::Deduplicate => "deduplicate",
            Self::BulkReplace => "bulk_replace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Trim(TrimOp),
    RemoveChars(RemoveCharsOp),
    RegexReplace(RegexReplaceOp),
    Case(CaseOp),
    DateFormat(DateFormatOp),
    Deduplicate(DeduplicateOp),
    BulkReplace(BulkReplaceOp),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Trim(_) => OperationKind::Trim,
            Self::RemoveChars(_) => OperationKind::RemoveChars,
            Self::RegexReplace(_) => OperationKind::RegexReplace,
            Self::Case(_) => OperationKind::Case,
            Self::DateFormat(_) => OperationKind::DateFormat,
            Self::Deduplicate(_) => OperationKind::Deduplicate,
            Self::BulkReplace(_) => OperationKind::BulkReplace,
        }
    }

    /// Sheet scope; `None` means every sheet.
    pub fn sheets(&self) -> Option<&[SheetRef]> {
        let sheets = match self {
            Self::Trim(op) => &op.sheets,
            Self::RemoveChars(op) => &op.sheets,
            Self::RegexReplace(op) => &op.sheets,
            Self::Case(op) => &op.sheets,
            Self::DateFormat(op) => &op.sheets,
            Self::Deduplicate(op) => &op.sheets,
            Self::BulkReplace(op) => &op.sheets,
        };
        sheets.as_deref()
    }

    /// Column scope; `None` means every column. Always `None` for `deduplicate`.
    pub fn columns(&self) -> Option<&ColumnSelector> {
        match self {
            Self::Trim(op) => op.columns.as_ref(),
            Self::RemoveChars(op) => op.columns.as_ref(),
            Self::RegexReplace(op) => op.columns.as_ref(),
            Self::Case(op) => op.columns.as_ref(),
            Self::DateFormat(op) => op.columns.as_ref(),
            Self::Deduplicate(_) => None,
            Self::BulkReplace(op) => op.columns.as_ref(),
        }
    }
}

/// A sheet (or, in `deduplicate.subset`, a column) referenced by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(i64),
    Name(String),
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<i64> for SheetRef {
    fn from(idx: i64) -> Self {
        Self::Index(idx)
    }
}

/// Column references in `deduplicate.subset` share the sheet reference shape.
pub type ColumnRef = SheetRef;

/// Declarative column selection. At least one key must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<usize>>,
    /// Inclusive spreadsheet-letter range such as `"A:C"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excel_range: Option<String>,
}

impl ColumnSelector {
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: Some(indices.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn excel_range(range: impl Into<String>) -> Self {
        Self {
            excel_range: Some(range.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
}

/// A single string of characters, or a list of strings; every character counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Characters {
    One(String),
    Many(Vec<String>),
}

impl Characters {
    /// All characters to remove, in configuration order (duplicates kept).
    pub fn chars(&self) -> Vec<char> {
        match self {
            Self::One(s) => s.chars().collect(),
            Self::Many(list) => list.iter().flat_map(|s| s.chars()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveCharsOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
    pub characters: Characters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegexFlag {
    Ignorecase,
    Multiline,
    Dotall,
    Unicode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexReplaceOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub flags: Vec<RegexFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Lower,
    Upper,
    Title,
    Capitalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
    pub mode: CaseMode,
}

/// What `date_format` does with values it cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateErrors {
    /// Unparseable cells become empty.
    #[default]
    Coerce,
    /// Abort the whole pipeline.
    Raise,
    /// Unparseable cells keep their original value.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFormatOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
    /// strftime-style output format, e.g. `%Y-%m-%d`.
    pub output_format: String,
    /// Formats tried in order before generic parsing; `null` entries are skipped.
    #[serde(default)]
    pub input_formats: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub errors: DateErrors,
}

/// Which duplicate to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeepRepr", into = "KeepRepr")]
pub enum Keep {
    #[default]
    First,
    Last,
    /// Drop every row that has a duplicate, including the first occurrence (`false`).
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum KeepRepr {
    Name(String),
    Flag(bool),
}

impl TryFrom<KeepRepr> for Keep {
    type Error = String;

    fn try_from(repr: KeepRepr) -> Result<Self, Self::Error> {
        match repr {
            KeepRepr::Name(s) if s == "first" => Ok(Self::First),
            KeepRepr::Name(s) if s == "last" => Ok(Self::Last),
            KeepRepr::Flag(false) => Ok(Self::None),
            KeepRepr::Name(s) => Err(format!("invalid keep value '{s}'")),
            KeepRepr::Flag(true) => Err("keep may be \"first\", \"last\" or false".to_string()),
        }
    }
}

impl From<Keep> for KeepRepr {
    fn from(keep: Keep) -> Self {
        match keep {
            Keep::First => Self::Name("first".to_string()),
            Keep::Last => Self::Name("last".to_string()),
            Keep::None => Self::Flag(false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduplicateOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    /// Row identity columns by name or position; `None` compares whole rows.
    #[serde(default)]
    pub subset: Option<Vec<ColumnRef>>,
    #[serde(default)]
    pub keep: Keep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Replace whole-cell matches only.
    #[default]
    Exact,
    /// Sequential literal substring replacement.
    Substring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkReplaceOp {
    #[serde(default)]
    pub sheets: Option<Vec<SheetRef>>,
    #[serde(default)]
    pub columns: Option<ColumnSelector>,
    pub mapping: Vec<Replacement>,
    #[serde(default)]
    pub match_mode: MatchMode,
}
