//! Configuration validation.
//!
//! [`validate_config`] reports the *first* failure only: one structural failure from the JSON
//! schema, or, when the structure is sound, the first `regex_replace` pattern or replacement
//! template that does not compile, or `date_format` output format that cannot be rendered for a
//! date without a timezone. An empty list means the configuration may be executed.

use std::fmt;
use std::sync::LazyLock;

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::clean_schema;
use super::{Operation, PipelineConfig};
use crate::processing::dates::is_valid_output_format;
use crate::processing::pattern::{build_regex, compile_replacement};

static SCHEMA_DOC: LazyLock<Value> = LazyLock::new(clean_schema);

static COMPILED: LazyLock<JSONSchema> = LazyLock::new(|| {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&SCHEMA_DOC)
        .expect("built-in configuration schema must compile")
});

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    /// Keys/indices from the document root to the offending node.
    pub path: Vec<String>,
}

impl ValidationIssue {
    pub fn new(message: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path.join("/"), self.message)
        }
    }
}

/// Validate a configuration document. Returns an empty list on success.
pub fn validate_config(config: &Value) -> Vec<ValidationIssue> {
    if let Err(mut errors) = COMPILED.validate(config) {
        if let Some(err) = errors.next() {
            let path = err.instance_path.clone().into_vec();
            return vec![ValidationIssue::new(err.to_string(), path)];
        }
    }

    // The schema guarantees the shape; this only fails if schema and types drift apart.
    let typed = match PipelineConfig::from_value(config) {
        Ok(cfg) => cfg,
        Err(e) => return vec![ValidationIssue::new(e.to_string(), Vec::new())],
    };

    semantic_issue(&typed).into_iter().collect()
}

fn semantic_issue(config: &PipelineConfig) -> Option<ValidationIssue> {
    config
        .operations
        .iter()
        .enumerate()
        .find_map(|(i, op)| {
            let at = |field: &str| vec!["operations".to_string(), i.to_string(), field.to_string()];
            match op {
                Operation::RegexReplace(rr) => match build_regex(&rr.pattern, &rr.flags) {
                    Err(e) => Some(ValidationIssue::new(e.to_string(), at("pattern"))),
                    Ok(re) => compile_replacement(&rr.replacement, &re)
                        .err()
                        .map(|e| ValidationIssue::new(e.to_string(), at("replacement"))),
                },
                Operation::DateFormat(df) if !is_valid_output_format(&df.output_format) => {
                    Some(ValidationIssue::new(
                        format!("invalid date output format '{}'", df.output_format),
                        at("output_format"),
                    ))
                }
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::validate_config;

    #[test]
    fn accepts_a_complete_config() {
        let issues = validate_config(&json!({
            "input_path": "in.xlsx",
            "output_path": "out.xlsx",
            "operations": [
                {"type": "trim", "sheets": ["Sheet1", 0], "columns": {"names": ["A"], "excel_range": "a:c"}},
                {"type": "remove_chars", "characters": "()-"},
                {"type": "regex_replace", "pattern": "[0-9]+", "replacement": "#", "flags": ["IGNORECASE"]},
                {"type": "case", "columns": null, "mode": "capitalize"},
                {"type": "date_format", "output_format": "%Y-%m-%d", "input_formats": ["%Y/%m/%d", null], "errors": "ignore"},
                {"type": "deduplicate", "subset": ["A", 1], "keep": "last"},
                {"type": "bulk_replace", "mapping": [{"from": "a", "to": "b"}], "match_mode": "substring"}
            ]
        }));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let issues = validate_config(&json!({"operations": [{"type": "remove_chars"}]}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["operations", "0"]);
    }

    #[test]
    fn unknown_field_is_rejected_with_one_issue() {
        let issues = validate_config(&json!({"operations": [{"type": "trim", "bogus": 1}]}));
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].message.is_empty());
    }

    #[test]
    fn operations_are_required() {
        let issues = validate_config(&json!({"input_path": "x.xlsx"}));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.is_empty());
    }

    #[test]
    fn columns_selector_needs_a_key_and_a_valid_range() {
        assert_eq!(
            validate_config(&json!({"operations": [{"type": "trim", "columns": {}}]})).len(),
            1
        );
        assert_eq!(
            validate_config(&json!({"operations": [{"type": "trim", "columns": {"excel_range": "A1:C"}}]}))
                .len(),
            1
        );
        assert_eq!(
            validate_config(&json!({"operations": [{"type": "trim", "columns": {"indices": [-1]}}]}))
                .len(),
            1
        );
    }

    #[test]
    fn bulk_replace_mapping_must_not_be_empty() {
        let issues = validate_config(&json!({"operations": [{"type": "bulk_replace", "mapping": []}]}));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn uncompilable_pattern_points_at_the_pattern() {
        let issues = validate_config(&json!({
            "operations": [
                {"type": "trim"},
                {"type": "regex_replace", "pattern": "(unclosed"}
            ]
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["operations", "1", "pattern"]);
    }

    #[test]
    fn unrenderable_date_format_points_at_output_format() {
        let issues = validate_config(&json!({
            "operations": [{"type": "date_format", "output_format": "%Y-%Q"}]
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["operations", "0", "output_format"]);
    }

    #[test]
    fn bad_replacement_template_points_at_the_replacement() {
        let issues = validate_config(&json!({
            "operations": [{"type": "regex_replace", "pattern": "(a)", "replacement": r"\2"}]
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["operations", "0", "replacement"]);
        assert!(issues[0].message.contains("invalid group reference 2"));

        let ok = validate_config(&json!({
            "operations": [{"type": "regex_replace", "pattern": "(a)(b)", "replacement": r"$5.00 \2\1"}]
        }));
        assert!(ok.is_empty(), "{ok:?}");
    }

    #[test]
    fn timezone_directives_are_accepted_but_offset_bound_formats_are_not() {
        let tz = validate_config(&json!({
            "operations": [{"type": "date_format", "output_format": "%Y-%m-%d %z%Z"}]
        }));
        assert!(tz.is_empty(), "{tz:?}");

        let rfc = validate_config(&json!({
            "operations": [{"type": "date_format", "output_format": "%+"}]
        }));
        assert_eq!(rfc.len(), 1);
        assert_eq!(rfc[0].path, vec!["operations", "0", "output_format"]);
    }
}
