//! The JSON schema every configuration document must satisfy.
//!
//! Each operation kind is one branch of a `oneOf`; branches reject unknown keys, so a typo in a
//! field name fails validation instead of being silently ignored.

use serde_json::{json, Value};

fn sheets_property() -> Value {
    json!({
        "type": ["array", "null"],
        "items": {"type": ["string", "integer"]}
    })
}

fn columns_property() -> Value {
    json!({
        "type": ["object", "null"],
        "properties": {
            "names": {"type": "array", "items": {"type": "string"}},
            "indices": {"type": "array", "items": {"type": "integer", "minimum": 0}},
            "excel_range": {"type": "string", "pattern": "^[A-Za-z]+:[A-Za-z]+$"}
        },
        "anyOf": [
            {"required": ["names"]},
            {"required": ["indices"]},
            {"required": ["excel_range"]}
        ],
        "additionalProperties": false
    })
}

/// Build one `oneOf` branch: `type` pinned to `kind`, shared `sheets`, optional `columns`.
fn operation_branch(kind: &str, with_columns: bool, extra: Value, required: &[&str]) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert("type".to_string(), json!({"const": kind}));
    properties.insert("sheets".to_string(), sheets_property());
    if with_columns {
        properties.insert("columns".to_string(), columns_property());
    }
    if let Value::Object(extra) = extra {
        properties.extend(extra);
    }

    let mut req = vec!["type"];
    req.extend_from_slice(required);

    json!({
        "properties": properties,
        "required": req,
        "additionalProperties": false
    })
}

/// The configuration schema (JSON Schema draft 7).
pub fn clean_schema() -> Value {
    let operations = vec![
        operation_branch("trim", true, json!({}), &[]),
        operation_branch(
            "remove_chars",
            true,
            json!({
                "characters": {
                    "oneOf": [
                        {"type": "string"},
                        {"type": "array", "items": {"type": "string"}}
                    ]
                }
            }),
            &["characters"],
        ),
        operation_branch(
            "regex_replace",
            true,
            json!({
                "pattern": {"type": "string"},
                "replacement": {"type": "string", "default": ""},
                "flags": {
                    "type": "array",
                    "items": {"enum": ["IGNORECASE", "MULTILINE", "DOTALL", "UNICODE"]},
                    "default": []
                }
            }),
            &["pattern"],
        ),
        operation_branch(
            "case",
            true,
            json!({"mode": {"enum": ["lower", "upper", "title", "capitalize"]}}),
            &["mode"],
        ),
        operation_branch(
            "date_format",
            true,
            json!({
                "output_format": {"type": "string"},
                "input_formats": {
                    "type": ["array", "null"],
                    "items": {"type": ["string", "null"]},
                    "default": null
                },
                "errors": {"enum": ["coerce", "raise", "ignore"], "default": "coerce"}
            }),
            &["output_format"],
        ),
        operation_branch(
            "deduplicate",
            false,
            json!({
                "subset": {
                    "type": ["array", "null"],
                    "items": {"type": ["string", "integer"]},
                    "default": null
                },
                "keep": {"enum": ["first", "last", false], "default": "first"}
            }),
            &[],
        ),
        operation_branch(
            "bulk_replace",
            true,
            json!({
                "mapping": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "from": {"type": "string"},
                            "to": {"type": "string"}
                        },
                        "required": ["from", "to"],
                        "additionalProperties": false
                    }
                },
                "match_mode": {"enum": ["exact", "substring"], "default": "exact"}
            }),
            &["mapping"],
        ),
    ];

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Workbook Batch Cleaning Config",
        "type": "object",
        "properties": {
            "input_path": {"type": "string"},
            "output_path": {"type": "string"},
            "operations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "oneOf": operations
                }
            }
        },
        "required": ["operations"],
        "additionalProperties": false
    })
}
