//! Date parsing and reformatting.
//!
//! Parsing tries the configured `input_formats` in order and then falls back to a generic
//! parser that understands the usual spreadsheet spellings (ISO 8601 / RFC 3339, `/`, `-` and
//! `.` separated dates, month-first US dates, CJK `年月日`, long and short month names), each
//! with an optional time component. Formats use chrono's strftime syntax.

use std::fmt::Write as _;

use chrono::format::{Fixed, Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::{DateErrors, DateFormatOp};
use crate::error::{CleanError, CleanResult};
use crate::types::{Sheet, Value};

const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y年%m月%d日 %H:%M",
    "%Y年%m月%d日%H时%M分%S秒",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y年%m月%d日",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%a, %d %b %Y",
];

/// Parse with one explicit format. A date-only format yields midnight.
pub fn parse_with_format(s: &str, format: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Best-effort parsing without a known format.
pub fn parse_generic(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            GENERIC_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse `s` trying `input_formats` in order (a `None` entry means a generic attempt), then
/// generic parsing.
pub fn parse_date(s: &str, input_formats: Option<&[Option<String>]>) -> Option<NaiveDateTime> {
    input_formats
        .unwrap_or_default()
        .iter()
        .find_map(|f| match f {
            Some(f) => parse_with_format(s, f),
            None => parse_generic(s),
        })
        .or_else(|| parse_generic(s))
}

/// Zone directives (`%z`, `%:z`, `%Z`, ...) have nothing to render for a date without a
/// timezone, so they render as empty text.
fn is_zone_item(item: &Item<'_>) -> bool {
    matches!(
        item,
        Item::Fixed(
            Fixed::TimezoneName
                | Fixed::TimezoneOffset
                | Fixed::TimezoneOffsetZ
                | Fixed::TimezoneOffsetColon
                | Fixed::TimezoneOffsetColonZ
                | Fixed::TimezoneOffsetDoubleColon
                | Fixed::TimezoneOffsetTripleColon
        )
    )
}

/// Compile `format` into the items rendered for a naive date-time, or `None` when it cannot
/// render one (malformed directives, or whole-timestamp forms such as `%+` that need an offset).
fn output_items(format: &str) -> Option<Vec<Item<'_>>> {
    let mut items = Vec::new();
    for item in StrftimeItems::new(format) {
        match item {
            Item::Error => return None,
            ref zone if is_zone_item(zone) => {}
            other => items.push(other),
        }
    }
    let sample = NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(0, 0, 0)?;
    render(&sample, &items).ok()?;
    Some(items)
}

/// Returns `true` when `format` can render a date-time without a timezone.
pub fn is_valid_output_format(format: &str) -> bool {
    output_items(format).is_some()
}

fn render(dt: &NaiveDateTime, items: &[Item<'_>]) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.iter()))?;
    Ok(out)
}

enum Cell {
    Keep,
    Set(Value),
    Failed,
}

/// Reformat date cells of the selected columns with `op.output_format`.
///
/// [`Value::Utf8`] cells are parsed; [`Value::DateTime`] cells are rendered directly. Nulls,
/// blank strings and non-date scalars are left alone. Unparseable strings follow `op.errors`;
/// under [`DateErrors::Raise`] nothing is modified and the error carries at most
/// `sample_limit` 0-based row indices.
pub fn date_format(
    sheet: &mut Sheet,
    columns: &[String],
    op: &DateFormatOp,
    sample_limit: usize,
) -> CleanResult<usize> {
    let invalid = || CleanError::InvalidDateFormat {
        format: op.output_format.clone(),
    };
    let items = output_items(&op.output_format).ok_or_else(invalid)?;

    let mut plans: Vec<(usize, Vec<Cell>)> = Vec::with_capacity(columns.len());
    for name in columns {
        let Some(idx) = sheet.index_of(name) else {
            continue;
        };

        let mut planned: Vec<Cell> = Vec::with_capacity(sheet.row_count());
        for value in sheet.column_values(idx) {
            let cell = match value {
                Value::DateTime(dt) => {
                    Cell::Set(Value::Utf8(render(dt, &items).map_err(|_| invalid())?))
                }
                Value::Utf8(s) if s.trim().is_empty() => Cell::Keep,
                Value::Utf8(s) => match parse_date(s, op.input_formats.as_deref()) {
                    Some(dt) => {
                        Cell::Set(Value::Utf8(render(&dt, &items).map_err(|_| invalid())?))
                    }
                    None => Cell::Failed,
                },
                _ => Cell::Keep,
            };
            planned.push(cell);
        }

        if op.errors == DateErrors::Raise {
            let mut failed = planned
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c, Cell::Failed))
                .map(|(i, _)| i)
                .peekable();
            if failed.peek().is_some() {
                return Err(CleanError::DateParse {
                    column: name.clone(),
                    rows: failed.take(sample_limit).collect(),
                });
            }
        }
        plans.push((idx, planned));
    }

    // Nothing is written until every column has been planned.
    let mut changed = 0usize;
    for (idx, planned) in plans {
        let mut planned = planned.into_iter();
        changed += sheet.update_column(idx, |_| match planned.next() {
            Some(Cell::Set(v)) => Some(v),
            Some(Cell::Failed) if op.errors == DateErrors::Coerce => Some(Value::Null),
            _ => None,
        });
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(output: &str, errors: DateErrors) -> DateFormatOp {
        DateFormatOp {
            sheets: None,
            columns: None,
            output_format: output.to_string(),
            input_formats: None,
            errors,
        }
    }

    fn dates() -> Sheet {
        Sheet::from_columns(
            ["日期", "n"],
            vec![
                vec![Value::utf8("2023/01/02"), Value::Int64(1)],
                vec![Value::utf8("2023-03-04"), Value::Int64(2)],
                vec![Value::utf8("2023年05月06日"), Value::Int64(3)],
                vec![Value::Null, Value::Int64(4)],
                vec![Value::utf8("not a date"), Value::Int64(5)],
                vec![
                    Value::DateTime(
                        NaiveDate::from_ymd_opt(2024, 2, 29)
                            .unwrap()
                            .and_hms_opt(13, 5, 0)
                            .unwrap(),
                    ),
                    Value::Int64(6),
                ],
            ],
        )
    }

    fn column(sheet: &Sheet) -> Vec<Value> {
        sheet.column_values(0).cloned().collect()
    }

    #[test]
    fn generic_parsing_covers_common_spellings() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_generic("2023/1/2"), Some(d(2023, 1, 2)));
        assert_eq!(parse_generic("01/02/2023"), Some(d(2023, 1, 2)));
        assert_eq!(parse_generic("2023年05月06日"), Some(d(2023, 5, 6)));
        assert_eq!(parse_generic("March 4, 2023"), Some(d(2023, 3, 4)));
        assert_eq!(
            parse_generic("2023-03-04 10:11:12"),
            NaiveDate::from_ymd_opt(2023, 3, 4).unwrap().and_hms_opt(10, 11, 12)
        );
        assert_eq!(parse_generic("2023-13-40"), None);
        assert_eq!(parse_generic(""), None);
    }

    #[test]
    fn input_formats_are_tried_first() {
        let formats = vec![Some("%d/%m/%Y".to_string()), None];
        let parsed = parse_date("01/02/2023", Some(formats.as_slice())).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        let fallback = parse_date("2023-03-04", Some(formats.as_slice())).unwrap();
        assert_eq!(fallback.date(), NaiveDate::from_ymd_opt(2023, 3, 4).unwrap());
    }

    #[test]
    fn coerce_blanks_unparseable_cells() {
        let mut sheet = dates();
        date_format(&mut sheet, &["日期".to_string()], &op("%Y-%m-%d", DateErrors::Coerce), 5).unwrap();
        assert_eq!(
            column(&sheet),
            vec![
                Value::utf8("2023-01-02"),
                Value::utf8("2023-03-04"),
                Value::utf8("2023-05-06"),
                Value::Null,
                Value::Null,
                Value::utf8("2024-02-29"),
            ]
        );
        assert_eq!(sheet.rows[4][1], Value::Int64(5));
    }

    #[test]
    fn ignore_keeps_original_per_cell() {
        let mut sheet = dates();
        date_format(&mut sheet, &["日期".to_string()], &op("%Y/%m/%d", DateErrors::Ignore), 5).unwrap();
        let col = column(&sheet);
        assert_eq!(col[0], Value::utf8("2023/01/02"));
        assert_eq!(col[2], Value::utf8("2023/05/06"));
        assert_eq!(col[3], Value::Null);
        assert_eq!(col[4], Value::utf8("not a date"));
    }

    #[test]
    fn raise_names_column_and_rows_without_modifying() {
        let mut sheet = dates();
        let before = sheet.clone();
        let err = date_format(&mut sheet, &["日期".to_string()], &op("%Y", DateErrors::Raise), 5).unwrap_err();
        match &err {
            CleanError::DateParse { column, rows } => {
                assert_eq!(column, "日期");
                assert_eq!(rows, &vec![4]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("'日期'"));
        assert_eq!(sheet, before);
    }

    #[test]
    fn raise_reports_at_most_sample_limit_rows() {
        let rows = (0..8).map(|_| vec![Value::utf8("??")]).collect();
        let mut sheet = Sheet::from_columns(["d"], rows);
        let err = date_format(&mut sheet, &["d".to_string()], &op("%Y", DateErrors::Raise), 5).unwrap_err();
        assert!(matches!(err, CleanError::DateParse { ref rows, .. } if rows == &vec![0, 1, 2, 3, 4]));
    }

    #[test]
    fn bad_output_format_is_rejected() {
        assert!(!is_valid_output_format("%Q"));
        assert!(is_valid_output_format("%Y年%m月%d日"));
        let mut sheet = dates();
        let err = date_format(&mut sheet, &["日期".to_string()], &op("%Q", DateErrors::Coerce), 5).unwrap_err();
        assert!(matches!(err, CleanError::InvalidDateFormat { .. }));
    }

    #[test]
    fn zone_directives_render_empty_for_naive_dates() {
        assert!(is_valid_output_format("%Y-%m-%d %z%Z%:z"));
        assert!(!is_valid_output_format("%+"));
        assert!(!is_valid_output_format("%c %+"));

        let mut sheet = Sheet::from_columns(["d"], vec![vec![Value::utf8("2023-01-02")]]);
        date_format(&mut sheet, &["d".to_string()], &op("%Y-%m-%d %z|%Z", DateErrors::Raise), 5).unwrap();
        assert_eq!(column(&sheet), vec![Value::utf8("2023-01-02 |")]);
    }
}
