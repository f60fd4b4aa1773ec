#![cfg(feature = "excel")]

//! Spreadsheet workbooks: read with calamine, written as xlsx with rust_xlsxwriter.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook, Worksheet};
use tempfile::NamedTempFile;

use super::{normalize_headers, parent_dir};
use crate::error::{CleanError, CleanResult};
use crate::types::{Sheet, Value, Workbook};

/// Number format applied to [`Value::DateTime`] cells on write.
pub const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Read every sheet of the workbook at `path`, in workbook order.
///
/// Behavior:
/// - The first non-empty row of each sheet is the header row
/// - Rows above the header are skipped; all rows below it are data rows
/// - A sheet without any non-empty row becomes an empty [`Sheet`]
pub fn read_workbook(path: impl AsRef<Path>) -> CleanResult<Workbook> {
    let mut source = open_workbook_auto(path)?;
    let names: Vec<String> = source.sheet_names().to_vec();

    let mut out = Workbook::new();
    for name in names {
        let range = source.worksheet_range(&name)?;
        out.insert(name, sheet_from_range(&range));
    }
    Ok(out)
}

fn sheet_from_range(range: &Range<Data>) -> Sheet {
    let mut rows = range.rows();
    let Some(header) = rows.by_ref().find(|row| row.iter().any(|c| !matches!(c, Data::Empty))) else {
        return Sheet::default();
    };

    let columns = normalize_headers(header.iter().map(cell_to_header_string).collect());
    let width = columns.len();
    let data: Vec<Vec<Value>> = rows
        .map(|row| {
            let mut out: Vec<Value> = row.iter().map(convert_cell).collect();
            out.resize(width, Value::Null);
            out
        })
        .collect();
    Sheet::new(columns, data)
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        Data::DateTime(_) => match convert_cell(c) {
            Value::DateTime(dt) => Value::DateTime(dt).to_string(),
            _ => c.to_string(),
        },
        _ => c.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
            Some(v) => Value::DateTime(v),
            None => Value::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso(s) {
            Some(v) => Value::DateTime(v),
            None => Value::Utf8(s.clone()),
        },
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(e.to_string()),
    }
}

/// Convert a spreadsheet date serial (days since 1899-12-30, fraction = time of day).
///
/// Serials before 1900-03-01 come out one day late (the 1900 leap-year bug is not corrected).
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Write `workbook` to `path` as xlsx, atomically.
///
/// The workbook is serialized into a temporary file in the destination directory and renamed
/// over `path` only after the whole document has been written.
pub fn write_workbook(workbook: &Workbook, path: impl AsRef<Path>) -> CleanResult<()> {
    let path = path.as_ref();
    let mut xlsx = build_xlsx(workbook)?;

    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    xlsx.save_to_writer(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

fn build_xlsx(workbook: &Workbook) -> CleanResult<XlsxWorkbook> {
    let mut xlsx = XlsxWorkbook::new();
    let date_format = Format::new().set_num_format(DATETIME_NUM_FORMAT);

    if workbook.is_empty() {
        return Err(CleanError::Layout {
            message: "cannot write a workbook without sheets".to_string(),
        });
    }

    for (name, sheet) in workbook.iter() {
        if sheet.row_count() + 1 > MAX_ROWS || sheet.column_count() > MAX_COLS {
            return Err(CleanError::Layout {
                message: format!(
                    "sheet '{name}' has {} rows x {} columns, more than xlsx allows",
                    sheet.row_count(),
                    sheet.column_count()
                ),
            });
        }
        let ws = xlsx.add_worksheet();
        ws.set_name(name)?;
        write_sheet(ws, sheet, &date_format)?;
    }
    Ok(xlsx)
}

fn write_sheet(ws: &mut Worksheet, sheet: &Sheet, date_format: &Format) -> CleanResult<()> {
    // Bounds were checked against MAX_ROWS/MAX_COLS, so the casts below cannot truncate.
    for (c, header) in sheet.columns.iter().enumerate() {
        ws.write_string(0, c as u16, header.as_str())?;
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().take(sheet.column_count()).enumerate() {
            let c = c as u16;
            match value {
                Value::Null => {}
                Value::Int64(i) => {
                    ws.write_number(r, c, *i as f64)?;
                }
                Value::Float64(f) if f.is_finite() => {
                    ws.write_number(r, c, *f)?;
                }
                Value::Float64(f) => {
                    ws.write_string(r, c, f.to_string())?;
                }
                Value::Bool(b) => {
                    ws.write_boolean(r, c, *b)?;
                }
                Value::Utf8(s) => {
                    ws.write_string(r, c, s.as_str())?;
                }
                Value::DateTime(dt) => {
                    let excel = to_excel_datetime(dt)?;
                    ws.write_datetime_with_format(r, c, &excel, date_format)?;
                }
            }
        }
    }
    Ok(())
}

fn to_excel_datetime(dt: &NaiveDateTime) -> CleanResult<ExcelDateTime> {
    let year = u16::try_from(dt.year()).map_err(|_| CleanError::Layout {
        message: format!("date {dt} is outside the range xlsx can store"),
    })?;
    let seconds = f64::from(dt.second()) + f64::from(dt.nanosecond() % 1_000_000_000) / 1e9;
    let excel = ExcelDateTime::from_ymd(year, dt.month() as u8, dt.day() as u8)?
        .and_hms(dt.hour() as u16, dt.minute() as u8, seconds)?;
    Ok(excel)
}
