//! CSV workbooks: a single sheet named after the file stem.

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::{normalize_headers, parent_dir};
use crate::error::{CleanError, CleanResult};
use crate::types::{Sheet, Value, Workbook};

/// Read a CSV file into a one-sheet [`Workbook`].
///
/// The first record is the header row. Empty fields become [`Value::Null`]; every other field
/// is kept verbatim as [`Value::Utf8`]. Short records are padded with nulls.
pub fn read_csv(path: impl AsRef<Path>) -> CleanResult<Workbook> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let sheet = read_csv_sheet(&mut rdr)?;
    Ok(Workbook::new().with_sheet(sheet_name_for(path), sheet))
}

/// Read one sheet from an existing CSV reader configured with `has_headers(false)`.
pub fn read_csv_sheet<R: Read>(rdr: &mut csv::Reader<R>) -> CleanResult<Sheet> {
    let mut records = rdr.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Sheet::default());
    };

    let columns = normalize_headers(header.iter().map(str::to_string).collect());
    let width = columns.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in records {
        let record = result?;
        let mut row: Vec<Value> = record
            .iter()
            .take(width)
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::utf8(field)
                }
            })
            .collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }
    Ok(Sheet::new(columns, rows))
}

/// Write a single-sheet `workbook` to `path` as CSV, atomically.
///
/// Nulls are written as empty fields and date-times as `YYYY-MM-DD HH:MM:SS`.
pub fn write_csv(workbook: &Workbook, path: impl AsRef<Path>) -> CleanResult<()> {
    let path = path.as_ref();
    let sheet = match workbook.len() {
        1 => workbook.iter().next().map(|(_, s)| s),
        _ => None,
    }
    .ok_or_else(|| CleanError::Layout {
        message: format!(
            "csv output holds exactly one sheet, workbook has {}",
            workbook.len()
        ),
    })?;

    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    {
        let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
        write_csv_sheet(&mut wtr, sheet)?;
        wtr.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Write one sheet (header row first) to an existing CSV writer.
pub fn write_csv_sheet<W: Write>(wtr: &mut csv::Writer<W>, sheet: &Sheet) -> CleanResult<()> {
    wtr.write_record(&sheet.columns)?;
    let width = sheet.column_count();
    for row in &sheet.rows {
        let mut fields: Vec<String> = row.iter().take(width).map(|v| v.to_string()).collect();
        fields.resize(width, String::new());
        wtr.write_record(&fields)?;
    }
    Ok(())
}

fn sheet_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Sheet1")
        .to_string()
}
