//! Column and sheet selector resolution.
//!
//! Resolution is tolerant: unknown names and out-of-range indices are silently dropped, so one
//! configuration can be reused across workbooks that are similar but not identical. The only
//! hard failure is a spreadsheet column token containing a non-letter character.

use std::collections::HashSet;

use crate::config::{ColumnRef, ColumnSelector, SheetRef};
use crate::error::{CleanError, CleanResult};
use crate::types::{Sheet, Workbook};

/// Decode a spreadsheet column token (`A` -> 0, `Z` -> 25, `AA` -> 26). Case-insensitive;
/// surrounding whitespace is ignored. Tokens too long to fit saturate at the largest index,
/// which any sheet clips away.
pub fn excel_col_to_index(col: &str) -> CleanResult<usize> {
    let token = col.trim().to_ascii_uppercase();
    let invalid = || CleanError::InvalidColumnLetter {
        token: token.clone(),
    };
    if token.is_empty() {
        return Err(invalid());
    }

    let mut n = 0usize;
    for ch in token.chars() {
        if !ch.is_ascii_uppercase() {
            return Err(invalid());
        }
        n = n
            .saturating_mul(26)
            .saturating_add(ch as usize - 'A' as usize + 1);
    }
    Ok(n - 1)
}

/// Parse an inclusive range such as `"A:C"` into 0-based `(start, end)`, swapping a reversed
/// range so that `start <= end`.
pub fn parse_excel_range(range: &str) -> CleanResult<(usize, usize)> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| CleanError::InvalidColumnLetter {
            token: range.to_string(),
        })?;
    let i0 = excel_col_to_index(start)?;
    let i1 = excel_col_to_index(end)?;
    Ok(if i1 < i0 { (i1, i0) } else { (i0, i1) })
}

/// Resolve a column selector against a sheet.
///
/// `None` selects every column in sheet order. Otherwise the union of `names`, then
/// `indices`, then `excel_range` (clipped to the sheet width), de-duplicated by first
/// occurrence.
pub fn resolve_columns(selector: Option<&ColumnSelector>, sheet: &Sheet) -> CleanResult<Vec<String>> {
    let Some(selector) = selector else {
        return Ok(sheet.columns.clone());
    };

    let width = sheet.column_count();
    let mut picked: Vec<usize> = Vec::new();

    if let Some(names) = &selector.names {
        picked.extend(names.iter().filter_map(|n| sheet.index_of(n)));
    }
    if let Some(indices) = &selector.indices {
        picked.extend(indices.iter().copied().filter(|&i| i < width));
    }
    if let Some(range) = &selector.excel_range {
        let (start, end) = parse_excel_range(range)?;
        picked.extend((start..=end).take_while(|&i| i < width));
    }

    Ok(dedup_preserving_order(picked)
        .into_iter()
        .map(|i| sheet.columns[i].clone())
        .collect())
}

/// Resolve a sheet selector against a workbook. `None` selects every sheet in workbook order.
pub fn resolve_sheets(selector: Option<&[SheetRef]>, workbook: &Workbook) -> Vec<String> {
    let names: Vec<&str> = workbook.sheet_names().collect();
    let Some(selector) = selector else {
        return names.into_iter().map(str::to_string).collect();
    };

    let picked = selector.iter().filter_map(|r| match r {
        SheetRef::Index(i) => usize::try_from(*i).ok().and_then(|i| names.get(i).copied()),
        SheetRef::Name(n) => names.iter().copied().find(|s| *s == n.as_str()),
    });
    dedup_preserving_order(picked)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Resolve a `deduplicate.subset` to column indices.
///
/// Returns `None` when the subset is absent *or* nothing in it matched, meaning "compare
/// whole rows".
pub fn resolve_subset(subset: Option<&[ColumnRef]>, sheet: &Sheet) -> Option<Vec<usize>> {
    let subset = subset?;
    let width = sheet.column_count();
    let picked: Vec<usize> = subset
        .iter()
        .filter_map(|r| match r {
            ColumnRef::Index(i) => usize::try_from(*i).ok().filter(|&i| i < width),
            ColumnRef::Name(n) => sheet.index_of(n),
        })
        .collect();
    if picked.is_empty() {
        None
    } else {
        Some(picked)
    }
}

fn dedup_preserving_order<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
