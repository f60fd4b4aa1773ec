//! Duplicate row removal.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::config::Keep;
use crate::types::{Sheet, Value};

/// Hashable identity of one cell. Integral floats compare equal to integers and all nulls are
/// equal to each other.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(&'a str),
    DateTime(NaiveDateTime),
}

impl<'a> From<&'a Value> for CellKey<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Int64(i) => Self::Int(*i),
            Value::Float64(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Self::Int(*f as i64)
                } else if f.is_nan() {
                    Self::Float(f64::NAN.to_bits())
                } else {
                    Self::Float(f.to_bits())
                }
            }
            Value::Bool(b) => Self::Bool(*b),
            Value::Utf8(s) => Self::Str(s.as_str()),
            Value::DateTime(dt) => Self::DateTime(*dt),
        }
    }
}

fn row_key<'a>(row: &'a [Value], width: usize, subset: Option<&[usize]>) -> Vec<CellKey<'a>> {
    let cell = |i: usize| row.get(i).map(CellKey::from).unwrap_or(CellKey::Null);
    match subset {
        Some(cols) => cols.iter().map(|&i| cell(i)).collect(),
        None => (0..width).map(cell).collect(),
    }
}

/// Drop duplicate rows, comparing the `subset` column indices (`None` compares whole rows).
///
/// Returns the number of removed rows. Surviving rows keep their relative order.
pub fn deduplicate(sheet: &mut Sheet, subset: Option<&[usize]>, keep: Keep) -> usize {
    let before = sheet.row_count();
    let width = sheet.column_count();

    let survivors: HashSet<usize> = {
        let keys: Vec<Vec<CellKey<'_>>> = sheet
            .rows
            .iter()
            .map(|row| row_key(row, width, subset))
            .collect();

        match keep {
            Keep::First => {
                let mut seen = HashSet::new();
                keys.iter()
                    .enumerate()
                    .filter(|(_, k)| seen.insert(*k))
                    .map(|(i, _)| i)
                    .collect()
            }
            Keep::Last => {
                let mut seen = HashSet::new();
                keys.iter()
                    .enumerate()
                    .rev()
                    .filter(|(_, k)| seen.insert(*k))
                    .map(|(i, _)| i)
                    .collect()
            }
            Keep::None => {
                let mut counts: HashMap<&Vec<CellKey<'_>>, usize> = HashMap::new();
                for k in &keys {
                    *counts.entry(k).or_default() += 1;
                }
                keys.iter()
                    .enumerate()
                    .filter(|(_, k)| counts.get(k).copied() == Some(1))
                    .map(|(i, _)| i)
                    .collect()
            }
        }
    };

    sheet.retain_rows(|idx, _| survivors.contains(&idx));
    before - sheet.row_count()
}
