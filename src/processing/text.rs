//! Whitespace, character-removal and case operations.

use crate::config::{CaseMode, Characters};
use crate::types::Sheet;

use super::map_strings;

/// Strip leading/trailing whitespace from string cells.
pub fn trim(sheet: &mut Sheet, columns: &[String]) -> usize {
    map_strings(sheet, columns, |s| {
        let t = s.trim();
        (t.len() != s.len()).then(|| t.to_string())
    })
}

/// Remove every occurrence of any of `characters` from string cells.
///
/// An empty character set is a no-op.
pub fn remove_chars(sheet: &mut Sheet, columns: &[String], characters: &Characters) -> usize {
    let set = characters.chars();
    if set.is_empty() {
        return 0;
    }
    map_strings(sheet, columns, |s| {
        s.contains(set.as_slice())
            .then(|| s.chars().filter(|c| !set.contains(c)).collect())
    })
}

/// Normalize the case of string cells.
pub fn change_case(sheet: &mut Sheet, columns: &[String], mode: CaseMode) -> usize {
    map_strings(sheet, columns, |s| {
        Some(match mode {
            CaseMode::Lower => s.to_lowercase(),
            CaseMode::Upper => s.to_uppercase(),
            CaseMode::Title => title_case(s),
            CaseMode::Capitalize => capitalize(s),
        })
    })
}

fn is_cased(c: char) -> bool {
    c.is_lowercase() || c.is_uppercase()
}

/// Uppercase a letter that follows an uncased character, lowercase every other letter.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = is_cased(c);
    }
    out
}

/// Uppercase the first character and lowercase the rest.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
