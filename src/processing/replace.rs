//! Bulk value replacement.

use std::collections::HashMap;

use crate::config::{MatchMode, Replacement};
use crate::types::Sheet;

use super::map_strings;

/// Apply `mapping` to string cells of the selected columns.
///
/// - [`MatchMode::Exact`]: a cell equal to some `from` becomes its `to`. When the same `from`
///   appears more than once, the last pair wins. Replacements do not chain.
/// - [`MatchMode::Substring`]: every pair is applied in list order as a literal substring
///   replacement, each seeing the output of the previous one. An empty `from` matches between
///   every pair of characters, so `to` is inserted around each one.
pub fn bulk_replace(
    sheet: &mut Sheet,
    columns: &[String],
    mapping: &[Replacement],
    mode: MatchMode,
) -> usize {
    match mode {
        MatchMode::Exact => {
            let table: HashMap<&str, &str> = mapping
                .iter()
                .map(|m| (m.from.as_str(), m.to.as_str()))
                .collect();
            map_strings(sheet, columns, |s| table.get(s).map(|to| to.to_string()))
        }
        MatchMode::Substring => map_strings(sheet, columns, |s| {
            let out = mapping
                .iter()
                .fold(s.to_string(), |acc, m| acc.replace(&m.from, &m.to));
            (out != s).then_some(out)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn products() -> Sheet {
        Sheet::from_columns(
            ["产品", "数量", "备注"],
            vec![
                vec![Value::utf8("苹果"), Value::Int64(1), Value::utf8("VIP 客户")],
                vec![Value::utf8("香蕉"), Value::Int64(2), Value::Null],
                vec![Value::utf8("苹果汁"), Value::Int64(1), Value::utf8("VIP 客户")],
            ],
        )
    }

    fn all() -> Vec<String> {
        vec!["产品".to_string(), "数量".to_string(), "备注".to_string()]
    }

    #[test]
    fn exact_matches_whole_cells_only() {
        let mut sheet = products();
        let mapping = vec![Replacement::new("苹果", "Apple"), Replacement::new("香蕉", "Banana")];
        let changed = bulk_replace(&mut sheet, &all(), &mapping, MatchMode::Exact);
        assert_eq!(changed, 2);
        let col: Vec<_> = sheet.column_values(0).cloned().collect();
        assert_eq!(
            col,
            vec![Value::utf8("Apple"), Value::utf8("Banana"), Value::utf8("苹果汁")]
        );
        assert_eq!(sheet.rows[1][1], Value::Int64(2));
        assert_eq!(sheet.rows[1][2], Value::Null);
    }

    #[test]
    fn exact_does_not_chain_and_last_duplicate_wins() {
        let mut sheet = Sheet::from_columns(["c"], vec![vec![Value::utf8("a")], vec![Value::utf8("b")]]);
        let mapping = vec![
            Replacement::new("a", "b"),
            Replacement::new("b", "c"),
            Replacement::new("a", "z"),
        ];
        bulk_replace(&mut sheet, &["c".to_string()], &mapping, MatchMode::Exact);
        assert_eq!(sheet.rows, vec![vec![Value::utf8("z")], vec![Value::utf8("c")]]);
    }

    #[test]
    fn substring_applies_pairs_sequentially() {
        let mut sheet = Sheet::from_columns(["c"], vec![vec![Value::utf8("cat")], vec![Value::Null]]);
        let mapping = vec![
            Replacement::new("c", "b"),
            Replacement::new("bat", "bird"),
        ];
        bulk_replace(&mut sheet, &["c".to_string()], &mapping, MatchMode::Substring);
        assert_eq!(sheet.rows, vec![vec![Value::utf8("bird")], vec![Value::Null]]);
    }

    #[test]
    fn empty_from_inserts_around_every_character() {
        let mut sheet = Sheet::from_columns(
            ["c"],
            vec![vec![Value::utf8("ab")], vec![Value::utf8("")], vec![Value::Int64(3)]],
        );
        let mapping = vec![Replacement::new("", "-")];
        let changed = bulk_replace(&mut sheet, &["c".to_string()], &mapping, MatchMode::Substring);
        assert_eq!(changed, 2);
        assert_eq!(
            sheet.rows,
            vec![vec![Value::utf8("-a-b-")], vec![Value::utf8("-")], vec![Value::Int64(3)]]
        );
    }
}
