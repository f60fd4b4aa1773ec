#![cfg(feature = "excel")]

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{ExcelDateTime, Format};
use serde_json::json;
use sheet_cleaner::storage::{FileStore, WorkbookStore};
use sheet_cleaner::types::{Value, Workbook};
use sheet_cleaner::{apply_operations, CleanError};

fn write_fixture(dir: &Path) -> PathBuf {
    use rust_xlsxwriter::Workbook;

    let path = dir.join("input.xlsx");
    let mut wb = Workbook::new();

    let ws = wb.add_worksheet();
    ws.set_name("Sheet1").unwrap();
    for (c, h) in ["姓名", "地址", "Code", "日期"].iter().enumerate() {
        ws.write_string(0, c as u16, *h).unwrap();
    }
    let rows: [[Option<&str>; 4]; 3] = [
        [Some(" 张三 "), Some(" 北京-海淀 "), Some("AbC123"), Some("2023/01/02")],
        [Some("李四"), None, Some("xyz789"), Some("2023-03-04")],
        [Some("张三"), Some("上海(浦东)"), Some("AbC123"), Some("2023年05月06日")],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(s) = cell {
                ws.write_string(r as u32 + 1, c as u16, *s).unwrap();
            }
        }
    }

    let ws = wb.add_worksheet();
    ws.set_name("明细").unwrap();
    ws.write_string(0, 0, "产品").unwrap();
    ws.write_string(0, 1, "数量").unwrap();
    ws.write_string(0, 2, "备注").unwrap();
    for (r, (product, qty, note)) in [("苹果", 1, "VIP 客户"), ("香蕉", 2, "普通-客户"), ("苹果", 1, "VIP 客户")]
        .iter()
        .enumerate()
    {
        let r = r as u32 + 1;
        ws.write_string(r, 0, *product).unwrap();
        ws.write_number(r, 1, *qty).unwrap();
        ws.write_string(r, 2, *note).unwrap();
    }

    wb.save(&path).unwrap();
    path
}

fn load(path: &Path) -> Workbook {
    FileStore::new().load(path, None).unwrap()
}

fn column(wb: &Workbook, sheet: &str, name: &str) -> Vec<Value> {
    let sheet = wb.sheet(sheet).unwrap();
    let idx = sheet.index_of(name).unwrap();
    sheet.column_values(idx).cloned().collect()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::utf8(*s)).collect()
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn reads_every_sheet_in_workbook_order() {
    let dir = tempfile::tempdir().unwrap();
    let wb = load(&write_fixture(dir.path()));
    assert_eq!(wb.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "明细"]);
    assert_eq!(
        column(&wb, "Sheet1", "地址"),
        vec![Value::utf8(" 北京-海淀 "), Value::Null, Value::utf8("上海(浦东)")]
    );
    assert_eq!(
        column(&wb, "明细", "数量"),
        vec![Value::Float64(1.0), Value::Float64(2.0), Value::Float64(1.0)]
    );
}

#[test]
fn trim_remove_chars_and_case() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());
    let output = dir.path().join("output.xlsx");

    let res = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&output),
        "operations": [
            {"type": "trim", "sheets": ["Sheet1"], "columns": {"names": ["姓名", "地址"]}},
            {"type": "remove_chars", "sheets": ["Sheet1"], "columns": {"names": ["地址"]}, "characters": "()-"},
            {"type": "case", "sheets": ["Sheet1"], "columns": {"names": ["Code"]}, "mode": "lower"}
        ]
    }))
    .unwrap();
    assert!(res.is_ok());

    let wb = load(&output);
    assert_eq!(column(&wb, "Sheet1", "姓名"), strings(&["张三", "李四", "张三"]));
    assert_eq!(
        column(&wb, "Sheet1", "地址"),
        vec![Value::utf8("北京海淀"), Value::Null, Value::utf8("上海浦东")]
    );
    assert_eq!(column(&wb, "Sheet1", "Code"), strings(&["abc123", "xyz789", "abc123"]));
    // Untouched sheet is written too.
    assert_eq!(wb.sheet("明细"), load(&input).sheet("明细"));
}

#[test]
fn regex_date_format_and_deduplicate() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());
    let output = dir.path().join("output2.xlsx");

    let res = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&output),
        "operations": [
            {"type": "regex_replace", "sheets": ["Sheet1"], "columns": {"names": ["Code"]}, "pattern": "[0-9]+", "replacement": "#"},
            {"type": "date_format", "sheets": ["Sheet1"], "columns": {"names": ["日期"]}, "output_format": "%Y-%m-%d"},
            {"type": "deduplicate", "sheets": ["Sheet1"], "subset": ["姓名", "Code"]}
        ]
    }))
    .unwrap();
    assert!(res.is_ok());

    let wb = load(&output);
    assert_eq!(column(&wb, "Sheet1", "Code"), strings(&["AbC#", "xyz#", "AbC#"]));
    assert_eq!(column(&wb, "Sheet1", "日期"), strings(&["2023-01-02", "2023-03-04", "2023-05-06"]));
    // " 张三 " and "张三" differ without a trim, so nothing is dropped.
    assert_eq!(wb.sheet("Sheet1").unwrap().row_count(), 3);
}

#[test]
fn bulk_replace_with_excel_range_on_cjk_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());
    let output = dir.path().join("output3.xlsx");

    let res = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&output),
        "operations": [
            {
                "type": "bulk_replace",
                "sheets": ["明细"],
                "columns": {"excel_range": "A:B"},
                "mapping": [{"from": "苹果", "to": "Apple"}, {"from": "香蕉", "to": "Banana"}],
                "match_mode": "exact"
            },
            {"type": "trim", "sheets": ["明细"], "columns": {"names": ["备注"]}}
        ]
    }))
    .unwrap();
    assert!(res.is_ok());

    let wb = load(&output);
    assert_eq!(column(&wb, "明细", "产品"), strings(&["Apple", "Banana", "Apple"]));
    assert_eq!(
        column(&wb, "明细", "数量"),
        vec![Value::Float64(1.0), Value::Float64(2.0), Value::Float64(1.0)]
    );
    assert_eq!(column(&wb, "明细", "备注"), strings(&["VIP 客户", "普通-客户", "VIP 客户"]));
}

#[test]
fn rerunning_idempotent_pipeline_on_its_output_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());
    let out1 = dir.path().join("output4.xlsx");
    let out2 = dir.path().join("output5.xlsx");

    let operations = json!([
        {"type": "trim", "columns": {"names": ["姓名", "地址"]}},
        {"type": "remove_chars", "columns": {"names": ["地址"]}, "characters": ["-", "(", ")"]},
        {"type": "case", "columns": {"names": ["Code"]}, "mode": "upper"},
        {"type": "regex_replace", "columns": {"names": ["Code"]}, "pattern": "[A-Z]+", "replacement": "X"},
        {"type": "date_format", "columns": {"names": ["日期"]}, "output_format": "%Y/%m/%d"},
        {"type": "deduplicate", "subset": ["姓名", "Code"]},
        {"type": "bulk_replace", "columns": {"names": ["备注"]}, "mapping": [{"from": "VIP", "to": "VIP"}]}
    ]);

    let first = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&out1),
        "operations": operations.clone(),
    }))
    .unwrap();
    assert!(first.is_ok());

    let second = apply_operations(&json!({
        "input_path": path_str(&out1),
        "output_path": path_str(&out2),
        "operations": operations,
    }))
    .unwrap();
    assert!(second.is_ok());

    let wb1 = load(&out1);
    assert_eq!(wb1, load(&out2));
    assert_eq!(column(&wb1, "Sheet1", "姓名"), strings(&["张三", "李四"]));
    assert_eq!(column(&wb1, "Sheet1", "Code"), strings(&["X123", "X789"]));
    assert_eq!(wb1.sheet("明细").unwrap().row_count(), 2);
}

#[test]
fn raise_policy_aborts_without_writing() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dates.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "日期").unwrap();
    ws.write_string(1, 0, "2023-01-02").unwrap();
    ws.write_string(2, 0, "not a date").unwrap();
    wb.save(&input).unwrap();

    let output = dir.path().join("never.xlsx");
    let err = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&output),
        "operations": [{"type": "date_format", "output_format": "%Y-%m-%d", "errors": "raise"}]
    }))
    .unwrap_err();

    match err {
        CleanError::DateParse { column, rows } => {
            assert_eq!(column, "日期");
            assert_eq!(rows, vec![1]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn native_date_cells_round_trip_and_reformat() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("native.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "when").unwrap();
    ws.write_string(0, 1, "copy").unwrap();
    let date = ExcelDateTime::from_ymd(2024, 2, 29).unwrap();
    let fmt = Format::new().set_num_format("yyyy-mm-dd");
    ws.write_datetime_with_format(1, 0, &date, &fmt).unwrap();
    ws.write_datetime_with_format(1, 1, &date, &fmt).unwrap();
    wb.save(&input).unwrap();

    let output = dir.path().join("out.xlsx");
    let res = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&output),
        "operations": [{"type": "date_format", "columns": {"indices": [0]}, "output_format": "%d/%m/%Y"}]
    }))
    .unwrap();
    assert!(res.is_ok());

    let out = load(&output);
    assert_eq!(column(&out, "Sheet1", "when"), strings(&["29/02/2024"]));
    // The unselected column keeps its native date type through the write.
    assert!(matches!(column(&out, "Sheet1", "copy")[0], Value::DateTime(_)));
    assert_eq!(column(&out, "Sheet1", "copy")[0].to_string(), "2024-02-29 00:00:00");
}

#[test]
fn padded_headers_survive_a_no_op_run_verbatim() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("padded.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, " Name ").unwrap();
    ws.write_string(0, 1, "   ").unwrap();
    ws.write_string(1, 0, " x ").unwrap();
    ws.write_string(1, 1, "y").unwrap();
    wb.save(&input).unwrap();

    let unchanged = dir.path().join("unchanged.xlsx");
    let res = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&unchanged),
        "operations": []
    }))
    .unwrap();
    assert!(res.is_ok());
    let out = load(&unchanged);
    assert_eq!(out.sheet("Sheet1").unwrap().columns, vec![" Name ", "Unnamed: 1"]);

    let trimmed = dir.path().join("trimmed.xlsx");
    apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&trimmed),
        "operations": [{"type": "trim", "columns": {"names": [" Name "]}}]
    }))
    .unwrap();
    assert_eq!(column(&load(&trimmed), "Sheet1", " Name "), strings(&["x"]));
}

#[test]
fn unknown_extension_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path());
    let err = apply_operations(&json!({
        "input_path": path_str(&input),
        "output_path": path_str(&dir.path().join("out.txt")),
        "operations": []
    }))
    .unwrap_err();
    assert!(matches!(err, CleanError::UnsupportedFormat { .. }));
}
