use std::io::{Cursor, Write};

use ledgerport_core::{Money, TransactionType, UserContext};
use ledgerport_import::reader::{WorkbookFormat, WorkbookTable};
use ledgerport_import::table::PositionalTable;
use ledgerport_import::{import_file, ErrorKind, FileFormat, IdentityMaps, ImportError, ImportedData};
use zip::write::FileOptions;
use zip::CompressionMethod;

fn user() -> UserContext {
    UserContext::new(1, "USD", 0).unwrap()
}

fn paired_csv(data: &str) -> Result<ImportedData, ImportError> {
    import_file(FileFormat::PairedCsv, data.as_bytes(), &user(), &IdentityMaps::default())
}

fn paired_xlsx(sheets: &[&[&[&str]]]) -> Result<ImportedData, ImportError> {
    import_file(FileFormat::PairedXlsx, &xlsx(sheets), &user(), &IdentityMaps::default())
}

fn xlsx(sheets: &[&[&[&str]]]) -> Vec<u8> {
    let mut entries = String::new();
    let mut rels = String::new();
    for n in 1..=sheets.len() {
        entries.push_str(&format!(r#"<sheet name="S{n}" sheetId="{n}" r:id="rId{n}"/>"#));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }

    let mut files = vec![
        (
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{entries}</sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#),
        ),
    ];
    for (i, rows) in sheets.iter().enumerate() {
        let mut data = String::new();
        for (r, row) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate().filter(|(_, v)| !v.is_empty()) {
                let column = (b'A' + c as u8) as char;
                data.push_str(&format!(
                    r#"<c r="{column}{}" t="inlineStr"><is><t>{value}</t></is></c>"#,
                    r + 1
                ));
            }
            data.push_str("</row>");
        }
        files.push((
            format!("xl/worksheets/sheet{}.xml", i + 1),
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#),
        ));
    }

    let mut buf = Vec::new();
    let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
    let options: FileOptions<'_, ()> = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in files {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    buf
}

// ── transfer pairing ─────────────────────────────────────────────────────────

const PAIRED_HEADER: &str = "Type,Time,SubCategory,Account,Amount,Comment,RelatedId";
const OUT_LEG: &str = "TransferOut,2024-09-01 23:59:59,Cat3,A,0.05,,R1";
const IN_LEG: &str = "TransferIn,2024-09-01 23:59:59,Cat3,B,0.05,,R1";

#[test]
fn two_legs_become_one_transfer() {
    let data = paired_csv(&format!("{PAIRED_HEADER}\n{OUT_LEG}\n{IN_LEG}\n")).unwrap();

    assert_eq!(data.transactions.len(), 1);
    let tx = &data.transactions[0];
    assert_eq!(tx.transaction_type, TransactionType::Transfer);
    assert_eq!(tx.account.name, "A");
    assert_eq!(tx.related_account.as_ref().unwrap().name, "B");
    assert_eq!(tx.amount, Money::from_cents(5));
    assert_eq!(tx.related_amount, Some(Money::from_cents(5)));
    assert_eq!(tx.category.as_ref().unwrap().name, "Cat3");
    assert_eq!(data.new_transfer_categories.len(), 1);
}

#[test]
fn leg_order_yields_identical_transfer() {
    let forward = paired_csv(&format!("{PAIRED_HEADER}\n{OUT_LEG}\n{IN_LEG}\n")).unwrap();
    let backward = paired_csv(&format!("{PAIRED_HEADER}\n{IN_LEG}\n{OUT_LEG}\n")).unwrap();
    assert_eq!(forward.transactions, backward.transactions);
}

#[test]
fn single_leg_is_reported_by_id() {
    let result = paired_csv(&format!("{PAIRED_HEADER}\n{OUT_LEG}\n"));
    match result {
        Err(err @ ImportError::UnpairedTransfers(_)) => {
            assert!(err.to_string().contains("R1"));
            assert_eq!(err.kind(), ErrorKind::Semantic);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn two_out_legs_for_one_id_conflict() {
    let second_out = OUT_LEG.replace(",A,", ",C,");
    let result = paired_csv(&format!("{PAIRED_HEADER}\n{OUT_LEG}\n{second_out}\n"));
    assert!(matches!(result, Err(ImportError::TransferDirectionConflict { .. })));
}

// ── balance modification ─────────────────────────────────────────────────────

#[test]
fn balance_set_becomes_income() {
    let data = paired_csv(
        "Type,Time,SubCategory,Account,Amount,Comment\n\
         ModifyBalance,2024-09-01 00:00:00,,A,123.45,\n",
    )
    .unwrap();
    let tx = &data.transactions[0];
    assert_eq!(tx.transaction_type, TransactionType::Income);
    assert_eq!(tx.account.name, "A");
    assert_eq!(tx.amount, Money::from_cents(12345));
    assert_eq!(tx.category, None);
}

#[test]
fn negative_balance_set_becomes_expense() {
    let data = paired_csv(
        "Type,Time,SubCategory,Account,Amount,Comment\n\
         ModifyBalance,2024-09-01,,A,-8,\n",
    )
    .unwrap();
    let tx = &data.transactions[0];
    assert_eq!(tx.transaction_type, TransactionType::Expense);
    assert_eq!(tx.amount, Money::from_cents(800));
    assert_eq!(tx.unix_time(), 1_725_148_800);
}

// ── row shape ────────────────────────────────────────────────────────────────

#[test]
fn short_row_is_never_truncated() {
    let result = paired_csv(&format!("{PAIRED_HEADER}\nIncome,2024-09-01 00:00:00,Gift,A\n"));
    match result {
        Err(err @ ImportError::FewerFieldsThanHeader { .. }) => {
            assert_eq!(err.kind(), ErrorKind::Structural);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn blank_sentinel_rows_are_skipped() {
    let data = paired_csv(&format!(
        "{PAIRED_HEADER}\n\"\"\nIncome,2024-09-01 00:00:00,Gift,A,1,,\n\"\"\n"
    ))
    .unwrap();
    assert_eq!(data.transactions.len(), 1);
    assert_eq!(data.new_accounts.len(), 1);
}

// ── multi-sheet workbooks ────────────────────────────────────────────────────

#[test]
fn prefix_headers_across_sheets_are_consistent() {
    let bytes = xlsx(&[
        &[&["A1", "B1", "C1"], &["1", "2", "3"]],
        &[&["A1", "B1"], &["4", "5"]],
    ]);
    let table = WorkbookTable::parse(&bytes, WorkbookFormat::Xlsx, true).unwrap();
    assert_eq!(table.header_column_names(), ["A1", "B1", "C1"]);
    assert_eq!(table.data_row_count(), 2);
}

#[test]
fn diverging_third_sheet_rejects_the_file() {
    let bytes = xlsx(&[
        &[&["A1", "B1", "C1"], &["1", "2", "3"]],
        &[&["A1", "B1"], &["4", "5"]],
        &[&["A1", "X1", "C1"], &["6", "7", "8"]],
    ]);
    let result = WorkbookTable::parse(&bytes, WorkbookFormat::Xlsx, true);
    match result {
        Err(err @ ImportError::FieldsDifferAcrossTables { .. }) => {
            assert_eq!(err.kind(), ErrorKind::FileFormat);
        }
        Err(other) => panic!("unexpected: {other:?}"),
        Ok(_) => panic!("expected a header mismatch"),
    }
}

#[test]
fn paired_workbook_with_prefix_sheet_imports() {
    let full: &[&str] = &["Type", "Time", "SubCategory", "Account", "Amount", "RelatedId"];
    let prefix: &[&str] = &["Type", "Time", "SubCategory", "Account", "Amount"];
    let data = paired_xlsx(&[
        &[full, &["TransferOut", "2024-09-01 10:00", "Move", "A", "7", "R9"]],
        &[prefix, &["Expense", "2024-09-02", "Food", "A", "3"]],
        &[full, &["TransferIn", "2024-09-01 10:00", "Move", "B", "7", "R9"]],
    ])
    .unwrap();
    assert_eq!(data.transactions.len(), 2);
    assert_eq!(data.transactions[0].transaction_type, TransactionType::Expense);
    assert!(data.transactions[1].is_transfer());
}

#[test]
fn paired_workbook_with_mismatched_sheet_fails() {
    let full: &[&str] = &["Type", "Time", "SubCategory", "Account", "Amount"];
    let other: &[&str] = &["Type", "Date", "SubCategory", "Account", "Amount"];
    let result = paired_xlsx(&[
        &[full, &["Income", "2024-09-01", "Gift", "A", "1"]],
        &[other, &["Income", "2024-09-02", "Gift", "A", "1"]],
    ]);
    assert!(matches!(result, Err(ImportError::FieldsDifferAcrossTables { .. })));
}

#[test]
fn gap_row_inside_a_sheet_is_skipped() {
    let header: &[&str] = &["Type", "Time", "SubCategory", "Account", "Amount"];
    let data = paired_xlsx(&[&[
        header,
        &["Income", "2024-09-01", "Gift", "A", "1"],
        &[],
        &["Expense", "2024-09-02", "Food", "A", "2"],
    ]])
    .unwrap();
    assert_eq!(data.transactions.len(), 2);
}

#[test]
fn legacy_workbook_imports_across_sheets() {
    let bytes = include_bytes!("data/paired_two_sheets.xls");
    let data = import_file(FileFormat::PairedXls, bytes, &user(), &IdentityMaps::default()).unwrap();

    let types: Vec<_> = data.transactions.iter().map(|tx| tx.transaction_type).collect();
    assert_eq!(
        types,
        [TransactionType::Expense, TransactionType::Transfer, TransactionType::Income]
    );
    let transfer = &data.transactions[1];
    assert_eq!(transfer.account.name, "Cash");
    assert_eq!(transfer.related_account.as_ref().unwrap().name, "Card");
    assert_eq!(transfer.amount, Money::from_cents(700));
    assert_eq!(data.transactions[0].amount, Money::from_cents(350));
    assert_eq!(data.transactions[2].amount, Money::from_cents(10000));
    assert_eq!(data.new_accounts.len(), 2);
}

#[test]
fn corrupt_workbook_is_invalid_file() {
    let result = import_file(FileFormat::PairedXls, b"not a workbook", &user(), &IdentityMaps::default());
    assert!(matches!(result, Err(ImportError::InvalidFile(_))));
}

// ── native layout ────────────────────────────────────────────────────────────

#[test]
fn native_export_reimports() {
    let data = import_file(
        FileFormat::NativeCsv,
        b"Time,Timezone,Type,Category,Sub Category,Account,Account Currency,Amount,Account2,Account2 Currency,Account2 Amount,Geographic Location,Tags,Description\n\
          2024-09-01 23:59:59,+00:00,Transfer,,Cat3,A,USD,0.05,B,USD,0.05,,,\n",
        &user(),
        &IdentityMaps::default(),
    )
    .unwrap();
    let tx = &data.transactions[0];
    assert!(tx.is_transfer());
    assert_eq!(tx.account.name, "A");
    assert_eq!(tx.related_account.as_ref().unwrap().name, "B");
    assert_eq!(serde_json::to_value(&data).unwrap()["transactions"][0]["amount"], "0.05");
}
