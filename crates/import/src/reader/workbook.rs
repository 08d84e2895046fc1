use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{ImportError, ImportResult};
use crate::table::{PositionalRow, PositionalRowIterator, PositionalTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkbookFormat {
    /// Zip-based Office Open XML.
    Xlsx,
    /// Legacy compound-binary BIFF8.
    Xls,
}

/// Every sheet of a workbook read as one table.
///
/// With a header line, sheet 0's title row (up to its first empty cell)
/// is the table header and every later sheet must repeat it as a prefix.
/// Sheets without data rows are skipped.
///
/// Rows are padded to the header width because spreadsheets do not store
/// trailing blank cells, so the fewer-fields check never fires for a
/// workbook. A row with no cells at all is yielded as the blank-line
/// marker.
pub struct WorkbookTable {
    header: Vec<String>,
    sheets: Vec<Range<Data>>,
    has_header: bool,
}

impl WorkbookTable {
    pub fn parse(data: &[u8], format: WorkbookFormat, has_header: bool) -> ImportResult<Self> {
        let sheets = match format {
            WorkbookFormat::Xlsx => {
                let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))?;
                read_sheets(&mut workbook)?
            }
            WorkbookFormat::Xls => {
                let mut workbook: Xls<_> = Xls::new(Cursor::new(data))?;
                read_sheets(&mut workbook)?
            }
        };
        Self::from_sheets(sheets, has_header)
    }

    pub fn from_sheets(sheets: Vec<Range<Data>>, has_header: bool) -> ImportResult<Self> {
        let header = if has_header {
            consistent_header(&sheets)?
        } else {
            Vec::new()
        };
        Ok(Self {
            header,
            sheets,
            has_header,
        })
    }

    fn first_data_row(&self) -> usize {
        usize::from(self.has_header)
    }
}

fn read_sheets<RS, R>(workbook: &mut R) -> ImportResult<Vec<Range<Data>>>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: Into<ImportError>,
{
    let names = workbook.sheet_names();
    names
        .iter()
        .map(|name| workbook.worksheet_range(name).map_err(Into::into))
        .collect()
}

/// Captures the first non-empty sheet's title row and checks every later
/// non-empty sheet against it up to the narrower of the two widths.
fn consistent_header(sheets: &[Range<Data>]) -> ImportResult<Vec<String>> {
    let mut header: Option<Vec<String>> = None;

    for (index, sheet) in sheets.iter().enumerate() {
        let Some(title) = sheet.rows().next() else {
            tracing::debug!(sheet = index, "skipping empty sheet in header check");
            continue;
        };
        let title: Vec<String> = title.iter().map(|cell| cell_text(cell).trim().to_string()).collect();

        match &header {
            None => {
                header = Some(title.into_iter().take_while(|cell| !cell.is_empty()).collect());
            }
            Some(expected) => {
                let width = title.len().min(expected.len());
                if let Some(column) = (0..width).find(|&c| title[c] != expected[c]) {
                    return Err(ImportError::FieldsDifferAcrossTables {
                        table: format!("sheet#{index}"),
                        column,
                        expected: expected[column].clone(),
                        found: title[column].clone(),
                    });
                }
            }
        }
    }

    Ok(header.unwrap_or_default())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

impl PositionalTable for WorkbookTable {
    fn data_row_count(&self) -> usize {
        let first = self.first_data_row();
        self.sheets
            .iter()
            .map(|sheet| sheet.height().saturating_sub(first))
            .sum()
    }

    fn header_column_names(&self) -> &[String] {
        &self.header
    }

    fn data_rows(&self) -> Box<dyn PositionalRowIterator + '_> {
        Box::new(WorkbookRows {
            table: self,
            sheet: 0,
            row: self.first_data_row(),
            current: None,
        })
    }
}

struct WorkbookRows<'a> {
    table: &'a WorkbookTable,
    sheet: usize,
    row: usize,
    current: Option<(usize, usize)>,
}

impl Iterator for WorkbookRows<'_> {
    type Item = PositionalRow;

    fn next(&mut self) -> Option<PositionalRow> {
        while let Some(sheet) = self.table.sheets.get(self.sheet) {
            if self.row >= sheet.height() {
                self.sheet += 1;
                self.row = self.table.first_data_row();
                continue;
            }

            let row = self.row;
            self.current = Some((self.sheet, row));
            self.row += 1;

            let blank = (0..sheet.width())
                .all(|column| matches!(sheet.get((row, column)), None | Some(Data::Empty)));
            if blank {
                return Some(PositionalRow::new(vec![String::new()]));
            }

            // Cells past a sheet's used range are blank, never missing.
            let width = sheet.width().max(self.table.header.len());
            let cells = (0..width)
                .map(|column| sheet.get((row, column)).map(cell_text).unwrap_or_default())
                .collect();
            return Some(PositionalRow::new(cells));
        }
        None
    }
}

impl PositionalRowIterator for WorkbookRows<'_> {
    fn current_row_id(&self) -> String {
        match self.current {
            Some((sheet, row)) => format!("sheet#{sheet}-row#{row}"),
            None => "sheet#0-row#0".to_string(),
        }
    }
}
