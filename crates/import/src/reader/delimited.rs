use crate::error::ImportResult;
use crate::table::{PositionalRow, PositionalRowIterator, PositionalTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimited text (CSV, TSV, ...) decoded up front, rows served lazily.
///
/// Physical lines may carry different field counts; shape checks happen
/// in the semantic layer. A line holding a single empty cell is kept so
/// it can be skipped there as a blank row.
#[derive(Debug)]
pub struct DelimitedTable {
    header: Vec<String>,
    rows: Vec<(u64, PositionalRow)>,
}

impl DelimitedTable {
    pub fn parse(data: &[u8], delimiter: u8, has_header: bool) -> ImportResult<Self> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(data);

        let mut header = Vec::new();
        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result?;
            if index == 0 && has_header {
                header = record.iter().map(|cell| cell.trim().to_string()).collect();
                continue;
            }
            let line = record
                .position()
                .map_or(index as u64 + 1, |position| position.line());
            let cells = record.iter().map(str::to_string).collect();
            rows.push((line, PositionalRow::new(cells)));
        }

        Ok(Self { header, rows })
    }
}

impl PositionalTable for DelimitedTable {
    fn data_row_count(&self) -> usize {
        self.rows.len()
    }

    fn header_column_names(&self) -> &[String] {
        &self.header
    }

    fn data_rows(&self) -> Box<dyn PositionalRowIterator + '_> {
        Box::new(DelimitedRows {
            rows: &self.rows,
            position: 0,
        })
    }
}

struct DelimitedRows<'a> {
    rows: &'a [(u64, PositionalRow)],
    position: usize,
}

impl Iterator for DelimitedRows<'_> {
    type Item = PositionalRow;

    fn next(&mut self) -> Option<PositionalRow> {
        let (_, row) = self.rows.get(self.position)?;
        self.position += 1;
        Some(row.clone())
    }
}

impl PositionalRowIterator for DelimitedRows<'_> {
    fn current_row_id(&self) -> String {
        match self.position.checked_sub(1).and_then(|i| self.rows.get(i)) {
            Some((line, _)) => format!("line#{line}"),
            None => "line#0".to_string(),
        }
    }
}
