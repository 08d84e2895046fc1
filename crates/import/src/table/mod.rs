//! Table layers between raw file readers and the importer.
//!
//! Readers only implement [`PositionalTable`]. [`named::NamedTable`] adds
//! header-name addressing on top of any positional table, and
//! [`semantic`] maps either onto domain columns.

pub mod named;
pub mod semantic;

pub use named::{HeaderMap, NamedRow, NamedTable};
pub use semantic::{
    BufferedSemanticTable, ColumnMapping, ColumnSource, MappedSemanticTable, SemanticColumn,
    SemanticRow, SemanticRows, SemanticTable,
};

/// One data row addressed by column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionalRow {
    cells: Vec<String>,
}

impl PositionalRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn column_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell at `index`, or `""` when the row is shorter.
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or_default()
    }

    /// A row made of one empty cell marks an intentionally blank line.
    pub fn is_blank_sentinel(&self) -> bool {
        self.cells.len() == 1 && self.cells[0].is_empty()
    }
}

impl From<Vec<&str>> for PositionalRow {
    fn from(cells: Vec<&str>) -> Self {
        Self::new(cells.into_iter().map(str::to_string).collect())
    }
}

/// Uniform contract every physical format reader implements.
pub trait PositionalTable {
    fn data_row_count(&self) -> usize;

    /// Title row cells; empty when the format or options have no header line.
    fn header_column_names(&self) -> &[String];

    fn data_rows(&self) -> Box<dyn PositionalRowIterator + '_>;
}

/// Pull-based row iteration that can also name the row it last returned.
pub trait PositionalRowIterator: Iterator<Item = PositionalRow> {
    /// Opaque diagnostic id of the row most recently returned by `next`.
    fn current_row_id(&self) -> String;
}
