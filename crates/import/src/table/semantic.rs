use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::named::{NamedRowIterator, NamedTable};
use super::PositionalTable;
use crate::error::{ImportError, ImportResult};
use crate::transform::RowTransform;

/// Domain-meaningful transaction fields, independent of any file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticColumn {
    Time,
    Timezone,
    Type,
    Category,
    SubCategory,
    AccountName,
    AccountCurrency,
    Amount,
    RelatedAccountName,
    RelatedAccountCurrency,
    RelatedAmount,
    GeoLocation,
    Tags,
    Description,
}

impl SemanticColumn {
    pub const ALL: [SemanticColumn; 14] = [
        SemanticColumn::Time,
        SemanticColumn::Timezone,
        SemanticColumn::Type,
        SemanticColumn::Category,
        SemanticColumn::SubCategory,
        SemanticColumn::AccountName,
        SemanticColumn::AccountCurrency,
        SemanticColumn::Amount,
        SemanticColumn::RelatedAccountName,
        SemanticColumn::RelatedAccountCurrency,
        SemanticColumn::RelatedAmount,
        SemanticColumn::GeoLocation,
        SemanticColumn::Tags,
        SemanticColumn::Description,
    ];
}

impl fmt::Display for SemanticColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticColumn::Time => "time",
            SemanticColumn::Timezone => "timezone",
            SemanticColumn::Type => "type",
            SemanticColumn::Category => "category",
            SemanticColumn::SubCategory => "sub_category",
            SemanticColumn::AccountName => "account_name",
            SemanticColumn::AccountCurrency => "account_currency",
            SemanticColumn::Amount => "amount",
            SemanticColumn::RelatedAccountName => "related_account_name",
            SemanticColumn::RelatedAccountCurrency => "related_account_currency",
            SemanticColumn::RelatedAmount => "related_amount",
            SemanticColumn::GeoLocation => "geo_location",
            SemanticColumn::Tags => "tags",
            SemanticColumn::Description => "description",
        };
        f.write_str(name)
    }
}

/// Where a column's value comes from in the physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSource {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSource::Index(index) => write!(f, "#{index}"),
            ColumnSource::Name(name) => f.write_str(name),
        }
    }
}

/// Semantic column to source column, plus optional named extra columns a
/// format needs but the importer does not (for example a transfer
/// related id).
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    columns: BTreeMap<SemanticColumn, ColumnSource>,
    extras: BTreeMap<String, ColumnSource>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(pairs: &[(SemanticColumn, &str)]) -> Self {
        pairs.iter().fold(Self::new(), |mapping, (column, name)| {
            mapping.with(*column, ColumnSource::Name(name.to_string()))
        })
    }

    pub fn with(mut self, column: SemanticColumn, source: ColumnSource) -> Self {
        self.columns.insert(column, source);
        self
    }

    pub fn with_extra(mut self, key: &str, source: ColumnSource) -> Self {
        self.extras.insert(key.to_string(), source);
        self
    }

    pub fn source(&self, column: SemanticColumn) -> Option<&ColumnSource> {
        self.columns.get(&column)
    }
}

/// One row projected onto semantic columns.
///
/// An invalid row is skipped silently by consumers; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticRow {
    row_id: String,
    valid: bool,
    fields: BTreeMap<SemanticColumn, String>,
    extras: BTreeMap<String, String>,
}

impl SemanticRow {
    pub fn new(row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            valid: true,
            fields: BTreeMap::new(),
            extras: BTreeMap::new(),
        }
    }

    pub fn invalid(row_id: impl Into<String>) -> Self {
        Self {
            valid: false,
            ..Self::new(row_id)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    /// Value of `column`, `""` when absent.
    pub fn get(&self, column: SemanticColumn) -> &str {
        self.fields.get(&column).map(String::as_str).unwrap_or_default()
    }

    pub fn has(&self, column: SemanticColumn) -> bool {
        self.fields.contains_key(&column)
    }

    pub fn set(&mut self, column: SemanticColumn, value: impl Into<String>) {
        self.fields.insert(column, value.into());
    }

    pub fn with(mut self, column: SemanticColumn, value: &str) -> Self {
        self.set(column, value);
        self
    }

    pub fn extra(&self, key: &str) -> &str {
        self.extras.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn set_extra(&mut self, key: &str, value: impl Into<String>) {
        self.extras.insert(key.to_string(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = SemanticColumn> + '_ {
        self.fields.keys().copied()
    }
}

pub type SemanticRows<'a> = Box<dyn Iterator<Item = ImportResult<SemanticRow>> + 'a>;

/// A table addressed by semantic column. This is what the importer reads.
pub trait SemanticTable {
    /// Whether rows can carry `column`, either from the file or from a
    /// row transform that synthesizes it.
    fn has_column(&self, column: SemanticColumn) -> bool;

    fn data_row_count(&self) -> usize;

    fn rows(&self) -> SemanticRows<'_>;
}

/// Semantic view over a positional table through a [`ColumnMapping`].
pub struct MappedSemanticTable<T: PositionalTable> {
    table: NamedTable<T>,
    indexes: BTreeMap<SemanticColumn, usize>,
    extra_indexes: BTreeMap<String, usize>,
    transform: Option<RowTransform>,
}

impl<T: PositionalTable> MappedSemanticTable<T> {
    pub fn new(table: T, mapping: &ColumnMapping) -> Self {
        Self::from_named(NamedTable::new(table), mapping)
    }

    /// Columns whose source is missing from the header are left out; rows
    /// then report them as empty.
    pub fn from_named(table: NamedTable<T>, mapping: &ColumnMapping) -> Self {
        let indexes = mapping
            .columns
            .iter()
            .filter_map(|(column, source)| resolve(&table, source).map(|index| (*column, index)))
            .collect();
        let extra_indexes = mapping
            .extras
            .iter()
            .filter_map(|(key, source)| resolve(&table, source).map(|index| (key.clone(), index)))
            .collect();

        Self {
            table,
            indexes,
            extra_indexes,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: RowTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Fails before any row is read when a required column did not resolve.
    pub fn require(self, columns: &[SemanticColumn], mapping: &ColumnMapping) -> ImportResult<Self> {
        for column in columns {
            if !self.indexes.contains_key(column) {
                let name = mapping
                    .source(*column)
                    .map(ColumnSource::to_string)
                    .unwrap_or_else(|| column.to_string());
                return Err(ImportError::MissingRequiredField(name));
            }
        }
        Ok(self)
    }

    pub fn has_extra(&self, key: &str) -> bool {
        self.extra_indexes.contains_key(key)
    }

    /// Minimum cell count a data row needs.
    fn expected_width(&self) -> usize {
        let header = self.table.header();
        if !header.is_empty() {
            return header.width();
        }
        self.indexes
            .values()
            .chain(self.extra_indexes.values())
            .map(|index| index + 1)
            .max()
            .unwrap_or(0)
    }
}

fn resolve<T: PositionalTable>(table: &NamedTable<T>, source: &ColumnSource) -> Option<usize> {
    let header = table.header();
    match source {
        ColumnSource::Name(name) => header.index_of(name),
        ColumnSource::Index(index) if header.is_empty() || *index < header.width() => Some(*index),
        ColumnSource::Index(_) => None,
    }
}

impl<T: PositionalTable> SemanticTable for MappedSemanticTable<T> {
    fn has_column(&self, column: SemanticColumn) -> bool {
        self.indexes.contains_key(&column)
            || self
                .transform
                .as_ref()
                .is_some_and(|transform| transform.adds(column))
    }

    fn data_row_count(&self) -> usize {
        self.table.data_row_count()
    }

    fn rows(&self) -> SemanticRows<'_> {
        Box::new(MappedRows {
            rows: self.table.rows(),
            indexes: &self.indexes,
            extra_indexes: &self.extra_indexes,
            transform: self.transform.as_ref(),
            expected_width: self.expected_width(),
        })
    }
}

struct MappedRows<'a> {
    rows: NamedRowIterator<'a>,
    indexes: &'a BTreeMap<SemanticColumn, usize>,
    extra_indexes: &'a BTreeMap<String, usize>,
    transform: Option<&'a RowTransform>,
    expected_width: usize,
}

impl MappedRows<'_> {
    fn project(&mut self) -> Option<ImportResult<SemanticRow>> {
        let named = self.rows.next()?;
        let row_id = self.rows.current_row_id();
        let cells = named.positional();

        if cells.is_blank_sentinel() {
            return Some(Ok(SemanticRow::invalid(row_id)));
        }
        if cells.column_count() < self.expected_width {
            return Some(Err(ImportError::FewerFieldsThanHeader {
                row: row_id,
                found: cells.column_count(),
                expected: self.expected_width,
            }));
        }

        let mut row = SemanticRow::new(row_id);
        for (column, index) in self.indexes {
            row.set(*column, cells.get(*index).trim());
        }
        for (key, index) in self.extra_indexes {
            row.set_extra(key, cells.get(*index).trim());
        }

        if let Some(transform) = self.transform {
            match transform.apply(&mut row) {
                Ok(true) => {}
                Ok(false) => return Some(Ok(SemanticRow::invalid(row.row_id))),
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(row))
    }
}

impl Iterator for MappedRows<'_> {
    type Item = ImportResult<SemanticRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.project()
    }
}

/// A semantic table backed by rows held in memory, for formats that must
/// aggregate rows before the importer sees them.
#[derive(Debug, Clone, Default)]
pub struct BufferedSemanticTable {
    columns: BTreeSet<SemanticColumn>,
    rows: Vec<SemanticRow>,
}

impl BufferedSemanticTable {
    pub fn new(columns: impl IntoIterator<Item = SemanticColumn>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SemanticRow) {
        self.columns.extend(row.columns());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SemanticTable for BufferedSemanticTable {
    fn has_column(&self, column: SemanticColumn) -> bool {
        self.columns.contains(&column)
    }

    fn data_row_count(&self) -> usize {
        self.rows.len()
    }

    fn rows(&self) -> SemanticRows<'_> {
        Box::new(self.rows.iter().cloned().map(Ok))
    }
}
