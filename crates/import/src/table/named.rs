use std::collections::HashMap;

use super::{PositionalRow, PositionalRowIterator, PositionalTable};

/// Header name to column index, built once per table from its title row.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    indexes: HashMap<String, usize>,
    width: usize,
}

impl HeaderMap {
    /// Duplicate names keep their first occurrence.
    pub fn from_names(names: &[String]) -> Self {
        let mut indexes = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            indexes.entry(name.trim().to_string()).or_insert(index);
        }
        Self {
            indexes,
            width: names.len(),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indexes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Column count of the title row, duplicates included.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }
}

/// Header-name addressing over any positional table.
pub struct NamedTable<T: PositionalTable> {
    inner: T,
    header: HeaderMap,
}

impl<T: PositionalTable> NamedTable<T> {
    pub fn new(inner: T) -> Self {
        let header = HeaderMap::from_names(inner.header_column_names());
        Self { inner, header }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header.contains(name)
    }

    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    pub fn positional(&self) -> &T {
        &self.inner
    }

    pub fn data_row_count(&self) -> usize {
        self.inner.data_row_count()
    }

    pub fn rows(&self) -> NamedRowIterator<'_> {
        NamedRowIterator {
            rows: self.inner.data_rows(),
            header: &self.header,
        }
    }
}

pub struct NamedRowIterator<'a> {
    rows: Box<dyn PositionalRowIterator + 'a>,
    header: &'a HeaderMap,
}

impl<'a> NamedRowIterator<'a> {
    pub fn current_row_id(&self) -> String {
        self.rows.current_row_id()
    }
}

impl<'a> Iterator for NamedRowIterator<'a> {
    type Item = NamedRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(NamedRow {
            header: self.header,
            row,
        })
    }
}

/// A positional row read through its table's header map.
#[derive(Debug)]
pub struct NamedRow<'a> {
    header: &'a HeaderMap,
    row: PositionalRow,
}

impl NamedRow<'_> {
    /// Value of the named column, `""` when the header or the row lacks it.
    pub fn get(&self, name: &str) -> &str {
        match self.header.index_of(name) {
            Some(index) => self.row.get(index),
            None => "",
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.header
            .index_of(name)
            .is_some_and(|index| index < self.row.column_count())
    }

    pub fn positional(&self) -> &PositionalRow {
        &self.row
    }
}

impl<T: PositionalTable + ?Sized> PositionalTable for Box<T> {
    fn data_row_count(&self) -> usize {
        (**self).data_row_count()
    }

    fn header_column_names(&self) -> &[String] {
        (**self).header_column_names()
    }

    fn data_rows(&self) -> Box<dyn PositionalRowIterator + '_> {
        (**self).data_rows()
    }
}
