use ledgerport_core::TransactionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ImportError, ImportResult};
use crate::table::{ColumnMapping, ColumnSource, SemanticColumn};
use crate::transform::CANONICAL_TIME_FORMAT;

/// Which geo component comes first in a location cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoOrder {
    #[default]
    LongitudeFirst,
    LatitudeFirst,
}

/// Where a row's UTC offset comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimezoneSource {
    /// The timezone column, falling back to the user's default offset when
    /// the column is absent or blank.
    #[default]
    Column,
    /// One offset (`+08:00`, `-0530`, `Z`) for every row.
    Fixed(String),
    /// The user's default offset for every row.
    UserDefault,
}

/// Value dialect shared by every importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// chrono strftime pattern for the time column.
    pub time_format: String,
    pub timezone: TimezoneSource,
    pub decimal_separator: char,
    pub digit_grouping: Option<char>,
    pub geo_separator: char,
    pub geo_order: GeoOrder,
    pub tags_separator: char,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            time_format: CANONICAL_TIME_FORMAT.to_string(),
            timezone: TimezoneSource::Column,
            decimal_separator: '.',
            digit_grouping: None,
            geo_separator: ' ',
            geo_order: GeoOrder::LongitudeFirst,
            tags_separator: ';',
        }
    }
}

impl ImportOptions {
    pub fn from_toml(toml_content: &str) -> ImportResult<Self> {
        let options: Self = toml::from_str(toml_content)
            .map_err(|e| ImportError::InvalidOptions(format!("Failed to parse TOML: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.time_format.trim().is_empty() {
            return Err(ImportError::InvalidOptions("time format is empty".to_string()));
        }
        if self.decimal_separator.is_ascii_digit() || self.decimal_separator == '-' {
            return Err(ImportError::InvalidOptions(format!(
                "decimal separator {:?} is not usable",
                self.decimal_separator
            )));
        }
        if self.digit_grouping == Some(self.decimal_separator) {
            return Err(ImportError::InvalidOptions(
                "digit grouping symbol equals the decimal separator".to_string(),
            ));
        }
        if self.geo_separator == '.' || self.geo_separator == '-' || self.geo_separator.is_ascii_digit() {
            return Err(ImportError::InvalidOptions(format!(
                "geo separator {:?} is not usable",
                self.geo_separator
            )));
        }
        if let TimezoneSource::Fixed(offset) = &self.timezone {
            if crate::parse::parse_timezone(offset).is_none() {
                return Err(ImportError::InvalidOptions(format!("invalid timezone {offset:?}")));
            }
        }
        Ok(())
    }
}

/// A user-configured delimited-text layout.
///
/// ```toml
/// delimiter = ";"
///
/// [columns]
/// time = "Date"
/// type = "Kind"
/// account_name = "Wallet"
/// amount = 3
///
/// [type_tokens]
/// "In" = "income"
/// "Out" = "expense"
///
/// [dialect]
/// time_format = "%d.%m.%Y %H:%M"
/// decimal_separator = ","
/// digit_grouping = "."
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFormatOptions {
    pub delimiter: char,
    pub has_header: bool,
    /// Semantic column to header name or zero-based index.
    pub columns: BTreeMap<SemanticColumn, ColumnSource>,
    /// Type cell text to transaction type.
    pub type_tokens: BTreeMap<String, TransactionType>,
    pub dialect: ImportOptions,
}

impl Default for CustomFormatOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            columns: BTreeMap::new(),
            type_tokens: default_type_tokens(),
            dialect: ImportOptions::default(),
        }
    }
}

fn default_type_tokens() -> BTreeMap<String, TransactionType> {
    [
        ("modify_balance", TransactionType::ModifyBalance),
        ("income", TransactionType::Income),
        ("expense", TransactionType::Expense),
        ("transfer", TransactionType::Transfer),
    ]
    .into_iter()
    .map(|(token, kind)| (token.to_string(), kind))
    .collect()
}

/// Columns a custom layout must map.
pub const CUSTOM_REQUIRED_COLUMNS: [SemanticColumn; 4] = [
    SemanticColumn::Time,
    SemanticColumn::Type,
    SemanticColumn::AccountName,
    SemanticColumn::Amount,
];

impl CustomFormatOptions {
    pub fn from_toml(toml_content: &str) -> ImportResult<Self> {
        let options: Self = toml::from_str(toml_content)
            .map_err(|e| ImportError::InvalidOptions(format!("Failed to parse TOML: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ImportResult<()> {
        self.dialect.validate()?;
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(ImportError::InvalidOptions(format!(
                "delimiter {:?} is not a single-byte separator",
                self.delimiter
            )));
        }
        for column in CUSTOM_REQUIRED_COLUMNS {
            if !self.columns.contains_key(&column) {
                return Err(ImportError::InvalidOptions(format!("column {column} is not mapped")));
            }
        }
        if !self.has_header {
            if let Some((column, source)) = self
                .columns
                .iter()
                .find(|(_, source)| matches!(source, ColumnSource::Name(_)))
            {
                return Err(ImportError::InvalidOptions(format!(
                    "column {column} is mapped by name ({source}) but the file has no header"
                )));
            }
        }
        if self.type_tokens.is_empty() {
            return Err(ImportError::InvalidOptions("no type tokens configured".to_string()));
        }
        Ok(())
    }

    /// The delimiter as the byte the csv reader expects. Only valid after
    /// [`validate`](Self::validate).
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        self.columns
            .iter()
            .fold(ColumnMapping::new(), |mapping, (column, source)| {
                mapping.with(*column, source.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canonical_layout() {
        let options = ImportOptions::default();
        assert_eq!(options.time_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(options.tags_separator, ';');
        assert!(options.validate().is_ok());
    }

    #[test]
    fn import_options_from_toml() {
        let options = ImportOptions::from_toml(
            r#"
            time_format = "%d/%m/%Y %H:%M"
            decimal_separator = ","
            digit_grouping = "."
            geo_order = "latitude_first"
            timezone = { fixed = "+05:30" }
            "#,
        )
        .unwrap();
        assert_eq!(options.decimal_separator, ',');
        assert_eq!(options.digit_grouping, Some('.'));
        assert_eq!(options.geo_order, GeoOrder::LatitudeFirst);
        assert_eq!(options.timezone, TimezoneSource::Fixed("+05:30".to_string()));
        assert_eq!(options.tags_separator, ';');
    }

    #[test]
    fn conflicting_separators_are_rejected() {
        let result = ImportOptions::from_toml("decimal_separator = \",\"\ndigit_grouping = \",\"");
        assert!(matches!(result, Err(ImportError::InvalidOptions(_))));
    }

    #[test]
    fn bad_fixed_timezone_is_rejected() {
        let result = ImportOptions::from_toml("timezone = { fixed = \"+25:00\" }");
        assert!(matches!(result, Err(ImportError::InvalidOptions(_))));
    }

    #[test]
    fn malformed_toml_is_invalid_options() {
        let result = ImportOptions::from_toml("time_format = ");
        match result {
            Err(ImportError::InvalidOptions(message)) => assert!(message.contains("TOML")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn custom_options_from_toml() {
        let options = CustomFormatOptions::from_toml(
            r#"
            delimiter = ";"

            [columns]
            time = "Date"
            type = "Kind"
            account_name = "Wallet"
            amount = 3

            [type_tokens]
            "In" = "income"
            "Out" = "expense"

            [dialect]
            time_format = "%d.%m.%Y %H:%M"
            "#,
        )
        .unwrap();
        assert_eq!(options.delimiter_byte(), b';');
        assert!(options.has_header);
        assert_eq!(
            options.columns[&SemanticColumn::Amount],
            ColumnSource::Index(3)
        );
        assert_eq!(options.type_tokens["Out"], TransactionType::Expense);
        assert_eq!(options.dialect.time_format, "%d.%m.%Y %H:%M");
        assert!(options.column_mapping().source(SemanticColumn::Time).is_some());
    }

    #[test]
    fn custom_options_require_core_columns() {
        let result = CustomFormatOptions::from_toml("[columns]\ntime = \"Date\"");
        match result {
            Err(ImportError::InvalidOptions(message)) => assert!(message.contains("type")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn headerless_layout_cannot_map_by_name() {
        let mut options = CustomFormatOptions {
            has_header: false,
            ..CustomFormatOptions::default()
        };
        for (i, column) in CUSTOM_REQUIRED_COLUMNS.into_iter().enumerate() {
            options.columns.insert(column, ColumnSource::Index(i));
        }
        assert!(options.validate().is_ok());

        options
            .columns
            .insert(SemanticColumn::Description, ColumnSource::Name("Memo".to_string()));
        assert!(matches!(options.validate(), Err(ImportError::InvalidOptions(_))));
    }

    #[test]
    fn multibyte_delimiter_is_rejected() {
        let mut options = CustomFormatOptions {
            delimiter: '€',
            ..CustomFormatOptions::default()
        };
        for (i, column) in CUSTOM_REQUIRED_COLUMNS.into_iter().enumerate() {
            options.columns.insert(column, ColumnSource::Index(i));
        }
        assert!(matches!(options.validate(), Err(ImportError::InvalidOptions(_))));
    }
}
