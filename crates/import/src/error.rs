use thiserror::Error;

/// Coarse classification of an [`ImportError`], for callers that map
/// failures onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable or inconsistent file.
    FileFormat,
    /// Header or row shape does not fit the expected layout.
    Structural,
    /// A value in a well-formed row is unacceptable.
    Semantic,
    /// Something referenced by a row cannot be resolved.
    NotFound,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Fields differ across tables: {table} column {column} is {found:?}, expected {expected:?}")]
    FieldsDifferAcrossTables {
        table: String,
        column: usize,
        expected: String,
        found: String,
    },
    #[error("Invalid import options: {0}")]
    InvalidOptions(String),
    #[error("Missing required field in header: {0}")]
    MissingRequiredField(String),
    #[error("Row {row}: fewer fields ({found}) than header ({expected})")]
    FewerFieldsThanHeader {
        row: String,
        found: usize,
        expected: usize,
    },
    #[error("Row {row}: invalid transaction type {value:?}")]
    InvalidTransactionType { row: String, value: String },
    #[error("Row {row}: invalid amount {value:?}")]
    InvalidAmount { row: String, value: String },
    #[error("Row {row}: invalid or unsupported currency {value:?}")]
    InvalidCurrency { row: String, value: String },
    #[error("Row {row}: invalid time {value:?}")]
    InvalidTime { row: String, value: String },
    #[error("Row {row}: invalid timezone {value:?}")]
    InvalidTimezone { row: String, value: String },
    #[error("Row {row}: invalid geographic location {value:?}")]
    InvalidGeoLocation { row: String, value: String },
    #[error("Row {row}: transfer leg has no related id")]
    MissingRelatedId { row: String },
    #[error("Row {row}: transfer legs for related id {related_id:?} have the same direction")]
    TransferDirectionConflict { row: String, related_id: String },
    #[error("Unpaired transfer legs for related ids: {}", .0.join(", "))]
    UnpairedTransfers(Vec<String>),
    #[error("Row {row}: account {account:?} already uses currency {expected}, found {found}")]
    AccountCurrencyConflict {
        row: String,
        account: String,
        expected: String,
        found: String,
    },
    #[error("Row {row}: account not found: {name:?}")]
    AccountNotFound { row: String, name: String },
    #[error("Row {row}: category not found: {name:?}")]
    CategoryNotFound { row: String, name: String },
    #[error("No transaction data in file")]
    NoTransactionData,
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidFile(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::FieldsDifferAcrossTables { .. }
            | ImportError::NoTransactionData => ErrorKind::FileFormat,
            ImportError::InvalidOptions(_)
            | ImportError::MissingRequiredField(_)
            | ImportError::FewerFieldsThanHeader { .. } => ErrorKind::Structural,
            ImportError::AccountNotFound { .. } | ImportError::CategoryNotFound { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Semantic,
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::InvalidFile(err.to_string())
    }
}

impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::InvalidFile(err.to_string())
    }
}

impl From<calamine::XlsError> for ImportError {
    fn from(err: calamine::XlsError) -> Self {
        ImportError::InvalidFile(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaired_transfers_lists_every_id() {
        let err = ImportError::UnpairedTransfers(vec!["R1".to_string(), "R7".to_string()]);
        assert_eq!(err.to_string(), "Unpaired transfer legs for related ids: R1, R7");
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn row_errors_mention_row_id() {
        let err = ImportError::FewerFieldsThanHeader {
            row: "sheet#0-row#3".to_string(),
            found: 2,
            expected: 5,
        };
        assert!(err.to_string().contains("sheet#0-row#3"));
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn kinds() {
        assert_eq!(ImportError::InvalidFile("x".into()).kind(), ErrorKind::FileFormat);
        assert_eq!(
            ImportError::AccountNotFound { row: "1".into(), name: String::new() }.kind(),
            ErrorKind::NotFound
        );
    }
}
