use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ledger account. Imported files only ever reference accounts by name;
/// `id` is `None` until the persistence layer stores a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub uid: i64,
    pub name: String,
    pub currency: String,
}

impl Account {
    pub fn new(uid: i64, name: &str, currency: &str) -> Result<Self, LedgerError> {
        currency::validate(currency)?;
        Ok(Account {
            id: None,
            uid,
            name: name.to_string(),
            currency: currency.to_string(),
        })
    }

    pub fn with_id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Unsupported currency code: {0:?}")]
    UnsupportedCurrency(String),
    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(f64),
    #[error("Longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
    #[error("UTC offset out of range: {0} minutes")]
    InvalidUtcOffset(i32),
}
