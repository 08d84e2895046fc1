use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::{AccountId, LedgerError};
use super::category::{CategoryId, CategoryType};
use super::money::Money;
use super::tag::TagId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    ModifyBalance,
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    /// The category bucket for this type; balance modifications have none.
    pub fn category_type(self) -> Option<CategoryType> {
        match self {
            TransactionType::ModifyBalance => None,
            TransactionType::Income => Some(CategoryType::Income),
            TransactionType::Expense => Some(CategoryType::Expense),
            TransactionType::Transfer => Some(CategoryType::Transfer),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::ModifyBalance => write!(f, "modify_balance"),
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
            TransactionType::Transfer => write!(f, "transfer"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modify_balance" => Ok(TransactionType::ModifyBalance),
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LedgerError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LedgerError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LedgerError::LongitudeOutOfRange(longitude));
        }
        Ok(GeoLocation { latitude, longitude })
    }
}

/// An account as referenced by one side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Option<AccountId>,
    pub name: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Option<CategoryId>,
    pub parent_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Option<TagId>,
    pub name: String,
}

/// A fully resolved transaction produced by an import, independent of the
/// file format it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTransaction {
    pub transaction_type: TransactionType,
    pub time: DateTime<FixedOffset>,
    /// Source account; for transfers the account money leaves.
    pub account: AccountRef,
    pub amount: Money,
    /// Destination account, transfers only.
    pub related_account: Option<AccountRef>,
    pub related_amount: Option<Money>,
    /// `None` for uncategorised rows such as balance modifications.
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub geo_location: Option<GeoLocation>,
    pub comment: String,
}

impl ImportedTransaction {
    pub fn is_transfer(&self) -> bool {
        self.transaction_type == TransactionType::Transfer
    }

    pub fn unix_time(&self) -> i64 {
        self.time.timestamp()
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.time.offset().local_minus_utc() / 60
    }
}
