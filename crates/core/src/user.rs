use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::account::LedgerError;
use crate::currency;

/// The calling user's defaults, supplied by whoever starts an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub uid: i64,
    pub default_currency: String,
    /// Offset from UTC applied to times that carry no timezone of their own.
    pub utc_offset_minutes: i32,
}

impl UserContext {
    pub fn new(uid: i64, default_currency: &str, utc_offset_minutes: i32) -> Result<Self, LedgerError> {
        currency::validate(default_currency)?;
        if offset_from_minutes(utc_offset_minutes).is_none() {
            return Err(LedgerError::InvalidUtcOffset(utc_offset_minutes));
        }
        Ok(UserContext {
            uid,
            default_currency: default_currency.to_string(),
            utc_offset_minutes,
        })
    }

    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}
