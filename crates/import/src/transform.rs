//! Per-vendor row rewriting applied after semantic projection.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{ImportError, ImportResult};
use crate::table::{SemanticColumn, SemanticRow};

type TransformFn = dyn Fn(&mut SemanticRow) -> ImportResult<bool>;

/// A strategy that rewrites a projected row in place.
///
/// Returning `Ok(false)` marks the row invalid so it is skipped. `adds`
/// lists the columns the transform synthesizes, which the semantic table
/// then reports as present even if the file lacks them.
pub struct RowTransform {
    adds: Vec<SemanticColumn>,
    apply: Box<TransformFn>,
}

impl RowTransform {
    pub fn new<F>(adds: Vec<SemanticColumn>, apply: F) -> Self
    where
        F: Fn(&mut SemanticRow) -> ImportResult<bool> + 'static,
    {
        Self {
            adds,
            apply: Box::new(apply),
        }
    }

    /// Runs each transform in order, stopping at the first one that
    /// invalidates the row.
    pub fn chain(transforms: Vec<RowTransform>) -> Self {
        let adds = transforms.iter().flat_map(|t| t.adds.iter().copied()).collect();
        Self::new(adds, move |row| {
            for transform in &transforms {
                if !transform.apply(row)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    pub fn adds(&self, column: SemanticColumn) -> bool {
        self.adds.contains(&column)
    }

    pub fn apply(&self, row: &mut SemanticRow) -> ImportResult<bool> {
        (self.apply)(row)
    }
}

/// Removes a digit-grouping symbol from the given numeric columns.
pub fn strip_thousands_separator(columns: Vec<SemanticColumn>, separator: char) -> RowTransform {
    RowTransform::new(Vec::new(), move |row| {
        for column in &columns {
            if row.has(*column) && row.get(*column).contains(separator) {
                let stripped = row.get(*column).replace(separator, "");
                row.set(*column, stripped);
            }
        }
        Ok(true)
    })
}

/// Type tokens for balance-adjustment sign inference.
#[derive(Debug, Clone)]
pub struct BalanceAdjustment {
    /// "Balance was set" on an asset account.
    pub asset_token: String,
    /// "Outstanding balance was set" on a liability account; the sign rule
    /// is inverted.
    pub liability_token: String,
    pub income_token: String,
    pub expense_token: String,
}

/// Rewrites balance adjustments into income or expense rows with a
/// non-negative amount.
///
/// Asset adjustments: amount >= 0 is income, amount < 0 is expense with
/// the amount negated. Liability adjustments mirror that.
pub fn infer_balance_adjustment(tokens: BalanceAdjustment) -> RowTransform {
    RowTransform::new(vec![SemanticColumn::Type], move |row| {
        let kind = row.get(SemanticColumn::Type);
        let inverted = if kind == tokens.asset_token {
            false
        } else if kind == tokens.liability_token {
            true
        } else {
            return Ok(true);
        };

        let text = row.get(SemanticColumn::Amount);
        let amount = Decimal::from_str(text).map_err(|_| ImportError::InvalidAmount {
            row: row.row_id().to_string(),
            value: text.to_string(),
        })?;

        let negative = amount.is_sign_negative() && !amount.is_zero();
        let token = match (negative, inverted) {
            (false, false) | (true, true) => &tokens.income_token,
            (true, false) | (false, true) => &tokens.expense_token,
        };
        row.set(SemanticColumn::Type, token.clone());
        if negative {
            row.set(SemanticColumn::Amount, (-amount).to_string());
        }
        Ok(true)
    })
}

fn re_datetime() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
            .expect("invalid regex")
    })
}

/// Canonical textual time produced by [`normalize_datetime`].
pub const CANONICAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Normalizes `date time`, `date hh:mm` and `date` dialects to
/// [`CANONICAL_TIME_FORMAT`]; a bare date means midnight.
pub fn normalize_datetime(column: SemanticColumn) -> RowTransform {
    RowTransform::new(Vec::new(), move |row| {
        let text = row.get(column);
        if text.is_empty() {
            return Ok(true);
        }
        let normalized = parse_datetime_dialect(text).ok_or_else(|| ImportError::InvalidTime {
            row: row.row_id().to_string(),
            value: text.to_string(),
        })?;
        row.set(column, normalized);
        Ok(true)
    })
}

fn parse_datetime_dialect(text: &str) -> Option<String> {
    let caps = re_datetime().captures(text)?;
    let number = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    let time = date.and_hms_opt(number(4)?, number(5)?, number(6)?)?;
    Some(time.format(CANONICAL_TIME_FORMAT).to_string())
}
