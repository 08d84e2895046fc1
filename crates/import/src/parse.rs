//! Cell-value parsers used by the canonical importer.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use ledgerport_core::{GeoLocation, Money};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::options::GeoOrder;

macro_rules! re {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pattern).expect("invalid regex"))
        }
    };
}

re!(re_timezone, r"^([+-])(\d{2}):?(\d{2})$");

/// Parses an amount honoring the dialect's separators. At most two
/// fractional digits are accepted.
pub fn parse_amount(s: &str, decimal_separator: char, digit_grouping: Option<char>) -> Option<Money> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut text = match digit_grouping {
        Some(grouping) => s.replace(grouping, ""),
        None => s.to_string(),
    };
    if decimal_separator != '.' {
        if text.contains('.') {
            return None;
        }
        text = text.replace(decimal_separator, ".");
    }
    let decimal = Decimal::from_str(&text).ok()?;
    Money::try_from_decimal(decimal)
}

/// `+08:00`, `-0530` or `Z`.
pub fn parse_timezone(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let caps = re_timezone().captures(s)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = (hours * 60 + minutes) * 60;
    match &caps[1] {
        "-" => FixedOffset::west_opt(seconds),
        _ => FixedOffset::east_opt(seconds),
    }
}

/// Parses a wall-clock time in `offset`.
pub fn parse_time(s: &str, format: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), format).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// An empty cell is `Ok(None)`; anything else must hold exactly two
/// in-range coordinates.
pub fn parse_geo_location(
    s: &str,
    separator: char,
    order: GeoOrder,
) -> Result<Option<GeoLocation>, ()> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let parts: Vec<&str> = s
        .split(separator)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    let [first, second] = parts.as_slice() else {
        return Err(());
    };
    let first = f64::from_str(first).map_err(|_| ())?;
    let second = f64::from_str(second).map_err(|_| ())?;
    let (latitude, longitude) = match order {
        GeoOrder::LatitudeFirst => (first, second),
        GeoOrder::LongitudeFirst => (second, first),
    };
    GeoLocation::new(latitude, longitude).map(Some).map_err(|_| ())
}

/// Trimmed, non-empty tag names in first-seen order without duplicates.
pub fn split_tags(s: &str, separator: char) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in s.split(separator).map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
