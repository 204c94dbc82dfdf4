// Field normalizer: pure per-field cleaning functions
//
// Every function here is deterministic and never panics. Invalid input
// degrades to a documented sentinel plus a warning in the log stream;
// nothing at this layer can abort a batch.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    /// Missing or unrecognized input.
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Unspecified => "X",
        }
    }
}

/// Normalize raw gender values. Case-insensitive: `M`/`MASCULINO` → M,
/// `F`/`FEMENINO` → F, anything else (including missing) → X.
pub fn clean_gender(raw: Option<&str>) -> Gender {
    let Some(raw) = raw else {
        return Gender::Unspecified;
    };
    match raw.trim().to_uppercase().as_str() {
        "M" | "MASCULINO" => Gender::Male,
        "F" | "FEMENINO" => Gender::Female,
        _ => Gender::Unspecified,
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Formats seen in the known exports, probed in order. Day-first with 24h
/// time, US-style with AM/PM, day-first with seconds.
const EXPLICIT_FORMATS: [&str; 3] = [
    "%d/%m/%Y %H:%M",
    "%m-%d-%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S",
];

/// Lenient fallbacks for exports that already ship ISO-ish timestamps.
const FALLBACK_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a booking timestamp, trying each known format in order. `None`
/// signals the caller to drop the record — an unparseable timestamp is the
/// one field defect a booking cannot recover from.
pub fn parse_booking_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    for format in EXPLICIT_FORMATS.iter().chain(FALLBACK_FORMATS.iter()) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    // Date-only input lands at midnight.
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    warn!(value = raw, "unparseable booking timestamp");
    None
}

// ============================================================================
// NUMERIC FIELDS
// ============================================================================

/// Clean a price string: trim, decimal-comma → decimal-point, parse as a
/// non-negative decimal. Unparseable, missing, or negative input → 0.0.
pub fn clean_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let cleaned = raw.trim().replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(price) if price >= 0.0 && price.is_finite() => price,
        Ok(_) => {
            warn!(value = raw, "negative or non-finite price, using 0.0");
            0.0
        }
        Err(_) => {
            warn!(value = raw, "unparseable price, using 0.0");
            0.0
        }
    }
}

/// Validate an age. Valid range is [0, 120] inclusive; anything else
/// (including non-numeric input) is unknown.
pub fn clean_age(raw: Option<&str>) -> Option<u8> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(age) if (0..=120).contains(&age) => Some(age as u8),
        Ok(age) => {
            warn!(age, "age out of range");
            None
        }
        Err(_) => {
            warn!(value = raw, "unparseable age");
            None
        }
    }
}

/// Coerce a count field to a non-negative integer; unparseable or negative
/// input → 0. Float-formatted counts like "2.0" truncate, since some
/// exports ship integer columns re-encoded as decimals. Used for bag
/// counts.
pub fn coerce_nonnegative_int(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 0;
    };
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(count) if count.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&count) => {
            count.trunc() as u32
        }
        Ok(count) => {
            warn!(count, "count out of range, using 0");
            0
        }
        Err(_) => {
            warn!(value = raw, "unparseable count, using 0");
            0
        }
    }
}

// ============================================================================
// DEFAULTS
// ============================================================================

/// Return the trimmed value, or `fallback` when missing/blank. Used for
/// nationality ("UNKNOWN") and sales channel ("OTHER").
pub fn default_if_missing(raw: Option<&str>, fallback: &str) -> String {
    match raw {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => fallback.to_string(),
    }
}
