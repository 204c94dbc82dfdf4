// Record types: raw source rows and their cleaned, typed counterparts

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::normalize::Gender;

// ============================================================================
// FIELD VOCABULARY
// ============================================================================

pub const FIELD_PASSENGER_ID: &str = "passenger_id";
pub const FIELD_PASSENGER_GENDER: &str = "passenger_gender";
pub const FIELD_PASSENGER_AGE: &str = "passenger_age";
pub const FIELD_PASSENGER_NATIONALITY: &str = "passenger_nationality";
pub const FIELD_BOOKING_DATETIME: &str = "booking_datetime";
pub const FIELD_TICKET_PRICE: &str = "ticket_price";
pub const FIELD_TICKET_PRICE_USD_EST: &str = "ticket_price_usd_est";
pub const FIELD_SALES_CHANNEL: &str = "sales_channel";
pub const FIELD_PAYMENT_METHOD: &str = "payment_method";
pub const FIELD_CURRENCY: &str = "currency";
pub const FIELD_BAGS_TOTAL: &str = "bags_total";
pub const FIELD_BAGS_CHECKED: &str = "bags_checked";

/// Columns the transform itself touches; these must be present in the batch
/// schema. Individual values may still be empty per record; only a
/// structurally absent column is fatal. `payment_method` and `currency` are
/// deliberately not listed: an export without them still transforms, and the
/// affected records drop at fact time as unresolved foreign keys.
pub const REQUIRED_FIELDS: [&str; 10] = [
    FIELD_PASSENGER_ID,
    FIELD_PASSENGER_GENDER,
    FIELD_PASSENGER_AGE,
    FIELD_PASSENGER_NATIONALITY,
    FIELD_BOOKING_DATETIME,
    FIELD_TICKET_PRICE,
    FIELD_TICKET_PRICE_USD_EST,
    FIELD_SALES_CHANNEL,
    FIELD_BAGS_TOTAL,
    FIELD_BAGS_CHECKED,
];

/// Canonical text encoding for booking timestamps, used both as the
/// `dim_time` natural key and for logging.
pub const TIMESTAMP_ENCODING: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// RAW RECORDS
// ============================================================================

/// One source row: field name → raw string, exactly as exported.
///
/// Empty and whitespace-only cells are treated as missing, matching how the
/// upstream exports encode absent values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Get a field value, trimmed. Missing or blank cells yield `None`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// A batch of raw records plus the union of column names seen across the
/// source files. The schema travels with the batch so the transformer can
/// distinguish "column never exported" from "cell empty in this row".
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub fields: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawBatch {
    /// Build a batch from loose records, deriving the schema from the union
    /// of their field names. Used by tests and non-CSV producers; the CSV
    /// extractor derives the schema from headers instead.
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for record in &records {
            for field in record.fields.keys() {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
        }
        fields.sort();
        Self { fields, records }
    }

    pub fn add_field(&mut self, field: &str) {
        if !self.fields.iter().any(|f| f == field) {
            self.fields.push(field.to_string());
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// CLEAN RECORDS
// ============================================================================

/// A fully normalized booking, ready for dimension resolution.
///
/// `payment_method` and `currency` stay optional: there is no documented
/// default for them, so a missing value simply fails foreign-key resolution
/// later and drops the fact row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanRecord {
    pub passenger_id: String,
    pub gender: Gender,
    pub age: u8,
    pub nationality: String,
    pub booking_datetime: NaiveDateTime,
    pub ticket_price: f64,
    pub ticket_price_usd_est: f64,
    pub sales_channel: String,
    pub payment_method: Option<String>,
    pub currency: Option<String>,
    pub bags_total: u32,
    pub bags_checked: u32,
}

impl CleanRecord {
    /// Natural key for the time dimension: second-precision canonical text.
    pub fn time_key(&self) -> String {
        self.booking_datetime.format(TIMESTAMP_ENCODING).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_read_as_missing() {
        let mut record = RawRecord::new();
        record.set(FIELD_PASSENGER_ID, "P1");
        record.set(FIELD_CURRENCY, "   ");
        record.set(FIELD_PAYMENT_METHOD, "");

        assert_eq!(record.get(FIELD_PASSENGER_ID), Some("P1"));
        assert_eq!(record.get(FIELD_CURRENCY), None);
        assert_eq!(record.get(FIELD_PAYMENT_METHOD), None);
        assert_eq!(record.get(FIELD_SALES_CHANNEL), None);
        assert!(record.has_field(FIELD_CURRENCY));
        assert!(!record.has_field(FIELD_SALES_CHANNEL));
    }

    #[test]
    fn batch_schema_is_union_of_record_fields() {
        let mut a = RawRecord::new();
        a.set(FIELD_PASSENGER_ID, "P1");
        let mut b = RawRecord::new();
        b.set(FIELD_CURRENCY, "USD");

        let batch = RawBatch::from_records(vec![a, b]);
        assert!(batch.has_field(FIELD_PASSENGER_ID));
        assert!(batch.has_field(FIELD_CURRENCY));
        assert!(!batch.has_field(FIELD_BAGS_TOTAL));
        assert_eq!(batch.len(), 2);
    }
}
