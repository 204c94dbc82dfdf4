// Record transformer: raw batch → typed, deduplicated, cleaned batch
//
// Policy summary: the booking timestamp is the only record-fatal field;
// every other defect degrades to a default. Source-level duplicates on
// (passenger_id, booking_datetime) are dropped, first occurrence wins.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::normalize::{
    clean_age, clean_gender, clean_price, coerce_nonnegative_int, default_if_missing,
    parse_booking_timestamp,
};
use crate::record::{
    CleanRecord, RawBatch, FIELD_BAGS_CHECKED, FIELD_BAGS_TOTAL, FIELD_BOOKING_DATETIME,
    FIELD_CURRENCY, FIELD_PASSENGER_AGE, FIELD_PASSENGER_GENDER, FIELD_PASSENGER_ID,
    FIELD_PASSENGER_NATIONALITY, FIELD_PAYMENT_METHOD, FIELD_SALES_CHANNEL, FIELD_TICKET_PRICE,
    FIELD_TICKET_PRICE_USD_EST, REQUIRED_FIELDS,
};

pub const DEFAULT_NATIONALITY: &str = "UNKNOWN";
pub const DEFAULT_SALES_CHANNEL: &str = "OTHER";

/// Outcome of one transform pass over a batch.
#[derive(Debug, Default, Serialize)]
pub struct TransformReport {
    /// Records that survived normalization, in source order.
    #[serde(skip)]
    pub records: Vec<CleanRecord>,
    /// Records dropped for an unrecoverable defect (bad timestamp, no
    /// passenger id).
    pub dropped: usize,
    /// Records dropped as source-level duplicates.
    pub duplicates: usize,
}

/// Transform a raw batch. Fails only on a structural defect: a required
/// column absent from the whole batch schema. Per-record failures never
/// abort the pass.
pub fn transform_batch(batch: &RawBatch) -> Result<TransformReport> {
    for field in REQUIRED_FIELDS {
        if !batch.has_field(field) {
            return Err(EtlError::Schema { field });
        }
    }

    let mut report = TransformReport::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for raw in &batch.records {
        // The passenger id is both the dedup key and the passenger natural
        // key; a record without one cannot be loaded.
        let Some(passenger_id) = raw.get(FIELD_PASSENGER_ID) else {
            warn!("dropping record with no passenger_id");
            report.dropped += 1;
            continue;
        };
        let passenger_id = passenger_id.to_string();

        let raw_datetime = raw.get(FIELD_BOOKING_DATETIME).unwrap_or_default();
        if !seen.insert((passenger_id.clone(), raw_datetime.to_string())) {
            report.duplicates += 1;
            continue;
        }

        let gender = clean_gender(raw.get(FIELD_PASSENGER_GENDER));

        let Some(booking_datetime) = parse_booking_timestamp(raw.get(FIELD_BOOKING_DATETIME))
        else {
            warn!(
                passenger_id = %passenger_id,
                value = raw_datetime,
                "dropping record with unparseable booking timestamp"
            );
            report.dropped += 1;
            continue;
        };

        let ticket_price = clean_price(raw.get(FIELD_TICKET_PRICE));
        let ticket_price_usd_est = clean_price(raw.get(FIELD_TICKET_PRICE_USD_EST));

        // TODO: unknown ages collapse to 0 here, indistinguishable from a
        // real zero-year-old passenger. Fixing this needs a nullable age
        // column in dim_passenger and a coordinated change with the
        // warehouse consumers.
        let age = clean_age(raw.get(FIELD_PASSENGER_AGE)).unwrap_or(0);

        report.records.push(CleanRecord {
            passenger_id,
            gender,
            age,
            nationality: default_if_missing(
                raw.get(FIELD_PASSENGER_NATIONALITY),
                DEFAULT_NATIONALITY,
            ),
            booking_datetime,
            ticket_price,
            ticket_price_usd_est,
            sales_channel: default_if_missing(
                raw.get(FIELD_SALES_CHANNEL),
                DEFAULT_SALES_CHANNEL,
            ),
            payment_method: raw.get(FIELD_PAYMENT_METHOD).map(str::to_string),
            currency: raw.get(FIELD_CURRENCY).map(str::to_string),
            bags_total: coerce_nonnegative_int(raw.get(FIELD_BAGS_TOTAL)),
            bags_checked: coerce_nonnegative_int(raw.get(FIELD_BAGS_CHECKED)),
        });
    }

    info!(
        retained = report.records.len(),
        dropped = report.dropped,
        duplicates = report.duplicates,
        "transformation complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Gender;
    use crate::record::RawRecord;

    fn full_record(passenger_id: &str, datetime: &str) -> RawRecord {
        let mut record = RawRecord::new();
        record.set(FIELD_PASSENGER_ID, passenger_id);
        record.set(FIELD_PASSENGER_GENDER, "M");
        record.set(FIELD_PASSENGER_AGE, "30");
        record.set(FIELD_PASSENGER_NATIONALITY, "GT");
        record.set(FIELD_BOOKING_DATETIME, datetime);
        record.set(FIELD_TICKET_PRICE, "100,50");
        record.set(FIELD_TICKET_PRICE_USD_EST, "12,90");
        record.set(FIELD_SALES_CHANNEL, "WEB");
        record.set(FIELD_PAYMENT_METHOD, "CARD");
        record.set(FIELD_CURRENCY, "USD");
        record.set(FIELD_BAGS_TOTAL, "2");
        record.set(FIELD_BAGS_CHECKED, "1");
        record
    }

    #[test]
    fn clean_record_is_fully_typed() {
        let batch = RawBatch::from_records(vec![full_record("P1", "25/12/2023 14:30")]);
        let report = transform_batch(&batch).unwrap();

        assert_eq!(report.records.len(), 1);
        let rec = &report.records[0];
        assert_eq!(rec.passenger_id, "P1");
        assert_eq!(rec.gender, Gender::Male);
        assert_eq!(rec.age, 30);
        assert_eq!(rec.ticket_price, 100.50);
        assert_eq!(rec.ticket_price_usd_est, 12.90);
        assert_eq!(rec.time_key(), "2023-12-25 14:30:00");
        assert_eq!(rec.bags_total, 2);
        assert_eq!(rec.bags_checked, 1);
    }

    #[test]
    fn duplicates_first_occurrence_wins() {
        let mut first = full_record("P1", "25/12/2023 14:30");
        first.set(FIELD_TICKET_PRICE, "100,00");
        let mut second = full_record("P1", "25/12/2023 14:30");
        second.set(FIELD_TICKET_PRICE, "999,00");
        let distinct = full_record("P1", "26/12/2023 09:00");

        let batch = RawBatch::from_records(vec![first, second, distinct]);
        let report = transform_batch(&batch).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.records[0].ticket_price, 100.00);
    }

    #[test]
    fn bad_timestamp_drops_only_that_record() {
        let good = full_record("P1", "25/12/2023 14:30");
        let mut bad = full_record("P2", "25/12/2023 14:30");
        bad.set(FIELD_BOOKING_DATETIME, "not a date");

        let batch = RawBatch::from_records(vec![good, bad]);
        let report = transform_batch(&batch).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.records[0].passenger_id, "P1");
    }

    #[test]
    fn other_defects_degrade_to_defaults() {
        let mut record = full_record("P1", "25/12/2023 14:30");
        record.set(FIELD_PASSENGER_GENDER, "???");
        record.set(FIELD_PASSENGER_AGE, "200");
        record.set(FIELD_PASSENGER_NATIONALITY, "");
        record.set(FIELD_SALES_CHANNEL, "");
        record.set(FIELD_TICKET_PRICE, "garbage");
        record.set(FIELD_BAGS_TOTAL, "-1");

        let batch = RawBatch::from_records(vec![record]);
        let report = transform_batch(&batch).unwrap();

        assert_eq!(report.dropped, 0);
        let rec = &report.records[0];
        assert_eq!(rec.gender, Gender::Unspecified);
        assert_eq!(rec.age, 0);
        assert_eq!(rec.nationality, DEFAULT_NATIONALITY);
        assert_eq!(rec.sales_channel, DEFAULT_SALES_CHANNEL);
        assert_eq!(rec.ticket_price, 0.0);
        assert_eq!(rec.bags_total, 0);
    }

    #[test]
    fn missing_required_column_aborts() {
        let record = full_record("P1", "25/12/2023 14:30");
        // Rebuild without the ticket_price column entirely.
        let mut rebuilt = RawRecord::new();
        for field in REQUIRED_FIELDS {
            if field != FIELD_TICKET_PRICE {
                if let Some(value) = record.get(field) {
                    rebuilt.set(field, value);
                }
            }
        }

        let batch = RawBatch::from_records(vec![rebuilt]);
        let err = transform_batch(&batch).unwrap_err();
        assert!(matches!(err, EtlError::Schema { field: FIELD_TICKET_PRICE }));
    }

    #[test]
    fn absent_payment_and_currency_columns_still_transform() {
        // Exports that never carry payment_method or currency are valid
        // input; the records survive transform with those values missing
        // and only fail foreign-key resolution later.
        let record = full_record("P1", "25/12/2023 14:30");
        let mut rebuilt = RawRecord::new();
        for field in REQUIRED_FIELDS {
            if let Some(value) = record.get(field) {
                rebuilt.set(field, value);
            }
        }

        let batch = RawBatch::from_records(vec![rebuilt]);
        let report = transform_batch(&batch).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].payment_method, None);
        assert_eq!(report.records[0].currency, None);
    }
}
