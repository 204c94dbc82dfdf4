// Dimension resolver: get-or-create by natural key, then surrogate lookup
//
// Natural-key collision is the expected steady state on re-runs, so inserts
// use ON CONFLICT DO NOTHING rather than check-then-insert (which would race
// if concurrent writers are ever introduced). Each dimension commits as one
// unit; unexpected commit-level errors roll the dimension's batch back.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Timelike};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::record::CleanRecord;

// ============================================================================
// DIMENSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Passenger,
    Time,
    SalesChannel,
    PaymentMethod,
    Currency,
}

impl Dimension {
    /// Load order for a full run. Order is irrelevant for correctness
    /// (dimensions are independent) but kept stable for reporting.
    pub const ALL: [Dimension; 5] = [
        Dimension::Passenger,
        Dimension::Time,
        Dimension::SalesChannel,
        Dimension::PaymentMethod,
        Dimension::Currency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Passenger => "passenger",
            Dimension::Time => "time",
            Dimension::SalesChannel => "sales_channel",
            Dimension::PaymentMethod => "payment_method",
            Dimension::Currency => "currency",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Dimension::Passenger => "dim_passenger",
            Dimension::Time => "dim_time",
            Dimension::SalesChannel => "dim_sales_channel",
            Dimension::PaymentMethod => "dim_payment_method",
            Dimension::Currency => "dim_currency",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            Dimension::Passenger => "passenger_id",
            Dimension::Time => "booking_datetime",
            Dimension::SalesChannel => "channel",
            Dimension::PaymentMethod => "method",
            Dimension::Currency => "currency",
        }
    }

    /// Natural key of `record` for this dimension. `None` means the record
    /// carries no value (possible only for the open-vocabulary dimensions
    /// without a default); such records fail fact resolution later.
    pub fn natural_key(&self, record: &CleanRecord) -> Option<String> {
        match self {
            Dimension::Passenger => Some(record.passenger_id.clone()),
            Dimension::Time => Some(record.time_key()),
            Dimension::SalesChannel => Some(record.sales_channel.clone()),
            Dimension::PaymentMethod => record.payment_method.clone(),
            Dimension::Currency => record.currency.clone(),
        }
    }
}

/// natural key → surrogate id, for one dimension. Keys that failed to
/// resolve are simply absent.
pub type DimensionMap = HashMap<String, i64>;

/// The five per-dimension lookup maps a fact load joins against.
#[derive(Debug, Default)]
pub struct DimensionMaps {
    pub passenger: DimensionMap,
    pub time: DimensionMap,
    pub sales_channel: DimensionMap,
    pub payment_method: DimensionMap,
    pub currency: DimensionMap,
}

impl DimensionMaps {
    pub fn get(&self, dimension: Dimension) -> &DimensionMap {
        match dimension {
            Dimension::Passenger => &self.passenger,
            Dimension::Time => &self.time,
            Dimension::SalesChannel => &self.sales_channel,
            Dimension::PaymentMethod => &self.payment_method,
            Dimension::Currency => &self.currency,
        }
    }

    pub fn set(&mut self, dimension: Dimension, map: DimensionMap) {
        match dimension {
            Dimension::Passenger => self.passenger = map,
            Dimension::Time => self.time = map,
            Dimension::SalesChannel => self.sales_channel = map,
            Dimension::PaymentMethod => self.payment_method = map,
            Dimension::Currency => self.currency = map,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct DimensionReport {
    /// New rows created this run (existing keys count as success-no-op).
    pub inserted: usize,
    /// Keys with no matching row even after the insert pass.
    pub unresolved: usize,
}

// ============================================================================
// ENSURE AND RESOLVE
// ============================================================================

/// Ensure every distinct natural key in the batch has exactly one dimension
/// row, then resolve each key to its surrogate id.
///
/// All inserts for the dimension run inside one transaction. A failed
/// insert for a single key is logged and leaves that key unresolved without
/// aborting the loop; the key then falls out of the returned map.
pub fn ensure_and_resolve(
    conn: &mut Connection,
    dimension: Dimension,
    records: &[CleanRecord],
) -> Result<(DimensionMap, DimensionReport)> {
    // Distinct keys, first occurrence's attributes win. BTreeMap keeps the
    // insert pass deterministic.
    let mut distinct: BTreeMap<String, &CleanRecord> = BTreeMap::new();
    for record in records {
        if let Some(key) = dimension.natural_key(record) {
            distinct.entry(key).or_insert(record);
        }
    }

    let mut report = DimensionReport::default();

    let tx = conn.transaction()?;
    for (key, record) in &distinct {
        match insert_row(&tx, dimension, key, record) {
            Ok(rows) => report.inserted += rows,
            Err(e) => {
                warn!(
                    dimension = dimension.name(),
                    key = %key,
                    error = %e,
                    "dimension insert failed, key left unresolved"
                );
            }
        }
    }
    tx.commit()?;

    let mut map = DimensionMap::with_capacity(distinct.len());
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1",
        dimension.table(),
        dimension.key_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    for key in distinct.keys() {
        let id: Option<i64> = stmt
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => {
                map.insert(key.clone(), id);
            }
            None => {
                warn!(
                    dimension = dimension.name(),
                    key = %key,
                    "natural key unresolved after insert pass"
                );
                report.unresolved += 1;
            }
        }
    }

    info!(
        dimension = dimension.name(),
        distinct = distinct.len(),
        inserted = report.inserted,
        unresolved = report.unresolved,
        "dimension load complete"
    );

    Ok((map, report))
}

fn insert_row(
    conn: &Connection,
    dimension: Dimension,
    key: &str,
    record: &CleanRecord,
) -> rusqlite::Result<usize> {
    match dimension {
        Dimension::Passenger => conn.execute(
            "INSERT INTO dim_passenger (passenger_id, gender, age, nationality)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(passenger_id) DO NOTHING",
            params![
                key,
                record.gender.as_str(),
                record.age,
                record.nationality
            ],
        ),
        Dimension::Time => {
            // Date parts derived once from the parsed timestamp, never
            // re-parsed from text.
            let dt = record.booking_datetime;
            conn.execute(
                "INSERT INTO dim_time (booking_datetime, year, month, day, hour)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(booking_datetime) DO NOTHING",
                params![key, dt.year(), dt.month(), dt.day(), dt.hour()],
            )
        }
        Dimension::SalesChannel => conn.execute(
            "INSERT INTO dim_sales_channel (channel) VALUES (?1)
             ON CONFLICT(channel) DO NOTHING",
            params![key],
        ),
        Dimension::PaymentMethod => conn.execute(
            "INSERT INTO dim_payment_method (method) VALUES (?1)
             ON CONFLICT(method) DO NOTHING",
            params![key],
        ),
        Dimension::Currency => conn.execute(
            "INSERT INTO dim_currency (currency) VALUES (?1)
             ON CONFLICT(currency) DO NOTHING",
            params![key],
        ),
    }
}
