// Fact loader: five-way foreign-key resolution + fact-row construction
//
// A fact row is inserted only when all five dimension lookups succeed.
// Partial resolution drops the record (logged, counted) before any write,
// so a skipped record never leaves half a row behind. The whole load is
// one transaction: commit at the end, or roll everything back.

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{info, warn};

use crate::dimension::{Dimension, DimensionMaps};
use crate::error::Result;
use crate::record::CleanRecord;

#[derive(Debug, Default, Serialize)]
pub struct FactReport {
    pub inserted: usize,
    pub dropped: usize,
}

struct FactRefs {
    passenger: i64,
    time: i64,
    channel: i64,
    payment: i64,
    currency: i64,
}

/// Resolve all five surrogate refs for `record`, or name the first
/// dimension that fails.
fn resolve_refs(record: &CleanRecord, maps: &DimensionMaps) -> Result<FactRefs, &'static str> {
    let mut refs = [0i64; 5];
    for (slot, dimension) in Dimension::ALL.iter().enumerate() {
        let key = dimension.natural_key(record).ok_or(dimension.name())?;
        refs[slot] = *maps.get(*dimension).get(&key).ok_or(dimension.name())?;
    }
    Ok(FactRefs {
        passenger: refs[0],
        time: refs[1],
        channel: refs[2],
        payment: refs[3],
        currency: refs[4],
    })
}

/// Insert one fact row per fully-resolvable record.
pub fn load_facts(
    conn: &mut Connection,
    records: &[CleanRecord],
    maps: &DimensionMaps,
) -> Result<FactReport> {
    let mut report = FactReport::default();

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO fact_sale (
                passenger_ref, time_ref, channel_ref, payment_ref, currency_ref,
                ticket_price, ticket_price_usd_est, bags_total, bags_checked
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for record in records {
            let refs = match resolve_refs(record, maps) {
                Ok(refs) => refs,
                Err(missing) => {
                    warn!(
                        passenger_id = %record.passenger_id,
                        booking_datetime = %record.time_key(),
                        dimension = missing,
                        "skipping fact with unresolved dimension"
                    );
                    report.dropped += 1;
                    continue;
                }
            };

            stmt.execute(params![
                refs.passenger,
                refs.time,
                refs.channel,
                refs.payment,
                refs.currency,
                record.ticket_price,
                record.ticket_price_usd_est,
                record.bags_total,
                record.bags_checked,
            ])?;
            report.inserted += 1;
        }
    }
    tx.commit()?;

    info!(
        inserted = report.inserted,
        dropped = report.dropped,
        "fact load complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::ensure_and_resolve;
    use crate::normalize::Gender;
    use crate::warehouse::{count_rows, setup_warehouse};
    use chrono::NaiveDate;

    fn record(passenger_id: &str, day: u32, currency: Option<&str>) -> CleanRecord {
        CleanRecord {
            passenger_id: passenger_id.to_string(),
            gender: Gender::Male,
            age: 40,
            nationality: "GT".to_string(),
            booking_datetime: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
            ticket_price: 250.75,
            ticket_price_usd_est: 32.1,
            sales_channel: "WEB".to_string(),
            payment_method: Some("CARD".to_string()),
            currency: currency.map(str::to_string),
            bags_total: 2,
            bags_checked: 1,
        }
    }

    fn loaded_maps(conn: &mut Connection, records: &[CleanRecord]) -> DimensionMaps {
        let mut maps = DimensionMaps::default();
        for dimension in Dimension::ALL {
            let (map, _) = ensure_and_resolve(conn, dimension, records).unwrap();
            maps.set(dimension, map);
        }
        maps
    }

    #[test]
    fn fully_resolved_records_insert() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_warehouse(&conn).unwrap();

        let records = vec![record("P1", 10, Some("USD")), record("P2", 11, Some("EUR"))];
        let maps = loaded_maps(&mut conn, &records);

        let report = load_facts(&mut conn, &records, &maps).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(count_rows(&conn, "fact_sale").unwrap(), 2);
    }

    #[test]
    fn unresolved_currency_drops_only_that_record() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_warehouse(&conn).unwrap();

        let records = vec![record("P1", 10, Some("USD")), record("P2", 11, None)];
        let maps = loaded_maps(&mut conn, &records);

        let report = load_facts(&mut conn, &records, &maps).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(count_rows(&conn, "fact_sale").unwrap(), 1);
    }

    #[test]
    fn measures_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_warehouse(&conn).unwrap();

        let records = vec![record("P1", 10, Some("USD"))];
        let maps = loaded_maps(&mut conn, &records);
        load_facts(&mut conn, &records, &maps).unwrap();

        let (price, usd, bags, checked): (f64, f64, i64, i64) = conn
            .query_row(
                "SELECT ticket_price, ticket_price_usd_est, bags_total, bags_checked FROM fact_sale",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(price, 250.75);
        assert_eq!(usd, 32.1);
        assert_eq!(bags, 2);
        assert_eq!(checked, 1);
    }
}
