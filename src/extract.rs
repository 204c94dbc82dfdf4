// CSV batch producer
//
// Thin adapter over the csv crate: reads one or more semicolon-delimited
// exports into a single raw batch. A missing or unreadable file is skipped
// with a warning so one bad export does not sink the rest of the run.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::Result;
use crate::record::{RawBatch, RawRecord};

/// Read all given exports into one batch. The batch schema is the union of
/// the files' headers; files that do not exist or fail to parse are skipped.
pub fn extract_batch(paths: &[PathBuf]) -> Result<RawBatch> {
    let mut batch = RawBatch::default();

    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "input file not found, skipping");
            continue;
        }
        match extract_file(path, &mut batch) {
            Ok(count) => info!(path = %path.display(), records = count, "extracted"),
            Err(e) => error!(path = %path.display(), error = %e, "extraction failed, skipping file"),
        }
    }

    info!(records = batch.len(), "extraction phase complete");
    Ok(batch)
}

fn extract_file(path: &Path, batch: &mut RawBatch) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    for header in &headers {
        batch.add_field(header);
    }

    let mut count = 0;
    for row in reader.records() {
        let row = row?;
        let mut record = RawRecord::new();
        for (field, value) in headers.iter().zip(row.iter()) {
            record.set(field, value);
        }
        batch.records.push(record);
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FIELD_CURRENCY, FIELD_PASSENGER_ID};
    use std::io::Write;

    fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn semicolon_exports_load() {
        let path = write_temp_csv(
            "booking_warehouse_extract_test.csv",
            "passenger_id;currency\nP1;USD\nP2;EUR\n",
        );

        let batch = extract_batch(&[path.clone()]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(batch.len(), 2);
        assert!(batch.has_field(FIELD_PASSENGER_ID));
        assert!(batch.has_field(FIELD_CURRENCY));
        assert_eq!(batch.records[0].get(FIELD_PASSENGER_ID), Some("P1"));
        assert_eq!(batch.records[1].get(FIELD_CURRENCY), Some("EUR"));
    }

    #[test]
    fn missing_files_are_skipped() {
        let missing = PathBuf::from("/nonexistent/bookings.csv");
        let batch = extract_batch(&[missing]).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn batches_concatenate_across_files() {
        let a = write_temp_csv(
            "booking_warehouse_extract_a.csv",
            "passenger_id;currency\nP1;USD\n",
        );
        let b = write_temp_csv(
            "booking_warehouse_extract_b.csv",
            "passenger_id;currency\nP2;EUR\n",
        );

        let batch = extract_batch(&[a.clone(), b.clone()]).unwrap();
        std::fs::remove_file(&a).ok();
        std::fs::remove_file(&b).ok();

        assert_eq!(batch.len(), 2);
    }
}
