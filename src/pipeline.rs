// Pipeline orchestrator: extraction → transform → dimension loads → facts
//
// Forward-only phase machine. Each dimension load commits independently, so
// one failed dimension degrades the fact phase (more unresolved keys) rather
// than aborting the run. Structural defects and an empty post-transform
// batch are terminal.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info};

use crate::dimension::{ensure_and_resolve, Dimension, DimensionMaps};
use crate::error::{EtlError, Result};
use crate::facts::load_facts;
use crate::record::RawBatch;
use crate::transform::transform_batch;

// ============================================================================
// PHASES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Extracted,
    Transformed,
    DimensionsLoaded,
    FactsLoaded,
    Done,
    Failed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Extracted => "EXTRACTED",
            Phase::Transformed => "TRANSFORMED",
            Phase::DimensionsLoaded => "DIMENSIONS_LOADED",
            Phase::FactsLoaded => "FACTS_LOADED",
            Phase::Done => "DONE",
            Phase::Failed => "FAILED",
        }
    }
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

/// Aggregate counts for one pipeline run. Record-level drops are counted
/// here but only itemized in the log stream; they never fail the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub extracted: usize,
    pub retained: usize,
    pub duplicates_dropped: usize,
    pub transform_dropped: usize,
    pub dimension_inserts: BTreeMap<String, usize>,
    pub facts_inserted: usize,
    pub facts_dropped: usize,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Owns the warehouse connection for the duration of one run. The
/// connection is released on every exit path when the pipeline drops.
pub struct Pipeline {
    conn: Connection,
    phase: Phase,
}

impl Pipeline {
    pub fn new(conn: Connection) -> Self {
        Pipeline {
            conn,
            phase: Phase::Extracted,
        }
    }

    /// Run the full transform-and-load sequence over an extracted batch.
    /// Consumes the pipeline; success yields the run summary.
    pub fn run(mut self, batch: RawBatch) -> Result<RunSummary> {
        match self.execute(batch) {
            Ok(summary) => {
                self.phase = Phase::Done;
                info!(phase = self.phase.name(), "pipeline complete");
                Ok(summary)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                error!(phase = self.phase.name(), error = %e, "pipeline failed");
                Err(e)
            }
        }
    }

    fn execute(&mut self, batch: RawBatch) -> Result<RunSummary> {
        let mut summary = RunSummary {
            extracted: batch.len(),
            ..RunSummary::default()
        };
        self.advance(Phase::Extracted);

        if batch.is_empty() {
            return Err(EtlError::EmptyDataset);
        }

        let report = transform_batch(&batch)?;
        if report.records.is_empty() {
            return Err(EtlError::EmptyDataset);
        }
        summary.retained = report.records.len();
        summary.duplicates_dropped = report.duplicates;
        summary.transform_dropped = report.dropped;
        self.advance(Phase::Transformed);

        let mut maps = DimensionMaps::default();
        for dimension in Dimension::ALL {
            match ensure_and_resolve(&mut self.conn, dimension, &report.records) {
                Ok((map, dim_report)) => {
                    summary
                        .dimension_inserts
                        .insert(dimension.name().to_string(), dim_report.inserted);
                    maps.set(dimension, map);
                }
                // One failed dimension load only costs its keys; the fact
                // phase drops the affected records.
                Err(e) => {
                    error!(
                        dimension = dimension.name(),
                        error = %e,
                        "dimension load failed, continuing with remaining dimensions"
                    );
                    summary
                        .dimension_inserts
                        .insert(dimension.name().to_string(), 0);
                }
            }
        }
        self.advance(Phase::DimensionsLoaded);

        let fact_report = load_facts(&mut self.conn, &report.records, &maps)?;
        summary.facts_inserted = fact_report.inserted;
        summary.facts_dropped = fact_report.dropped;
        self.advance(Phase::FactsLoaded);

        Ok(summary)
    }

    fn advance(&mut self, phase: Phase) {
        self.phase = phase;
        info!(phase = phase.name(), "phase reached");
    }
}
