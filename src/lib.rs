// Booking Warehouse - Core Library
// Transform-and-load pipeline: heterogeneous CSV booking exports into a
// star-schema warehouse (five dimensions, one fact table).

pub mod dimension;
pub mod error;
pub mod extract;
pub mod facts;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod transform;
pub mod warehouse;

// Re-export commonly used types
pub use dimension::{ensure_and_resolve, Dimension, DimensionMap, DimensionMaps, DimensionReport};
pub use error::{EtlError, Result};
pub use extract::extract_batch;
pub use facts::{load_facts, FactReport};
pub use normalize::{
    clean_age, clean_gender, clean_price, coerce_nonnegative_int, default_if_missing,
    parse_booking_timestamp, Gender,
};
pub use pipeline::{Phase, Pipeline, RunSummary};
pub use record::{CleanRecord, RawBatch, RawRecord};
pub use transform::{transform_batch, TransformReport};
pub use warehouse::{count_rows, open_warehouse, setup_warehouse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
