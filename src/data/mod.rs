/// Data layer: core series types, segment boundaries, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SeriesDataset
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ SeriesDataset  │  Vec<SeriesRecord>, metadata index
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  metadata predicates → background pool
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod segments;

pub use model::{MetadataValue, Series, SeriesDataset, SeriesRecord};
pub use segments::SegmentBoundaries;
