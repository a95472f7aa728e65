/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .parquet / .csv / .json  (one file per year)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + normalize → ExportDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ ExportDataset │  Vec<ExportRecord>, selector domains
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec predicates → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  rankings, hierarchy, flows
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  query    │  one call → QueryOutcome
///   └──────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod query;
