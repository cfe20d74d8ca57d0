/// Data layer: core types, loading, cleaning and reduction.
///
/// Architecture:
/// ```text
///   uploaded .csv bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop empty columns, coerce, drop incomplete rows → CleanedTable
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐  ┌───────────┐
///   │  stats    │  │ aggregate  │  group-by reductions, box summaries
///   └──────────┘  └───────────┘
/// ```

pub mod aggregate;
pub mod clean;
pub mod loader;
pub mod model;
pub mod stats;
