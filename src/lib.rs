//! Column summaries, frequency tables, chart specs, row filters and word
//! cloud text for a single tabular file.
//!
//! ```text
//!   .csv / .parquet / .arrow
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  table    │  load with polars → typed columns, normalized headers
//!   └──────────┘
//!        │
//!        ├──────────────► summary      top values / descriptive stats
//!        ├──────────────► frequency ─► chart   Bar | Pie | Line spec
//!        └──────────────► filter ────► text    word cloud document
//! ```
//!
//! [`report::Report`] runs all of it for one [`report::Request`].

pub mod chart;
pub mod domain;
pub mod filter;
pub mod frequency;
pub mod report;
pub mod summary;
pub mod table;
pub mod text;
