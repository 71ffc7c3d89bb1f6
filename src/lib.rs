//! Pulls time-series samples out of a Prometheus-compatible endpoint into
//! caller-owned, fixed-capacity buffers.
//!
//! The safe API lives in [`query`] and [`scrape`]; [`ffi`] exposes the same
//! operations over the C ABI with a `-1` error sentinel.

pub mod client;
pub mod config;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod marshal;
pub mod metrics;
pub mod models;
pub mod query;
pub mod readable;
pub mod scrape;
pub mod selector;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use error::{AdapterError, Result, ERROR_SENTINEL};
pub use models::{ReadBatch, Sample, ScrapedSample, Series, SeriesKey};
pub use query::{query, query_range, query_specs};
pub use readable::{PrometheusReadable, QueryCursor};
pub use scrape::{scrape, ScrapeStream};
