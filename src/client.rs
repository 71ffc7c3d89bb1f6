use prometheus_http_query::response::{Data, InstantVector, RangeVector};
use prometheus_http_query::Client;
use tokio::runtime::{Handle, Runtime};

use crate::config::ClientConfig;
use crate::models::{Sample, Series};
use crate::{AdapterError, Result};

/// Builds the single-use runtime that drives one blocking call.
///
/// Fails when the calling thread is already driving a tokio runtime, since
/// blocking on a nested runtime would panic.
pub fn runtime() -> Result<Runtime> {
    if Handle::try_current().is_ok() {
        return Err(AdapterError::Runtime("called from within an async runtime".to_string()));
    }
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AdapterError::Runtime(format!("Failed to build tokio runtime: {}", e)))
}

pub fn query_client(config: &ClientConfig) -> Result<Client> {
    let http = config.http_client()?;
    Client::from(http, &config.endpoint).map_err(AdapterError::from)
}

/// API timestamps are float seconds.
pub fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// The query API only accepts whole seconds.
pub fn to_seconds(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

fn sample(s: &prometheus_http_query::response::Sample) -> Sample {
    Sample {
        timestamp: to_millis(s.timestamp()),
        value: s.value(),
    }
}

fn from_range_vector(v: &RangeVector) -> Series {
    Series {
        labels: v.metric().clone(),
        samples: v.samples().iter().map(sample).collect(),
    }
}

fn from_instant_vector(v: &InstantVector) -> Series {
    Series {
        labels: v.metric().clone(),
        samples: vec![sample(v.sample())],
    }
}

/// Flattens any result shape into labeled series.
///
/// A vector element becomes a one-sample series and a scalar becomes a
/// single unlabeled series.
pub fn into_series(data: &Data) -> Vec<Series> {
    match data {
        Data::Matrix(m) => m.iter().map(from_range_vector).collect(),
        Data::Vector(v) => v.iter().map(from_instant_vector).collect(),
        Data::Scalar(s) => vec![Series {
            labels: Default::default(),
            samples: vec![sample(s)],
        }],
    }
}

/// Like [`into_series`] but only accepts a matrix result.
pub fn matrix_series(data: &Data) -> Vec<Series> {
    match data {
        Data::Matrix(m) => m.iter().map(from_range_vector).collect(),
        _ => Vec::new(),
    }
}
