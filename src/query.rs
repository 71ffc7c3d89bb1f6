use tracing::{debug, warn};

use crate::client::{self, into_series, matrix_series, to_seconds};
use crate::config::ClientConfig;
use crate::marshal;
use crate::metrics::RequestTimer;
use crate::models::{Series, SeriesKey};
use crate::selector;
use crate::Result;

/// Range queries always step by one second.
pub const STEP_SECONDS: f64 = 1.0;

/// Runs an instant query and returns every series in the result.
pub fn fetch_instant(config: &ClientConfig, query: &str, instant_ms: i64) -> Result<Vec<Series>> {
    debug!(endpoint = %config.endpoint, query, instant_ms, "instant query");
    let client = client::query_client(config)?;
    let response = client::runtime()?.block_on(async {
        client.query(query).at(to_seconds(instant_ms)).get().await
    });
    match response {
        Ok(response) => Ok(into_series(response.data())),
        Err(e) => {
            warn!(endpoint = %config.endpoint, query, "instant query failed: {}", e);
            Err(e.into())
        }
    }
}

/// Runs a range query over `[start_ms, end_ms]` and returns the matrix series.
pub fn fetch_range(
    config: &ClientConfig,
    query: &str,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<Series>> {
    debug!(endpoint = %config.endpoint, query, start_ms, end_ms, "range query");
    let client = client::query_client(config)?;
    let response = client::runtime()?.block_on(async {
        client
            .query_range(query, to_seconds(start_ms), to_seconds(end_ms), STEP_SECONDS)
            .get()
            .await
    });
    match response {
        Ok(response) => Ok(matrix_series(response.data())),
        Err(e) => {
            warn!(endpoint = %config.endpoint, query, "range query failed: {}", e);
            Err(e.into())
        }
    }
}

/// Evaluates `query` at `instant_ms` and copies samples of the first series,
/// skipping the first `offset` of them.
///
/// Returns how many samples were written. Zero means no series, or nothing
/// left past `offset`.
pub fn query(
    config: &ClientConfig,
    query: &str,
    instant_ms: i64,
    offset: usize,
    timestamps: &mut [i64],
    values: &mut [f64],
) -> Result<usize> {
    let timer = RequestTimer::new("query");
    let series = timer.track(fetch_instant(config, query, instant_ms))?;

    let copied = match selector::select(&series, None) {
        Some(first) if offset < first.samples.len() => {
            marshal::copy_samples(&first.samples[offset..], timestamps, values)
        }
        _ => 0,
    };
    debug!(query, offset, copied, "instant query copied samples");
    Ok(copied)
}

/// Evaluates `query` over `[start_ms, end_ms]` and copies the selected series.
///
/// With a `filter`, only a series with exactly that `(job, instance, name)`
/// triple is copied; no match returns zero and leaves the buffers untouched.
pub fn query_range(
    config: &ClientConfig,
    query: &str,
    start_ms: i64,
    end_ms: i64,
    filter: Option<&SeriesKey>,
    timestamps: &mut [i64],
    values: &mut [f64],
) -> Result<usize> {
    let timer = RequestTimer::new("query_range");
    let series = timer.track(fetch_range(config, query, start_ms, end_ms))?;

    let copied = match selector::select(&series, filter) {
        Some(selected) => marshal::copy_samples(&selected.samples, timestamps, values),
        None => {
            debug!(query, ?filter, "no series matched");
            0
        }
    };
    Ok(copied)
}

/// Lists the series `query` produces at `instant_ms`.
pub fn discover(config: &ClientConfig, query: &str, instant_ms: i64) -> Result<Vec<SeriesKey>> {
    let series = fetch_range(config, query, instant_ms, instant_ms)?;
    Ok(selector::describe(&series))
}

/// Writes the `(job, instance, name)` labels of each series into the label
/// buffers and returns how many series exist.
///
/// The return value counts every series, even those that did not fit, so a
/// call with empty buffers sizes the follow-up call.
pub fn query_specs(
    config: &ClientConfig,
    query: &str,
    instant_ms: i64,
    jobs: &mut [&mut [u8]],
    instances: &mut [&mut [u8]],
    names: &mut [&mut [u8]],
) -> Result<usize> {
    let timer = RequestTimer::new("query_specs");
    let keys = timer.track(discover(config, query, instant_ms))?;

    let written = marshal::copy_keys(&keys, jobs, instances, names);
    debug!(query, available = keys.len(), written, "described series");
    Ok(keys.len())
}
