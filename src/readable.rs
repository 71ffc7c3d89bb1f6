use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::marshal::read_label;
use crate::models::{ReadBatch, Sample, SeriesKey};
use crate::query;
use crate::{AdapterError, Result};

/// Capacity of each label buffer used during discovery.
pub const LABEL_CAPACITY: usize = 1023;

/// Width of one read window in milliseconds.
pub const WINDOW_MS: i64 = 1000;

/// A fixed time window over one query, with the series it produced
/// discovered up front.
#[derive(Debug, Clone)]
pub struct PrometheusReadable {
    config: ClientConfig,
    query: String,
    start: i64,
    stop: i64,
    metrics: Vec<SeriesKey>,
}

impl PrometheusReadable {
    /// Opens the window `[stop - length_secs * 1000, stop]`, where `stop` is
    /// `offset_ms` or the current time.
    pub fn open(
        config: ClientConfig,
        query: impl Into<String>,
        length_secs: i64,
        offset_ms: Option<i64>,
    ) -> Result<Self> {
        let query = query.into();
        if length_secs < 0 {
            return Err(AdapterError::InvalidArgument(format!(
                "length must be non-negative, got {}",
                length_secs
            )));
        }
        let stop = offset_ms.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        let start = stop - length_secs * 1000;

        let metrics = discover_keys(&config, &query, start)?;
        info!(
            endpoint = %config.endpoint,
            query = %query,
            start,
            stop,
            series = metrics.len(),
            "opened prometheus readable"
        );

        Ok(Self {
            config,
            query,
            start,
            stop,
            metrics,
        })
    }

    pub fn spec(&self) -> (i64, i64) {
        (self.start, self.stop)
    }

    pub fn metrics(&self) -> &[SeriesKey] {
        &self.metrics
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Reads `keys` over `[start, stop)`, one row of values per key.
    ///
    /// Both output dimensions are sized from the window, `(stop - start) /
    /// 1000` samples; a key with fewer samples leaves trailing zeros.
    pub fn read(&self, start: i64, stop: i64, keys: &[SeriesKey]) -> Result<ReadBatch> {
        if stop < start {
            return Err(AdapterError::InvalidArgument(format!(
                "stop {} before start {}",
                stop, start
            )));
        }
        let interval = ((stop - start) / WINDOW_MS) as usize;

        let mut timestamps = vec![0i64; interval];
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let mut row = vec![0f64; interval];
            let copied = query::query_range(
                &self.config,
                &self.query,
                start,
                stop,
                Some(key),
                &mut timestamps,
                &mut row,
            )?;
            debug!(?key, copied, "read series");
            values.push(row);
        }
        Ok(ReadBatch { timestamps, values })
    }

    /// Reads every discovered series.
    pub fn read_all(&self, start: i64, stop: i64) -> Result<ReadBatch> {
        self.read(start, stop, &self.metrics)
    }

    /// Consecutive one-second `(start, stop)` windows covering the whole
    /// range; the final window ends exactly at `stop`.
    pub fn windows(&self) -> impl Iterator<Item = (i64, i64)> {
        let stop = self.stop;
        (self.start..stop)
            .step_by(WINDOW_MS as usize)
            .map(move |s| (s, (s + WINDOW_MS).min(stop)))
    }
}

/// Runs discovery twice: once to size the buffers, then to fill them.
fn discover_keys(config: &ClientConfig, query: &str, instant_ms: i64) -> Result<Vec<SeriesKey>> {
    let available = query::query_specs(config, query, instant_ms, &mut [], &mut [], &mut [])?;

    let mut jobs_buf = vec![vec![0u8; LABEL_CAPACITY]; available];
    let mut instances_buf = vec![vec![0u8; LABEL_CAPACITY]; available];
    let mut names_buf = vec![vec![0u8; LABEL_CAPACITY]; available];
    let mut jobs: Vec<&mut [u8]> = jobs_buf.iter_mut().map(|b| b.as_mut_slice()).collect();
    let mut instances: Vec<&mut [u8]> =
        instances_buf.iter_mut().map(|b| b.as_mut_slice()).collect();
    let mut names: Vec<&mut [u8]> = names_buf.iter_mut().map(|b| b.as_mut_slice()).collect();

    let returned =
        query::query_specs(config, query, instant_ms, &mut jobs, &mut instances, &mut names)?;
    let count = returned.min(available);

    Ok((0..count)
        .map(|i| SeriesKey {
            job: read_label(&jobs[i][..]),
            instance: read_label(&instances[i][..]),
            name: read_label(&names[i][..]),
        })
        .collect())
}

/// Pages through the first series of an instant query evaluated at a fixed
/// instant.
#[derive(Debug, Clone)]
pub struct QueryCursor {
    config: ClientConfig,
    query: String,
    instant_ms: i64,
    offset: usize,
}

impl QueryCursor {
    pub fn new(config: ClientConfig, query: impl Into<String>) -> Self {
        Self::at(config, query, chrono::Utc::now().timestamp_millis())
    }

    pub fn at(config: ClientConfig, query: impl Into<String>, instant_ms: i64) -> Self {
        Self {
            config,
            query: query.into(),
            instant_ms,
            offset: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Up to `capacity` samples following those already returned. Empty once
    /// the series is exhausted.
    pub fn next_batch(&mut self, capacity: usize) -> Result<Vec<Sample>> {
        let mut timestamps = vec![0i64; capacity];
        let mut values = vec![0f64; capacity];
        let read = query::query(
            &self.config,
            &self.query,
            self.instant_ms,
            self.offset,
            &mut timestamps,
            &mut values,
        )?;
        self.offset += read;

        Ok(timestamps
            .into_iter()
            .zip(values)
            .take(read)
            .map(|(timestamp, value)| Sample { timestamp, value })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dead_endpoint, labels, matrix, MockPrometheus, MockResponses};

    fn server() -> MockPrometheus {
        let data = matrix(vec![
            (
                labels("node", "host-1:9100", "up"),
                vec![(1700000000.0, "1"), (1700000001.0, "1"), (1700000002.0, "1")],
            ),
            (
                labels("node", "host-2:9100", "up"),
                vec![(1700000000.0, "0"), (1700000001.0, "0"), (1700000002.0, "1")],
            ),
        ]);
        MockPrometheus::start(MockResponses {
            query: data.clone(),
            query_range: data,
            ..Default::default()
        })
    }

    #[test_log::test]
    fn test_open_discovers_series_and_window() {
        let server = server();
        let readable = PrometheusReadable::open(
            ClientConfig::new(&server.endpoint),
            "up",
            3,
            Some(1_700_000_003_000),
        )
        .unwrap();

        assert_eq!(readable.spec(), (1_700_000_000_000, 1_700_000_003_000));
        assert_eq!(
            readable.metrics(),
            &[
                SeriesKey::new("node", "host-1:9100", "up"),
                SeriesKey::new("node", "host-2:9100", "up"),
            ]
        );
        let sent = server.requests();
        assert_eq!(sent.len(), 2);
        let start: f64 = sent[0].get("start").unwrap().parse().unwrap();
        assert_eq!(start, 1_700_000_000.0);
    }

    #[test_log::test]
    fn test_read_fills_one_row_per_key() {
        let server = server();
        let readable = PrometheusReadable::open(
            ClientConfig::new(&server.endpoint),
            "up",
            3,
            Some(1_700_000_003_000),
        )
        .unwrap();
        let (start, stop) = readable.spec();

        let batch = readable.read_all(start, stop).unwrap();
        assert_eq!(
            batch.timestamps,
            vec![1_700_000_000_000, 1_700_000_001_000, 1_700_000_002_000]
        );
        assert_eq!(batch.values, vec![vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 1.0]]);
    }

    #[test_log::test]
    fn test_read_unknown_key_reads_zeros() {
        let server = server();
        let readable = PrometheusReadable::open(
            ClientConfig::new(&server.endpoint),
            "up",
            2,
            Some(1_700_000_002_000),
        )
        .unwrap();
        let batch = readable
            .read(
                1_700_000_000_000,
                1_700_000_002_000,
                &[SeriesKey::new("node", "host-9:9100", "up")],
            )
            .unwrap();
        assert_eq!(batch.values, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_negative_length_rejected() {
        let err = PrometheusReadable::open(ClientConfig::new(dead_endpoint()), "up", -1, Some(0))
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
    }

    #[test_log::test]
    fn test_open_against_dead_endpoint() {
        let err = PrometheusReadable::open(ClientConfig::new(dead_endpoint()), "up", 5, None)
            .unwrap_err();
        assert!(err.is_connection());
    }

    #[test_log::test]
    fn test_windows_cover_range() {
        let server = server();
        let readable = PrometheusReadable::open(
            ClientConfig::new(&server.endpoint),
            "up",
            3,
            Some(1_700_000_002_500),
        )
        .unwrap();
        let windows: Vec<(i64, i64)> = readable.windows().collect();
        assert_eq!(
            windows,
            vec![
                (1_699_999_999_500, 1_700_000_000_500),
                (1_700_000_000_500, 1_700_000_001_500),
                (1_700_000_001_500, 1_700_000_002_500),
            ]
        );
    }

    #[test_log::test]
    fn test_cursor_pages_until_exhausted() {
        let server = server();
        let mut cursor =
            QueryCursor::at(ClientConfig::new(&server.endpoint), "up[3s]", 1_700_000_002_000);

        let first = cursor.next_batch(2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].timestamp, 1_700_000_000_000);
        assert_eq!(cursor.offset(), 2);

        let second = cursor.next_batch(2).unwrap();
        assert_eq!(second, vec![Sample { timestamp: 1_700_000_002_000, value: 1.0 }]);

        assert!(cursor.next_batch(2).unwrap().is_empty());
        assert_eq!(cursor.offset(), 3);
    }
}
