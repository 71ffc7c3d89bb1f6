use crate::models::{Series, SeriesKey};

/// Picks the series a range read should copy from.
///
/// Without a filter the first series wins. With one, only a series whose
/// `job`, `instance` and `__name__` labels equal the filter exactly is
/// returned; there is no partial or case-insensitive matching.
pub fn select<'a>(series: &'a [Series], filter: Option<&SeriesKey>) -> Option<&'a Series> {
    match filter {
        None => series.first(),
        Some(key) => series.iter().find(|s| key.matches(&s.labels)),
    }
}

pub fn describe(series: &[Series]) -> Vec<SeriesKey> {
    series.iter().map(Series::key).collect()
}
