use crate::metrics;
use crate::models::{Sample, SeriesKey};

/// Copies samples into parallel caller buffers.
///
/// Writes `min(timestamps.len(), values.len(), samples.len())` entries and
/// returns that count. Unequal buffers truncate to the shorter one.
pub fn copy_samples(samples: &[Sample], timestamps: &mut [i64], values: &mut [f64]) -> usize {
    let count = samples.len().min(timestamps.len()).min(values.len());
    for (i, sample) in samples.iter().take(count).enumerate() {
        timestamps[i] = sample.timestamp;
        values[i] = sample.value;
    }
    metrics::record_samples_copied(count);
    count
}

/// Copies `value` into `dest`, truncating at capacity.
///
/// When there is room left after the value a single NUL byte follows it.
/// Returns the number of value bytes written.
pub fn copy_label(value: &str, dest: &mut [u8]) -> usize {
    let bytes = value.as_bytes();
    let count = bytes.len().min(dest.len());
    dest[..count].copy_from_slice(&bytes[..count]);
    if count < dest.len() {
        dest[count] = 0;
    }
    count
}

/// Writes label triples for as many keys as every buffer set can hold.
/// Returns how many triples were written.
pub fn copy_keys(
    keys: &[SeriesKey],
    jobs: &mut [&mut [u8]],
    instances: &mut [&mut [u8]],
    names: &mut [&mut [u8]],
) -> usize {
    let count = keys
        .len()
        .min(jobs.len())
        .min(instances.len())
        .min(names.len());
    for (i, key) in keys.iter().take(count).enumerate() {
        copy_label(&key.job, &mut jobs[i][..]);
        copy_label(&key.instance, &mut instances[i][..]);
        copy_label(&key.name, &mut names[i][..]);
    }
    count
}

/// Reads a NUL-terminated (or full) label buffer back into a string.
pub fn read_label(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}
