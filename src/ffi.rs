//! C ABI over the query and scrape operations.
//!
//! Every function returns `-1` on failure and a non-negative count
//! otherwise. The message of the most recent failure on the calling thread
//! is available through [`prometheus_io_last_error`].

use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

use tracing::Level;

use crate::config::ClientConfig;
use crate::marshal::copy_label;
use crate::models::SeriesKey;
use crate::{logging, query, scrape, AdapterError, Result, ERROR_SENTINEL};

/// A caller-owned byte buffer of fixed capacity.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ByteBuffer {
    pub data: *mut u8,
    pub len: usize,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(err: &AdapterError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.to_string()));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Runs `f`, collapsing errors and panics into the sentinel.
fn boundary<F>(f: F) -> i64
where
    F: FnOnce() -> Result<usize>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        Err(AdapterError::Runtime("panic inside prometheus_io".to_string()))
    });
    match result {
        Ok(count) => {
            clear_last_error();
            count as i64
        }
        Err(e) => {
            set_last_error(&e);
            e.sentinel()
        }
    }
}

unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(AdapterError::InvalidArgument(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| AdapterError::InvalidArgument(format!("{} is not valid UTF-8", what)))
}

unsafe fn slice_arg<'a, T>(ptr: *mut T, len: usize, what: &str) -> Result<&'a mut [T]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(AdapterError::InvalidArgument(format!("{} is null", what)));
    }
    Ok(std::slice::from_raw_parts_mut(ptr, len))
}

unsafe fn label_buffers<'a>(
    ptr: *const ByteBuffer,
    count: usize,
    what: &str,
) -> Result<Vec<&'a mut [u8]>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(AdapterError::InvalidArgument(format!("{} is null", what)));
    }
    std::slice::from_raw_parts(ptr, count)
        .iter()
        .map(|buffer| slice_arg(buffer.data, buffer.len, what))
        .collect()
}

fn config_for(endpoint: &str) -> Result<ClientConfig> {
    Ok(ClientConfig::from_env()?.with_endpoint(endpoint))
}

/// Installs the tracing subscriber. Returns `0`, or `1` if one was
/// already installed.
#[no_mangle]
pub extern "C" fn prometheus_io_init_logging() -> i32 {
    match logging::init_logger(Level::INFO) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Instant query; see [`query::query`].
///
/// # Safety
/// `endpoint` and `query` must be NUL-terminated strings. `timestamps` and
/// `values` must be valid for writes of `timestamps_len` and `values_len`
/// elements.
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_query(
    endpoint: *const c_char,
    query: *const c_char,
    instant_ms: i64,
    offset: i64,
    timestamps: *mut i64,
    timestamps_len: usize,
    values: *mut f64,
    values_len: usize,
) -> i64 {
    boundary(|| {
        let config = config_for(str_arg(endpoint, "endpoint")?)?;
        let query = str_arg(query, "query")?;
        let offset = usize::try_from(offset)
            .map_err(|_| AdapterError::InvalidArgument(format!("offset {}", offset)))?;
        let timestamps = slice_arg(timestamps, timestamps_len, "timestamps")?;
        let values = slice_arg(values, values_len, "values")?;
        query::query(&config, query, instant_ms, offset, timestamps, values)
    })
}

/// Range query over the first returned series.
///
/// # Safety
/// As for [`prometheus_io_query`].
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_query_range(
    endpoint: *const c_char,
    query: *const c_char,
    start_ms: i64,
    end_ms: i64,
    timestamps: *mut i64,
    timestamps_len: usize,
    values: *mut f64,
    values_len: usize,
) -> i64 {
    boundary(|| {
        let config = config_for(str_arg(endpoint, "endpoint")?)?;
        let query = str_arg(query, "query")?;
        let timestamps = slice_arg(timestamps, timestamps_len, "timestamps")?;
        let values = slice_arg(values, values_len, "values")?;
        query::query_range(&config, query, start_ms, end_ms, None, timestamps, values)
    })
}

/// Range query over the series labeled exactly `(job, instance, name)`.
///
/// # Safety
/// As for [`prometheus_io_query`]; `job`, `instance` and `name` must also be
/// NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_query_range_filtered(
    endpoint: *const c_char,
    query: *const c_char,
    start_ms: i64,
    end_ms: i64,
    job: *const c_char,
    instance: *const c_char,
    name: *const c_char,
    timestamps: *mut i64,
    timestamps_len: usize,
    values: *mut f64,
    values_len: usize,
) -> i64 {
    boundary(|| {
        let config = config_for(str_arg(endpoint, "endpoint")?)?;
        let query = str_arg(query, "query")?;
        let key = SeriesKey::new(
            str_arg(job, "job")?,
            str_arg(instance, "instance")?,
            str_arg(name, "name")?,
        );
        let timestamps = slice_arg(timestamps, timestamps_len, "timestamps")?;
        let values = slice_arg(values, values_len, "values")?;
        query::query_range(&config, query, start_ms, end_ms, Some(&key), timestamps, values)
    })
}

/// Series discovery. Returns the number of series available, which may
/// exceed `count`; call once with `count == 0` to size the buffers.
///
/// # Safety
/// `jobs`, `instances` and `names` must each point to `count` buffers whose
/// `data` is valid for writes of `len` bytes. They may be null when `count`
/// is zero.
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_query_specs(
    endpoint: *const c_char,
    query: *const c_char,
    instant_ms: i64,
    jobs: *const ByteBuffer,
    instances: *const ByteBuffer,
    names: *const ByteBuffer,
    count: usize,
) -> i64 {
    boundary(|| {
        let config = config_for(str_arg(endpoint, "endpoint")?)?;
        let query = str_arg(query, "query")?;
        let mut jobs = label_buffers(jobs, count, "jobs")?;
        let mut instances = label_buffers(instances, count, "instances")?;
        let mut names = label_buffers(names, count, "names")?;
        query::query_specs(&config, query, instant_ms, &mut jobs, &mut instances, &mut names)
    })
}

/// Scrapes `metric` from `endpoint` into `value[0]`. Returns `0` on success.
///
/// TLS verification is skipped only when `PROMETHEUS_INSECURE_SKIP_VERIFY`
/// is set.
///
/// # Safety
/// `endpoint` and `metric` must be NUL-terminated strings and `value` valid
/// for one write.
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_scrape(
    endpoint: *const c_char,
    metric: *const c_char,
    value: *mut f64,
) -> i64 {
    boundary(|| {
        let config = config_for(str_arg(endpoint, "endpoint")?)?;
        let metric = str_arg(metric, "metric")?;
        let out = slice_arg(value, 1, "value")?;
        out[0] = scrape::scrape(&config, metric)?;
        Ok(0)
    })
}

/// Copies the last error message of this thread into `buffer`.
///
/// Returns the full message length (which may exceed `len`), `0` if the
/// last call succeeded, or `-1` if `buffer` is null while `len > 0`.
///
/// # Safety
/// `buffer` must be valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn prometheus_io_last_error(buffer: *mut u8, len: usize) -> i64 {
    let dest = match slice_arg(buffer, len, "buffer") {
        Ok(dest) => dest,
        Err(_) => return ERROR_SENTINEL,
    };
    LAST_ERROR.with(|slot| match slot.borrow().as_deref() {
        Some(message) => {
            copy_label(message, dest);
            message.len() as i64
        }
        None => 0,
    })
}
