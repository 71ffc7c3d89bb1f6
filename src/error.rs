use thiserror::Error;

/// Value handed back across the foreign boundary for every failure.
pub const ERROR_SENTINEL: i64 = -1;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Metric not found: {0}")]
    MetricNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl AdapterError {
    /// Connection and query failures are indistinguishable to a boundary caller.
    pub fn sentinel(&self) -> i64 {
        ERROR_SENTINEL
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, AdapterError::Connection(_))
    }
}

impl From<prometheus_http_query::Error> for AdapterError {
    fn from(err: prometheus_http_query::Error) -> Self {
        use prometheus_http_query::Error;

        match err {
            Error::Client(e) => AdapterError::Connection(e.to_string()),
            Error::ParseUrl(e) => AdapterError::Connection(e.to_string()),
            Error::Prometheus(e) => AdapterError::Query(e.to_string()),
            e => AdapterError::Query(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::Connection(err.to_string())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::Runtime(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
