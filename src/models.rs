use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const JOB_LABEL: &str = "job";
pub const INSTANCE_LABEL: &str = "instance";
pub const NAME_LABEL: &str = "__name__";

/// The `(job, instance, __name__)` triple used to tell series apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub job: String,
    pub instance: String,
    pub name: String,
}

impl SeriesKey {
    pub fn new(
        job: impl Into<String>,
        instance: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            job: job.into(),
            instance: instance.into(),
            name: name.into(),
        }
    }

    /// Missing labels read as the empty string.
    pub fn from_labels(labels: &HashMap<String, String>) -> Self {
        let get = |key: &str| labels.get(key).cloned().unwrap_or_default();
        Self {
            job: get(JOB_LABEL),
            instance: get(INSTANCE_LABEL),
            name: get(NAME_LABEL),
        }
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let get = |key: &str| labels.get(key).map(String::as_str).unwrap_or("");
        get(JOB_LABEL) == self.job
            && get(INSTANCE_LABEL) == self.instance
            && get(NAME_LABEL) == self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

/// One labeled time series, samples in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: HashMap<String, String>,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::from_labels(&self.labels)
    }
}

/// Result of reading every discovered series over one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadBatch {
    pub timestamps: Vec<i64>,
    /// One row per requested key, each `timestamps.len()` long.
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrapedSample {
    pub timestamp: i64,
    pub value: f64,
}
