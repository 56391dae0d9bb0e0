use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

/// A single item a batch could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure<K> {
    pub key: K,
    pub reason: String,
}

/// Outcome of one batch pass: how many items succeeded and which ones failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport<K> {
    pub job: &'static str,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure<K>>,
}

impl<K> BatchReport<K> {
    pub fn empty(job: &'static str) -> Self {
        Self {
            job,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_failure(&mut self, key: K, reason: impl fmt::Display) {
        self.failures.push(BatchFailure {
            key,
            reason: reason.to_string(),
        });
    }
}

/// Applies `op` to every keyed item in order. A failing item is logged and recorded, and the
/// pass continues with the next one.
pub fn run<K, T, E, F>(
    job: &'static str,
    items: impl IntoIterator<Item = (K, T)>,
    mut op: F,
) -> BatchReport<K>
where
    K: fmt::Display,
    E: fmt::Display,
    F: FnMut(T) -> Result<(), E>,
{
    let mut report = BatchReport::empty(job);

    for (key, item) in items {
        match op(item) {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                warn!(job, item = %key, error = %err, "batch item failed");
                report.record_failure(key, err);
            }
        }
    }

    info!(
        job,
        succeeded = report.succeeded,
        failed = report.failures.len(),
        "batch pass finished"
    );
    report
}
