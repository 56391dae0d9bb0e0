//! Periodic passes that keep stats snapshots, lease status, and payment lateness in step with the
//! transactional data.

mod jobs;
mod scheduler;

pub use jobs::{Job, JobSummary, ReconciliationJobs, UnknownJob};
pub use scheduler::{next_daily_run, ReconciliationScheduler, SchedulerConfig};
