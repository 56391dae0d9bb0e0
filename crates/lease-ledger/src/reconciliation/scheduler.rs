use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use super::jobs::{Job, ReconciliationJobs};
use crate::ledger::events::ActivityPublisher;
use crate::ledger::repository::LedgerStore;

/// Cadences for the periodic jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period of the landlord and tenant score refresh.
    pub score_interval: Duration,
    /// Local hour (0-23) at which the daily jobs fire.
    pub daily_run_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            score_interval: Duration::from_secs(60),
            daily_run_hour: 0,
        }
    }
}

/// Fires reconciliation jobs on their cadences.
///
/// Every tick hands its job to the blocking pool and moves on, so a run that outlasts its period
/// overlaps the next one.
pub struct ReconciliationScheduler<S, P> {
    jobs: Arc<ReconciliationJobs<S, P>>,
    config: SchedulerConfig,
}

impl<S, P> ReconciliationScheduler<S, P>
where
    S: LedgerStore + 'static,
    P: ActivityPublisher + 'static,
{
    pub fn new(jobs: Arc<ReconciliationJobs<S, P>>, config: SchedulerConfig) -> Self {
        Self { jobs, config }
    }

    /// Spawns one loop per job and returns their handles.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            score_interval_secs = self.config.score_interval.as_secs(),
            daily_run_hour = self.config.daily_run_hour,
            "reconciliation scheduler starting"
        );
        vec![
            self.every(Job::LandlordScores),
            self.every(Job::TenantScores),
            self.daily(Job::LeaseExpiration),
            self.daily(Job::PaymentLateness),
        ]
    }

    fn every(&self, job: Job) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        let period = self.config.score_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                dispatch(&jobs, job);
            }
        })
    }

    fn daily(&self, job: Job) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        let hour = self.config.daily_run_hour;

        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = next_daily_run(now, hour);
                info!(job = %job, next_run = %next, "daily job scheduled");

                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                dispatch(&jobs, job);
            }
        })
    }
}

fn dispatch<S, P>(jobs: &Arc<ReconciliationJobs<S, P>>, job: Job)
where
    S: LedgerStore + 'static,
    P: ActivityPublisher + 'static,
{
    let jobs = jobs.clone();
    tokio::task::spawn_blocking(move || {
        let now = Local::now().naive_local();
        if let Err(err) = jobs.run(job, now) {
            error!(job = %job, error = %err, "reconciliation job aborted");
        }
    });
}

/// First occurrence of `hour:00` strictly after `now`.
pub fn next_daily_run(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let hour = hour.min(23);
    let today = now.date();
    match today.and_hms_opt(hour, 0, 0) {
        Some(candidate) if candidate > now => candidate,
        Some(candidate) => candidate + TimeDelta::days(1),
        None => now + TimeDelta::days(1),
    }
}
