use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::ledger::batch::{self, BatchReport};
use crate::ledger::domain::{Role, UserId};
use crate::ledger::error::LedgerError;
use crate::ledger::events::ActivityPublisher;
use crate::ledger::lateness::{LatenessEvaluator, LATENESS_JOB};
use crate::ledger::leases::{LeaseService, EXPIRATION_JOB};
use crate::ledger::repository::LedgerStore;
use crate::ledger::scoring::ReputationService;

/// One of the periodic reconciliation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    LandlordScores,
    TenantScores,
    LeaseExpiration,
    PaymentLateness,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::LandlordScores,
        Job::TenantScores,
        Job::LeaseExpiration,
        Job::PaymentLateness,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Job::LandlordScores => "landlord-scores",
            Job::TenantScores => "tenant-scores",
            Job::LeaseExpiration => EXPIRATION_JOB,
            Job::PaymentLateness => LATENESS_JOB,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = UnknownJob;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Job::ALL
            .into_iter()
            .find(|job| job.name() == value)
            .ok_or_else(|| UnknownJob(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unknown job `{0}`; expected one of landlord-scores, tenant-scores, lease-expiration, \
     payment-lateness"
)]
pub struct UnknownJob(pub String);

/// Outcome of a single job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job: Job,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures caused by a concurrent stats write; the next tick retries them.
    pub version_conflicts: usize,
}

impl JobSummary {
    fn from_report<K>(job: Job, report: &BatchReport<K>, version_conflicts: usize) -> Self {
        Self {
            job,
            succeeded: report.succeeded,
            failed: report.failures.len(),
            version_conflicts,
        }
    }
}

/// Runs each reconciliation pass once. Items are processed sequentially on the calling thread.
pub struct ReconciliationJobs<S, P> {
    store: Arc<S>,
    scoring: Arc<ReputationService<S>>,
    leases: Arc<LeaseService<S, P>>,
    lateness: Arc<LatenessEvaluator<S>>,
}

impl<S, P> ReconciliationJobs<S, P>
where
    S: LedgerStore + 'static,
    P: ActivityPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        scoring: Arc<ReputationService<S>>,
        leases: Arc<LeaseService<S, P>>,
        lateness: Arc<LatenessEvaluator<S>>,
    ) -> Self {
        Self {
            store,
            scoring,
            leases,
            lateness,
        }
    }

    pub fn run(&self, job: Job, now: NaiveDateTime) -> Result<JobSummary, LedgerError> {
        let summary = match job {
            Job::LandlordScores => self.refresh_scores(job, Role::Landlord, |id| {
                self.scoring.update_landlord_score(id, now).map(|_| ())
            })?,
            Job::TenantScores => self.refresh_scores(job, Role::Tenant, |id| {
                self.scoring.update_tenant_score(id, now).map(|_| ())
            })?,
            Job::LeaseExpiration => {
                let report = self.leases.expire_leases(now.date())?;
                JobSummary::from_report(job, &report, 0)
            }
            Job::PaymentLateness => {
                let report = self.lateness.evaluate()?;
                JobSummary::from_report(job, &report, 0)
            }
        };

        info!(
            job = %summary.job,
            succeeded = summary.succeeded,
            failed = summary.failed,
            version_conflicts = summary.version_conflicts,
            "reconciliation job finished"
        );
        Ok(summary)
    }

    fn refresh_scores<F>(&self, job: Job, role: Role, update: F) -> Result<JobSummary, LedgerError>
    where
        F: Fn(UserId) -> Result<(), LedgerError>,
    {
        let subjects = self.store.users_with_role(role)?;
        let mut version_conflicts = 0;

        let report = batch::run(
            job.name(),
            subjects.into_iter().map(|id| (id, id)),
            |id| {
                let result = update(id);
                if let Err(err) = &result {
                    if err.is_version_conflict() {
                        version_conflicts += 1;
                        warn!(
                            job = %job,
                            subject = %id,
                            "stats row changed concurrently, retrying next tick"
                        );
                    }
                }
                result
            },
        );
        Ok(JobSummary::from_report(job, &report, version_conflicts))
    }
}
