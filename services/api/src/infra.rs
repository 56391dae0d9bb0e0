use chrono::NaiveDate;
use lease_ledger::config::AppConfig;
use lease_ledger::error::AppError;
use lease_ledger::ledger::{
    LatenessEvaluator, LeaseService, LogPublisher, MemoryStore, ReputationService,
};
use lease_ledger::reconciliation::{ReconciliationJobs, ReconciliationScheduler};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Jobs = ReconciliationJobs<MemoryStore, LogPublisher>;

/// Services wired over one shared in-memory store.
pub(crate) struct Ledger {
    pub(crate) scoring: Arc<ReputationService<MemoryStore>>,
    pub(crate) jobs: Arc<Jobs>,
}

impl Ledger {
    pub(crate) fn wire(config: &AppConfig) -> Result<Self, AppError> {
        let store = match &config.seed_path {
            Some(path) => {
                let store = MemoryStore::load_snapshot(path)?;
                info!(path = %path.display(), "ledger seeded from snapshot");
                store
            }
            None => MemoryStore::new(),
        };
        let store = Arc::new(store);
        let activity = Arc::new(LogPublisher);

        let scoring = Arc::new(ReputationService::new(store.clone(), config.weights));
        let leases = Arc::new(LeaseService::new(store.clone(), activity, config.leases));
        let lateness = Arc::new(LatenessEvaluator::new(store.clone()));
        let jobs = Arc::new(ReconciliationJobs::new(
            store,
            scoring.clone(),
            leases,
            lateness,
        ));

        Ok(Self { scoring, jobs })
    }

    pub(crate) fn scheduler(
        &self,
        config: &AppConfig,
    ) -> ReconciliationScheduler<MemoryStore, LogPublisher> {
        ReconciliationScheduler::new(self.jobs.clone(), config.scheduler)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
