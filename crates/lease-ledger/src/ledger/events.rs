use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

/// Activity notice emitted after a ledger mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEvent {
    pub action: String,
    pub entity: &'static str,
    pub entity_id: u64,
    pub details: BTreeMap<String, String>,
}

impl LedgerEvent {
    pub fn new(action: impl Into<String>, entity: &'static str, entity_id: impl Into<u64>) -> Self {
        Self {
            action: action.into(),
            entity,
            entity_id: entity_id.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// Outbound hook for notifications and activity logs.
pub trait ActivityPublisher: Send + Sync {
    fn publish(&self, event: LedgerEvent) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("activity transport unavailable: {0}")]
    Transport(String),
}

/// Delivers `event` without letting a delivery failure reach the caller.
pub(crate) fn publish_best_effort<P>(publisher: &P, event: LedgerEvent)
where
    P: ActivityPublisher + ?Sized,
{
    let action = event.action.clone();
    let entity_id = event.entity_id;
    if let Err(err) = publisher.publish(event) {
        warn!(%action, entity_id, error = %err, "activity publish failed");
    }
}

/// Publisher that writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl ActivityPublisher for LogPublisher {
    fn publish(&self, event: LedgerEvent) -> Result<(), PublishError> {
        info!(
            action = %event.action,
            entity = event.entity,
            entity_id = event.entity_id,
            details = ?event.details,
            "ledger activity"
        );
        Ok(())
    }
}
