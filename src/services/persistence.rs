//! Persistence service: committed engine edits become feature-store writes.
//!
//! DESIGN
//! ======
//! The engine emits one action per finished gesture, bulk arrange or
//! attribute edit. Each becomes one request on its own tokio task, so the
//! editor never waits on the network. Writes are not sequenced: when two
//! land for the same feature, the store keeps whichever arrives last.
//! Failures are logged and never retried. Bulk repositions resolve to a
//! per-id report for the caller; a request that fails outright reports every
//! id as failed. Attribute edits leave a short-lived flash on the edited
//! field so the form can show whether the save went through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use canvas::doc::NodeId;
use canvas::engine::Action;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::store::{BulkUpdateResult, FeatureStore};

pub const FLASH_SUCCESS: &str = "#10b981";
pub const FLASH_FAILURE: &str = "#ef4444";
pub const FLASH_NEUTRAL: &str = "#d1d5db";
pub const FLASH_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOutcome {
    Success,
    Failure,
}

/// Save feedback per `(node, field)`, expiring after [`FLASH_DURATION`].
#[derive(Debug, Default)]
pub struct FlashBoard {
    entries: HashMap<(NodeId, &'static str), (FlashOutcome, Instant)>,
}

impl FlashBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &str, field: &'static str, outcome: FlashOutcome, now: Instant) {
        self.prune(now);
        self.entries.insert((id.to_owned(), field), (outcome, now));
    }

    /// Border colour for the field at `now`.
    #[must_use]
    pub fn color(&self, id: &str, field: &'static str, now: Instant) -> &'static str {
        match self.entries.get(&(id.to_owned(), field)) {
            Some((outcome, at)) if now.saturating_duration_since(*at) < FLASH_DURATION => match outcome {
                FlashOutcome::Success => FLASH_SUCCESS,
                FlashOutcome::Failure => FLASH_FAILURE,
            },
            _ => FLASH_NEUTRAL,
        }
    }

    /// Forget expired flashes.
    fn prune(&mut self, now: Instant) {
        self.entries.retain(|_, (_, at)| now.saturating_duration_since(*at) < FLASH_DURATION);
    }
}

/// Spawns one store write per persisting action.
pub struct PersistenceBridge<S> {
    store: Arc<S>,
    flashes: Arc<Mutex<FlashBoard>>,
}

impl<S: FeatureStore + 'static> PersistenceBridge<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, flashes: Arc::new(Mutex::new(FlashBoard::new())) }
    }

    /// Start the write for `action`. Returns `None` for actions that don't
    /// persist anything. Only bulk repositions resolve to a report.
    pub fn handle(&self, action: Action) -> Option<JoinHandle<Option<BulkUpdateResult>>> {
        let store = Arc::clone(&self.store);
        match action {
            Action::GeometryCommitted(update) => Some(tokio::spawn(async move {
                match store.patch_geometry(&update).await {
                    Ok(()) => info!(node = %update.node_id, remote_id = update.remote_id, "geometry saved"),
                    Err(e) => error!(error = %e, node = %update.node_id, remote_id = update.remote_id, "geometry save failed"),
                }
                None
            })),
            Action::BulkRepositioned(updates) => Some(tokio::spawn(async move {
                let result = match store.bulk_update(&updates).await {
                    Ok(result) => {
                        info!(updated = result.updated_count, failed = result.failed_ids.len(), "bulk update finished");
                        if !result.failed_ids.is_empty() {
                            warn!(failed_ids = ?result.failed_ids, "bulk update left features unchanged");
                        }
                        result
                    }
                    Err(e) => {
                        error!(error = %e, count = updates.len(), "bulk update failed");
                        BulkUpdateResult { updated_count: 0, failed_ids: updates.iter().map(|u| u.remote_id).collect() }
                    }
                };
                Some(result)
            })),
            Action::AttributeEdited { id, remote_id, edit } => {
                let flashes = Arc::clone(&self.flashes);
                Some(tokio::spawn(async move {
                    let field = edit.field();
                    let outcome = match store.patch_field(remote_id, &edit).await {
                        Ok(()) => {
                            info!(node = %id, remote_id, field, "attribute saved");
                            FlashOutcome::Success
                        }
                        Err(e) => {
                            error!(error = %e, node = %id, remote_id, field, "attribute save failed");
                            FlashOutcome::Failure
                        }
                    };
                    flashes.lock().await.record(&id, field, outcome, Instant::now());
                    None
                }))
            }
            _ => None,
        }
    }

    /// Current flash colour for a field.
    pub async fn flash_color(&self, id: &str, field: &'static str) -> &'static str {
        self.flashes.lock().await.color(id, field, Instant::now())
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
