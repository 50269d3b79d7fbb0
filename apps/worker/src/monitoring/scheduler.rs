use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::checker::Prober;
use super::processor::{Evaluation, OutcomeProcessor};
use super::validation::validate_check;
use crate::storage::{Category, RecordStore};

/// Drives the probe loop: every tick, each stored check is validated,
/// probed and processed in its own task.
pub struct CheckScheduler {
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn Prober>,
    processor: Arc<OutcomeProcessor>,
    period: Duration,
}

impl CheckScheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        prober: Arc<dyn Prober>,
        processor: Arc<OutcomeProcessor>,
        period: Duration,
    ) -> Self {
        Self { store, prober, processor, period }
    }

    /// List all checks and dispatch one independent task per check.
    ///
    /// Returns the spawned handles so callers can wait on a tick; the loop
    /// itself never waits on them.
    pub async fn dispatch_all(&self) -> Vec<JoinHandle<Option<Evaluation>>> {
        let ids = match self.store.list(Category::Checks).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list checks: {}", e);
                return Vec::new();
            }
        };

        if ids.is_empty() {
            debug!("No checks to process");
            return Vec::new();
        }

        debug!("Dispatching {} checks", ids.len());

        ids.into_iter()
            .map(|id| {
                let store = Arc::clone(&self.store);
                let prober = Arc::clone(&self.prober);
                let processor = Arc::clone(&self.processor);
                tokio::spawn(async move { run_check(store, prober, processor, id).await })
            })
            .collect()
    }

    /// Run the probe loop forever; the first tick fires immediately
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Probe loop started, interval {:?}", self.period);
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                // Ticks may overlap with slow probes from earlier ticks
                let dispatched = self.dispatch_all().await;
                debug!("Probe tick dispatched {} checks", dispatched.len());
            }
        })
    }
}

/// One unit of work: read, validate, probe, process
async fn run_check(
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn Prober>,
    processor: Arc<OutcomeProcessor>,
    id: String,
) -> Option<Evaluation> {
    let raw = match store.read(Category::Checks, &id).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(check_id = %id, "Check disappeared before it could be read");
            return None;
        }
        Err(e) => {
            warn!(check_id = %id, "Error reading check: {}", e);
            return None;
        }
    };

    let check = match validate_check(&raw) {
        Ok(check) => check,
        Err(e) => {
            warn!(check_id = %id, "Check is not properly formatted, skipping it: {}", e);
            return None;
        }
    };

    // Outcomes are written back under `check.id`, which must be this record
    if check.id != id {
        warn!(check_id = %id, claimed_id = %check.id, "Check id does not match its record key, skipping it");
        return None;
    }

    let outcome = prober.probe(&check).await;
    if outcome.is_timeout() {
        debug!(check_id = %check.id, "Probe timed out after {}s", check.timeout_seconds);
    } else {
        debug!(check_id = %check.id, outcome = ?outcome, "Probe finished");
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let evaluation = processor.process(check, outcome, now_ms).await;
    debug!(
        check_id = %evaluation.check.id,
        state = %evaluation.check.state,
        alert = evaluation.alert,
        disposition = ?evaluation.disposition,
        "Check evaluated"
    );
    Some(evaluation)
}
