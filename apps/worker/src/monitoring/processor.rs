use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::types::{Check, CheckLogEntry, CheckState, ProbeOutcome};
use crate::logs::LogSink;
use crate::notify::Notifier;
use crate::storage::{Category, RecordStore};

/// `up` only for a response whose code is one of the check's success codes
pub fn derive_state(check: &Check, outcome: &ProbeOutcome) -> CheckState {
    match outcome.response_code() {
        Some(code) if check.accepts(code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Alerts need a previous evaluation to compare against, so a check's first
/// evaluation never alerts
pub fn alert_warranted(check: &Check, new_state: CheckState) -> bool {
    check.has_baseline() && check.state != new_state
}

/// Text sent to the owner when a check changes state
pub fn alert_message(check: &Check) -> String {
    format!(
        "Alert: Your check for {} {} is currently {}",
        check.method.as_upper(),
        check.target(),
        check.state
    )
}

/// What happened to one evaluated check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Persisted, no alert needed
    Unchanged,
    /// Persisted and the owner was notified
    Alerted,
    /// Persisted, but the notification could not be sent
    AlertFailed,
    /// Write-back failed; the stored record keeps its previous state
    NotPersisted,
}

/// Result of processing one probe outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub check: Check,
    pub alert: bool,
    pub disposition: Disposition,
}

/// Turns probe outcomes into persisted state, log entries and alerts
pub struct OutcomeProcessor {
    store: Arc<dyn RecordStore>,
    logs: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
}

impl OutcomeProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        logs: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { store, logs, notifier }
    }

    /// Process an outcome evaluated at `now_ms`.
    ///
    /// Errors never escape: each failure is logged and reflected in the
    /// returned [`Disposition`].
    pub async fn process(&self, check: Check, outcome: ProbeOutcome, now_ms: i64) -> Evaluation {
        let state = derive_state(&check, &outcome);
        let alert = alert_warranted(&check, state);

        self.append_log(&check, &outcome, state, alert, now_ms).await;

        let updated = Check { state, last_checked: Some(now_ms), ..check };

        let record = match serde_json::to_value(&updated) {
            Ok(record) => record,
            Err(e) => {
                error!(check_id = %updated.id, "Failed to serialize check: {}", e);
                return Evaluation { check: updated, alert, disposition: Disposition::NotPersisted };
            }
        };

        if let Err(e) = self.store.update(Category::Checks, &updated.id, &record).await {
            error!(check_id = %updated.id, "Failed to save check outcome: {}", e);
            return Evaluation { check: updated, alert, disposition: Disposition::NotPersisted };
        }

        if !alert {
            debug!(check_id = %updated.id, state = %state, "Check outcome has not changed, no alert needed");
            return Evaluation { check: updated, alert, disposition: Disposition::Unchanged };
        }

        let message = alert_message(&updated);
        let disposition = match self.notifier.send(&updated.user_phone, &message).await {
            Ok(()) => {
                info!(check_id = %updated.id, user = %updated.user_phone, "User alerted: {}", message);
                Disposition::Alerted
            }
            Err(e) => {
                warn!(check_id = %updated.id, user = %updated.user_phone, "Could not alert user: {}", e);
                Disposition::AlertFailed
            }
        };

        Evaluation { check: updated, alert, disposition }
    }

    async fn append_log(
        &self,
        check: &Check,
        outcome: &ProbeOutcome,
        state: CheckState,
        alert: bool,
        time: i64,
    ) {
        let entry = CheckLogEntry { check: check.clone(), outcome: outcome.clone(), state, alert, time };

        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(check_id = %check.id, "Failed to serialize log entry: {}", e);
                return;
            }
        };

        if let Err(e) = self.logs.append(&check.id, &line).await {
            warn!(check_id = %check.id, "Failed to append check log: {}", e);
        }
    }
}
