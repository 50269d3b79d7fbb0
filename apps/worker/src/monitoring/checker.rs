use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

use super::types::{Check, ProbeOutcome};

/// Issues one bounded probe per check
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe the check's endpoint. Always resolves to exactly one outcome,
    /// never an error.
    async fn probe(&self, check: &Check) -> ProbeOutcome;
}

/// Single-use completion guard shared by the racing sides of a probe.
///
/// Whichever side fires first delivers the outcome; later attempts are
/// dropped and reported as `false`.
pub struct OutcomeSlot {
    sender: Mutex<Option<oneshot::Sender<ProbeOutcome>>>,
}

impl OutcomeSlot {
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<ProbeOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(Self { sender: Mutex::new(Some(tx)) }), rx)
    }

    /// Deliver `outcome` if nothing has been delivered yet
    pub fn fire(&self, outcome: ProbeOutcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, check: &Check) -> ProbeOutcome {
        let target = match Url::parse(&check.target()) {
            Ok(target) if target.host_str().is_some() => target,
            Ok(_) => return ProbeOutcome::network_error(format!("no host in {}", check.target())),
            Err(e) => return ProbeOutcome::network_error(format!("invalid target {}: {e}", check.target())),
        };

        let timeout = Duration::from_secs(check.timeout_seconds);
        let request = self
            .client
            .request(check.method.to_reqwest(), target)
            .timeout(timeout);

        let (slot, outcome_rx) = OutcomeSlot::channel();

        let response_slot = Arc::clone(&slot);
        let request_task = tokio::spawn(async move {
            let outcome = match request.send().await {
                Ok(response) => ProbeOutcome::response(response.status().as_u16()),
                Err(e) if e.is_timeout() => ProbeOutcome::timeout(),
                Err(e) => ProbeOutcome::network_error(e.to_string()),
            };
            if !response_slot.fire(outcome) {
                debug!("Probe result arrived after the outcome was already delivered");
            }
        });

        let timer_slot = Arc::clone(&slot);
        let timer_task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer_slot.fire(ProbeOutcome::timeout());
        });

        let outcome = outcome_rx
            .await
            .unwrap_or_else(|_| ProbeOutcome::network_error("probe task ended without an outcome"));

        request_task.abort();
        timer_task.abort();

        outcome
    }
}
