/// Orchestrator module - wires the worker together
///
/// The orchestrator owns no state of its own. It receives the record store,
/// log sink, notifier and prober at construction and starts the two
/// independent background loops:
/// - the probe loop (`CheckScheduler`), every `check_interval_seconds`
/// - the log rotation loop (`LogRotation`), every `log_rotation_interval_seconds`
///
/// Both loops run once immediately and then forever; they share nothing
/// beyond the store and the log sink.
pub mod rotation;


pub use rotation::{LogRotation, RotationReport};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::logs::{FileLogSink, LogSink};
use crate::monitoring::checker::{HttpProber, Prober};
use crate::monitoring::{CheckScheduler, OutcomeProcessor};
use crate::notify::{LogNotifier, Notifier, TwilioNotifier};
use crate::storage::{FileStore, RecordStore};

/// Collaborators the worker depends on
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub logs: Arc<dyn LogSink>,
    pub notifier: Arc<dyn Notifier>,
    pub prober: Arc<dyn Prober>,
}

impl Collaborators {
    /// Build the file-backed collaborators described by `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = FileStore::new(&config.storage.data_dir);
        store.ensure_layout().await?;
        info!("Record store at {}", store.base_dir().display());

        let logs = FileLogSink::new(&config.storage.logs_dir);
        logs.ensure_layout().await?;

        let notifier: Arc<dyn Notifier> = match &config.twilio {
            Some(twilio) => {
                info!("Alerts will be sent by SMS from {}", twilio.from_phone);
                Arc::new(TwilioNotifier::new(twilio.clone())?)
            }
            None => {
                info!("No SMS provider configured, alerts will only be logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self {
            store: Arc::new(store),
            logs: Arc::new(logs),
            notifier,
            prober: Arc::new(HttpProber::new(&config.worker.user_agent)?),
        })
    }
}

/// Main orchestrator for the worker
pub struct Orchestrator {
    scheduler: Arc<CheckScheduler>,
    rotation: Arc<LogRotation>,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, check_interval: Duration, rotation_interval: Duration) -> Self {
        let Collaborators { store, logs, notifier, prober } = collaborators;

        let processor = Arc::new(OutcomeProcessor::new(Arc::clone(&store), Arc::clone(&logs), notifier));
        let scheduler = Arc::new(CheckScheduler::new(store, prober, processor, check_interval));
        let rotation = Arc::new(LogRotation::new(logs, rotation_interval));

        Self { scheduler, rotation }
    }

    /// Create an orchestrator from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(config).await?;
        Ok(Self::new(
            collaborators,
            Duration::from_secs(config.worker.check_interval_seconds.max(1)),
            Duration::from_secs(config.worker.log_rotation_interval_seconds.max(1)),
        ))
    }

    /// Start both loops. Aborting the returned handles stops the worker
    /// without draining in-flight probes.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!("Background workers are running");
        vec![
            Arc::clone(&self.scheduler).start(),
            Arc::clone(&self.rotation).start_periodic_rotation(),
        ]
    }
}
