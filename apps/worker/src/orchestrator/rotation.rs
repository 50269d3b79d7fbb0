//! Periodic compaction of live check logs.
//!
//! Each live log is compressed into a new archive named
//! `<logId>-<epochMillis>` and then truncated. Archives are kept forever.
//! The rotation runs once at startup and then once per interval (daily by
//! default) as a background task.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::logs::{LogSink, archive_id};

/// Counts from one rotation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub compacted: usize,
    pub failed: usize,
}

/// Compacts every live log on a fixed interval
pub struct LogRotation {
    logs: Arc<dyn LogSink>,
    period: Duration,
}

impl LogRotation {
    pub fn new(logs: Arc<dyn LogSink>, period: Duration) -> Self {
        Self { logs, period }
    }

    /// Compress and truncate all live logs.
    ///
    /// A log that fails to compress is left untouched so nothing is lost; it
    /// is picked up again on the next pass. Appends racing a pass land either
    /// in the new archive or in the emptied live log.
    pub async fn rotate_all(&self) -> RotationReport {
        let mut report = RotationReport::default();

        let log_ids = match self.logs.list(false).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list logs to rotate: {}", e);
                return report;
            }
        };

        if log_ids.is_empty() {
            debug!("No logs to rotate");
            return report;
        }

        for log_id in log_ids {
            let archive = archive_id(&log_id, chrono::Utc::now().timestamp_millis());

            match self.logs.compact(&log_id, &archive).await {
                Ok(()) => {
                    debug!(log_id = %log_id, archive_id = %archive, "Log compacted");
                    report.compacted += 1;
                }
                Err(e) => {
                    warn!(log_id = %log_id, archive_id = %archive, "Error compacting log: {}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Start background rotation; the first pass runs immediately
    pub fn start_periodic_rotation(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Log rotation loop started, interval {:?}", self.period);
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let report = self.rotate_all().await;
                if report.failed > 0 {
                    warn!("Log rotation finished: {} compacted, {} failed", report.compacted, report.failed);
                } else {
                    debug!("Log rotation finished: {} compacted", report.compacted);
                }
            }
        })
    }
}
