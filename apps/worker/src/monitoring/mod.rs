/// Check-execution core
///
/// This module is responsible for:
/// - Validating raw check records
/// - Probing HTTP/HTTPS endpoints within each check's timeout
/// - Deriving state transitions, persisting them and alerting owners
/// - Scheduling all of the above on a fixed interval
pub mod checker;
pub mod processor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use processor::OutcomeProcessor;
pub use scheduler::CheckScheduler;
