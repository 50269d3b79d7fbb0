/// Alert delivery to check owners
pub mod twilio;

pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Longest body an SMS provider accepts for one message
pub const MAX_MESSAGE_LENGTH: usize = 1600;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("recipient must be a 10 character phone number, got {0:?}")]
    InvalidRecipient(String),
    #[error("message must be between 1 and 1600 characters")]
    InvalidMessage,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a short text message to a user
    async fn send(&self, user_phone: &str, message: &str) -> Result<(), NotifyError>;
}

/// Validate and trim recipient and message the way SMS delivery expects
pub fn prepare_message<'a>(
    user_phone: &'a str,
    message: &'a str,
) -> Result<(&'a str, &'a str), NotifyError> {
    let phone = user_phone.trim();
    if phone.chars().count() != 10 {
        return Err(NotifyError::InvalidRecipient(user_phone.to_string()));
    }

    let message = message.trim();
    let length = message.chars().count();
    if length == 0 || length > MAX_MESSAGE_LENGTH {
        return Err(NotifyError::InvalidMessage);
    }

    Ok((phone, message))
}

/// Notifier used when no SMS provider is configured; alerts only reach the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, user_phone: &str, message: &str) -> Result<(), NotifyError> {
        let (phone, message) = prepare_message(user_phone, message)?;
        info!(user = phone, "Alert (no SMS provider configured): {}", message);
        Ok(())
    }
}
