use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{Notifier, NotifyError, prepare_message};
use crate::config;

/// Sends alerts as SMS through the Twilio messages API
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: config::Twilio,
}

impl TwilioNotifier {
    pub fn new(config: config::Twilio) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, user_phone: &str, message: &str) -> Result<(), NotifyError> {
        let (phone, body) = prepare_message(user_phone, message)?;
        let to = format!("+1{phone}");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", self.config.from_phone.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(user = phone, "SMS accepted with status {}", status.as_u16());
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status: status.as_u16(), body })
        }
    }
}
