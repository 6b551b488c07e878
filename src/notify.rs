//! Delivery of the rendered report through the notification service.

use crate::config::NotifyConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};

pub struct NotifyClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl NotifyClient {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Post the HTML report to the notification service. A non-success
    /// status is a delivery error; the caller decides whether that fails
    /// the run.
    pub async fn send_report(
        &self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<()> {
        debug!(recipients = recipients.len(), subject, "delivering report");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body(recipients, subject, html))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Delivery(format!(
                "notify service returned {}",
                response.status()
            )));
        }

        info!("report delivered to {} recipient(s)", recipients.len());
        Ok(())
    }
}

/// The notify service expects a comma-joined recipient string and the
/// subject/body pair under `content`.
fn request_body(recipients: &[String], subject: &str, html: &str) -> serde_json::Value {
    serde_json::json!({
        "recipients": recipients.join(","),
        "content": {
            "subject": subject,
            "body": html,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let recipients = vec!["ops@gov.bc.ca".to_string(), "registry@gov.bc.ca".to_string()];
        let body = request_body(&recipients, "Daily Report", "<html></html>");

        assert_eq!(body["recipients"], "ops@gov.bc.ca,registry@gov.bc.ca");
        assert_eq!(body["content"]["subject"], "Daily Report");
        assert_eq!(body["content"]["body"], "<html></html>");
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = NotifyConfig {
            api_url: "https://notify.example.com/api/v1/notify".to_string(),
            api_key: "secret".to_string(),
            recipients: vec!["ops@gov.bc.ca".to_string()],
        };
        assert!(NotifyClient::new(&config).is_ok());
    }
}
