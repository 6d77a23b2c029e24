use serde_json::json;
use std::time::Duration;
use tracing::error;

use crate::config::EmailConfig;

// Клиент почтового API. Письма - побочный эффект "отправил и забыл":
// сбой доставки логируется и никогда не валит вызвавшую операцию.
#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailClient {
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let result = self
            .http_client
            .post(format!("{}/send", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        if let Err(e) = result {
            error!("Failed to send email to {}: {:?}", to, e);
        }
    }
}
