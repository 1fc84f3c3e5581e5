use std::time::Duration;

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info, warn};
use serde::Serialize;

use crate::config::Config;

/// Outbound webhook document. Field names and shapes are a stable wire
/// contract; external receivers depend on them.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub reset_type: String,
    pub reset_time: String,
    pub utilization: f64,
    pub message: String,
    pub timestamp: String,
}

/// Fans reset events out to the enabled delivery channels. Stateless;
/// every channel failure is caught, logged and reported as a boolean.
/// A notification can never halt monitoring.
pub struct Notifier {
    cfg: Config,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(cfg: Config, client: reqwest::Client) -> Self {
        Self { cfg, client }
    }

    /// Deliver a reset event through every enabled channel. Channels are
    /// attempted independently; one failing does not block the other.
    pub async fn notify(&self, bucket_id: &str, reset_at: DateTime<Utc>, utilization: f64) {
        if self.cfg.method.email_enabled() {
            let subject = format!("API reset: {bucket_id}");
            let body = format!(
                "API Reset Notification\n\
                 ======================\n\n\
                 Reset type: {bucket_id}\n\
                 Reset time: {}\n\
                 Previous utilization: {utilization}%\n\n\
                 The API has been reset and is ready for new requests.\n\n\
                 ---\n\
                 Automated notification from reset-monitor\n",
                reset_at.to_rfc3339()
            );
            self.send_email(&subject, &body).await;
        }
        if self.cfg.method.webhook_enabled() {
            let payload = WebhookPayload {
                reset_type: bucket_id.to_string(),
                reset_time: reset_at.to_rfc3339(),
                utilization,
                message: format!("API reset: {bucket_id}"),
                timestamp: Utc::now().to_rfc3339(),
            };
            self.send_webhook(&payload).await;
        }
    }

    /// Submit over STARTTLS. Missing credentials skip the channel with a
    /// warning rather than failing: webhook-only setups stay valid.
    async fn send_email(&self, subject: &str, body: &str) -> bool {
        let (Some(user), Some(password), Some(recipient)) = (
            self.cfg.smtp_user.as_deref(),
            self.cfg.smtp_password.as_deref(),
            self.cfg.recipient_email.as_deref(),
        ) else {
            warn!("email credentials not configured, skipping email notification");
            return false;
        };
        match self.submit(user, password, recipient, subject, body).await {
            Ok(()) => {
                info!("email sent: {subject}");
                true
            }
            Err(e) => {
                error!("failed to send email: {e:#}");
                false
            }
        }
    }

    async fn submit(
        &self,
        user: &str,
        password: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(user.parse::<Mailbox>()?)
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject)
            .body(body.to_string())?;
        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.cfg.smtp_host)?
                .port(self.cfg.smtp_port)
                .credentials(Credentials::new(user.to_string(), password.to_string()))
                .timeout(Some(Duration::from_secs(self.cfg.timeout_secs)))
                .build();
        mailer.send(email).await?;
        Ok(())
    }

    async fn send_webhook(&self, payload: &WebhookPayload) -> bool {
        let Some(url) = self.cfg.webhook_url.as_deref() else {
            warn!("webhook URL not configured, skipping webhook notification");
            return false;
        };
        match self.client.post(url).json(payload).send().await {
            Ok(res) if res.status().is_success() => {
                info!("webhook delivered to {url}");
                true
            }
            Ok(res) => {
                error!("webhook to {url} returned status {}", res.status());
                false
            }
            Err(e) => {
                error!("failed to send webhook: {e}");
                false
            }
        }
    }
}
