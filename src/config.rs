use std::env;
use std::str::FromStr;

use log::info;
use url::Url;

/// Delivery channels enabled for reset notifications.
/// Decided once at configuration load, never re-parsed per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMethod {
    Email,
    Webhook,
    Both,
}

impl NotifyMethod {
    pub fn email_enabled(self) -> bool {
        matches!(self, NotifyMethod::Email | NotifyMethod::Both)
    }

    pub fn webhook_enabled(self) -> bool {
        matches!(self, NotifyMethod::Webhook | NotifyMethod::Both)
    }
}

impl FromStr for NotifyMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(NotifyMethod::Email),
            "webhook" => Ok(NotifyMethod::Webhook),
            "both" => Ok(NotifyMethod::Both),
            other => Err(format!(
                "Invalid NOTIFICATION_METHOD '{other}' (expected email, webhook, or both)"
            )),
        }
    }
}

/// Runtime configuration for the monitor.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub method: NotifyMethod,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub recipient_email: Option<String>,
    pub webhook_url: Option<String>,
    pub sleep_buffer_secs: u64,
    pub max_retry_delay_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - API_URL [required]
    /// - NOTIFICATION_METHOD: email | webhook | both (default: email)
    /// - SMTP_HOST (default: smtp.gmail.com), SMTP_PORT (default: 587)
    /// - SMTP_USER, SMTP_PASSWORD, RECIPIENT_EMAIL [required for email]
    /// - WEBHOOK_URL [required for webhook]
    /// - SLEEP_BUFFER (default: 5), MAX_RETRY_DELAY (default: 300)
    /// - HTTP_TIMEOUT_SECS (default: 10)
    /// - USER_AGENT (default: reset-monitor/<version>)
    pub fn from_env() -> Result<Self, String> {
        let api_url = env::var("API_URL").map_err(|_| "Missing API_URL".to_string())?;
        Url::parse(&api_url).map_err(|e| format!("Invalid API_URL: {e}"))?;

        let method = env::var("NOTIFICATION_METHOD")
            .unwrap_or_else(|_| "email".to_string())
            .parse::<NotifyMethod>()?;

        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(587);
        let smtp_user = env::var("SMTP_USER").ok().filter(|s| !s.is_empty());
        let smtp_password = env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty());
        let recipient_email = env::var("RECIPIENT_EMAIL").ok().filter(|s| !s.is_empty());
        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        let sleep_buffer_secs = env::var("SLEEP_BUFFER")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5);
        let max_retry_delay_secs = env::var("MAX_RETRY_DELAY")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);
        let timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let default_ua = format!(
            "reset-monitor/{}",
            env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into())
        );
        let user_agent = env::var("USER_AGENT").unwrap_or(default_ua);

        let cfg = Self {
            api_url,
            method,
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_password,
            recipient_email,
            webhook_url,
            sleep_buffer_secs,
            max_retry_delay_secs,
            timeout_secs,
            user_agent,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// The selected notification method must have its credentials present
    /// before the loop starts; a half-configured channel is a startup error,
    /// not something to discover at the first reset.
    fn validate(&self) -> Result<(), String> {
        if self.method.email_enabled()
            && (self.smtp_user.is_none()
                || self.smtp_password.is_none()
                || self.recipient_email.is_none())
        {
            return Err(
                "Email notification requires SMTP_USER, SMTP_PASSWORD and RECIPIENT_EMAIL; \
                 set them or switch NOTIFICATION_METHOD to webhook"
                    .to_string(),
            );
        }
        if self.method.webhook_enabled() {
            match &self.webhook_url {
                None => {
                    return Err(
                        "Webhook notification requires WEBHOOK_URL; \
                         set it or switch NOTIFICATION_METHOD to email"
                            .to_string(),
                    )
                }
                Some(u) => {
                    Url::parse(u).map_err(|e| format!("Invalid WEBHOOK_URL: {e}"))?;
                }
            }
        }
        Ok(())
    }

    /// Log the effective configuration. The credential secret is withheld.
    pub fn log_summary(&self) {
        info!("configuration loaded:");
        info!("  API URL: {}", self.api_url);
        info!("  notification method: {:?}", self.method);
        if self.method.email_enabled() {
            if let (Some(user), Some(to)) = (&self.smtp_user, &self.recipient_email) {
                info!("  email: {user} -> {to} via {}:{}", self.smtp_host, self.smtp_port);
            }
        }
        if self.method.webhook_enabled() {
            if let Some(url) = &self.webhook_url {
                info!("  webhook: {url}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_and_flags() {
        let email: NotifyMethod = "email".parse().unwrap();
        assert!(email.email_enabled());
        assert!(!email.webhook_enabled());

        let webhook: NotifyMethod = "webhook".parse().unwrap();
        assert!(!webhook.email_enabled());
        assert!(webhook.webhook_enabled());

        let both: NotifyMethod = "both".parse().unwrap();
        assert!(both.email_enabled());
        assert!(both.webhook_enabled());

        assert!("pager".parse::<NotifyMethod>().is_err());
    }
}
