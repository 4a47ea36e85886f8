//! Email transports.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use souk_common::config::EmailConfig;

/// A rendered email ready to hand to a transport.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email provider rejected the message: {status}")]
    Rejected { status: u16 },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("email provider misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Writes emails to the log instead of sending them. Default in development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email (log provider)");
        Ok(())
    }
}

/// Posts emails as JSON to a transactional email API with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let mut request = self.client.post(&self.url).json(email);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Build the mailer named by `email.provider`.
pub fn from_config(cfg: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match cfg.provider.as_str() {
        "log" => Ok(Arc::new(LogMailer)),
        "http" => {
            let url = cfg
                .api_url
                .clone()
                .ok_or_else(|| MailError::Config("email.api_url is required for the http provider".into()))?;
            Ok(Arc::new(HttpMailer::new(url, cfg.api_key.clone())))
        }
        other => Err(MailError::Config(format!("unknown email provider '{other}'"))),
    }
}
