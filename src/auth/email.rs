//! # Email Integration
//!
//! Outgoing mail for the password reset flow. SMTP delivery goes through
//! `lettre`; without SMTP settings a logging sender records the mail instead.

use std::sync::Arc;

use axum::async_trait;
use parking_lot::Mutex;

use crate::auth::errors::{AuthError, AuthResult};

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    /// Should come from secrets
    pub smtp_password: String,
    /// `Name <address>` or a bare address
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from: "Tourbook <hello@tourbook.local>".to_string(),
        }
    }
}

/// Email template types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    /// Password reset link, valid for ten minutes
    PasswordReset { user_email: String, reset_url: String },
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailTemplate {
    pub fn render(&self) -> RenderedEmail {
        match self {
            EmailTemplate::PasswordReset {
                user_email,
                reset_url,
            } => RenderedEmail {
                to: user_email.clone(),
                subject: "Your password reset token (valid for 10 min)".to_string(),
                body: format!(
                    "Forgot your password? Submit a PATCH request with your new password \
                     and passwordConfirm to: {reset_url}.\n\
                     If you didn't forget your password, please ignore this email!"
                ),
            },
        }
    }
}

/// Email sender trait for abstraction
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, template: EmailTemplate) -> AuthResult<()>;
}

/// Sender used when no SMTP server is configured: logs and keeps the mail
#[derive(Debug, Default)]
pub struct LogEmailSender {
    sent: Mutex<Vec<RenderedEmail>>,
}

impl LogEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mails sent so far
    pub fn sent(&self) -> Vec<RenderedEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, template: EmailTemplate) -> AuthResult<()> {
        let email = template.render();
        tracing::info!(to = %email.to, subject = %email.subject, "email not delivered: no SMTP transport configured");
        self.sent.lock().push(email);
        Ok(())
    }
}

/// SMTP email sender
pub struct SmtpEmailSender {
    config: EmailConfig,
    transport: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(config: EmailConfig) -> AuthResult<Self> {
        use lettre::{transport::smtp::authentication::Credentials, AsyncSmtpTransport, Tokio1Executor};

        let transport = if config.smtp_user.is_empty() {
            // No authentication (local development SMTP servers)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());

            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| AuthError::EmailTransport(format!("SMTP relay error: {}", e)))?
                .credentials(creds)
                .port(config.smtp_port)
                .build()
        };

        Ok(Self { config, transport })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, template: EmailTemplate) -> AuthResult<()> {
        use lettre::{message::header::ContentType, AsyncTransport, Message};

        let rendered = template.render();

        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| AuthError::EmailFailed(format!("Invalid from address: {}", e)))?,
            )
            .to(rendered
                .to
                .parse()
                .map_err(|e| AuthError::EmailFailed(format!("Invalid to address: {}", e)))?)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body)
            .map_err(|e| AuthError::EmailFailed(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AuthError::EmailFailed(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %rendered.to, "password reset email sent");
        Ok(())
    }
}

/// SMTP sender when configured, logging sender otherwise
pub fn create_email_sender(config: Option<EmailConfig>) -> AuthResult<Arc<dyn EmailSender>> {
    match config {
        Some(cfg) => Ok(Arc::new(SmtpEmailSender::new(cfg)?)),
        None => Ok(Arc::new(LogEmailSender::new())),
    }
}
