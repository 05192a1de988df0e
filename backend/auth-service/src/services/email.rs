/// Email delivery for verification and password reset codes
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::error::{AuthError, Result};

/// Async SMTP transport wrapper. Without an SMTP host configured it runs
/// in no-op mode: nothing is sent and codes are logged at debug level so
/// local flows stay exercisable.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = match &config.smtp_host {
            None => {
                warn!("SMTP host not configured; email service will operate in no-op mode");
                None
            }
            Some(host) => {
                let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| {
                        AuthError::Internal(format!("Failed to configure SMTP transport: {}", e))
                    })?
                    .port(config.smtp_port);

                let builder = if let (Some(username), Some(password)) =
                    (&config.smtp_username, &config.smtp_password)
                {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                } else {
                    builder
                };

                Some(Arc::new(builder.build()))
            }
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send the 6-digit verification code for a new registration.
    pub async fn send_verification_code(
        &self,
        recipient: &str,
        username: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        let subject = "Verify your Devsearch account";
        let body = format!(
            "Hi {},\n\nWelcome to Devsearch! Your email verification code is:\n\n{}\n\nThe code expires in {} minutes.\n\nIf you did not create this account, please ignore this email.",
            username, code, ttl_minutes
        );
        self.send_mail(recipient, subject, &body, Some(code)).await
    }

    /// Send the 6-digit password reset code.
    pub async fn send_password_reset_code(
        &self,
        recipient: &str,
        username: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        let subject = "Devsearch password reset";
        let body = format!(
            "Hi {},\n\nWe received a request to reset your Devsearch password. Your reset code is:\n\n{}\n\nThe code expires in {} minutes.\n\nIf you did not request this, please ignore this email. Your account is unchanged.",
            username, code, ttl_minutes
        );
        self.send_mail(recipient, subject, &body, Some(code)).await
    }

    /// Greet an account that just completed verification.
    pub async fn send_welcome(&self, recipient: &str, username: &str) -> Result<()> {
        let subject = "Welcome to Devsearch";
        let body = format!(
            "Hi {},\n\nYour email address is verified and your account is active. Happy building!\n\nThe Devsearch Team",
            username
        );
        self.send_mail(recipient, subject, &body, None).await
    }

    async fn send_mail(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        code: Option<&str>,
    ) -> Result<()> {
        match &self.transport {
            Some(transport) => {
                let to = recipient.parse::<Mailbox>().map_err(|e| {
                    AuthError::Internal(format!("Invalid recipient email address: {}", e))
                })?;

                let email = Message::builder()
                    .from(self.from.clone())
                    .to(to)
                    .subject(subject)
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(body.to_string())
                    .map_err(|e| {
                        AuthError::Internal(format!("Failed to build email message: {}", e))
                    })?;

                transport
                    .send(email)
                    .await
                    .map_err(|e| AuthError::Email(format!("Failed to send email: {}", e)))?;
                info!(subject, "email sent");
            }
            None => {
                info!(subject, "email service in no-op mode; skipping send");
                if let Some(code) = code {
                    debug!(code, "one-time code for disabled mail transport");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_config() -> EmailConfig {
        EmailConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@devsearch.dev".to_string(),
        }
    }

    #[test]
    fn test_noop_mode_without_smtp_host() {
        let service = EmailService::new(&noop_config()).unwrap();
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_noop_send_succeeds() {
        let service = EmailService::new(&noop_config()).unwrap();
        let result = service
            .send_verification_code("user@example.com", "user", "123456", 5)
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_from_address_is_rejected() {
        let mut config = noop_config();
        config.smtp_from = "not an address".to_string();
        assert!(EmailService::new(&config).is_err());
    }
}
