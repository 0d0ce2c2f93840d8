/// Delivery of password reset links
///
/// The issuer never talks to SMTP itself; the request workflow hands the
/// issued token to [`dispatch_reset_link`], which delivers it in the
/// background. A failed delivery is logged and published but the token stays
/// valid for its whole lifetime.
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use metrics::counter;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::{
    config::SmtpConfig,
    domain::ports::reset_delivery::{DeliveryError, ResetDelivery},
    events::{RecoveryEvent, RecoveryEventBus},
    models::IssuedReset,
};

pub fn reset_link(base_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", base_url.trim_end_matches('/'), token)
}

fn reset_email_body(link: &str, ttl_minutes: i64) -> String {
    format!(
        "You requested a password reset for your RentalHub account.\n\n\
         Click the link below to reset your password:\n\
         {}\n\n\
         This link will expire in {} minutes and can be used once.\n\n\
         If you did not request a password reset, please ignore this email.",
        link, ttl_minutes
    )
}

/// SMTP delivery via STARTTLS relay
pub struct SmtpResetMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    reset_base_url: String,
}

impl SmtpResetMailer {
    pub fn new(config: &SmtpConfig, reset_base_url: &str) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DeliveryError::SendError(format!("Failed to create SMTP transport: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_address: format!("{} <{}>", config.from_name, config.from_email),
            reset_base_url: reset_base_url.to_string(),
        })
    }
}

#[async_trait]
impl ResetDelivery for SmtpResetMailer {
    async fn deliver(&self, reset: &IssuedReset) -> Result<(), DeliveryError> {
        let link = reset_link(&self.reset_base_url, reset.token.expose());

        let email = Message::builder()
            .from(self.from_address.parse().map_err(|e| {
                DeliveryError::MessageBuildError(format!("Invalid from address: {}", e))
            })?)
            .to(reset.email.parse().map_err(|e| {
                DeliveryError::MessageBuildError(format!("Invalid to address: {}", e))
            })?)
            .subject("Password Reset Request")
            .header(ContentType::TEXT_PLAIN)
            .body(reset_email_body(&link, reset.ttl_minutes()))
            .map_err(|e| DeliveryError::MessageBuildError(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::SendError(format!("SMTP send error: {}", e)))?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "smtp"
    }
}

/// Used when no SMTP server is configured. The link is dropped; only the
/// fact that one was produced is logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogResetDelivery;

#[async_trait]
impl ResetDelivery for LogResetDelivery {
    async fn deliver(&self, reset: &IssuedReset) -> Result<(), DeliveryError> {
        tracing::warn!(
            account_id = %reset.account_id,
            "SMTP not configured; password reset link was not sent"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "log"
    }
}

/// Keeps delivered links in memory, for tests and local tooling
#[derive(Clone, Default)]
pub struct RecordingResetDelivery {
    sent: Arc<Mutex<Vec<IssuedReset>>>,
    /// If true, simulate delivery failures
    pub should_fail: bool,
}

impl RecordingResetDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<IssuedReset> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ResetDelivery for RecordingResetDelivery {
    async fn deliver(&self, reset: &IssuedReset) -> Result<(), DeliveryError> {
        if self.should_fail {
            return Err(DeliveryError::SendError("Mock delivery failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reset.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Deliver an issued reset link off the request path
pub fn dispatch_reset_link(
    delivery: Arc<dyn ResetDelivery>,
    events: RecoveryEventBus,
    reset: IssuedReset,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let provider = delivery.provider_name();
        match delivery.deliver(&reset).await {
            Ok(()) => {
                tracing::info!(
                    account_id = %reset.account_id,
                    provider,
                    "Password reset link dispatched"
                );
                events.publish(RecoveryEvent::ResetLinkDelivered {
                    account_id: reset.account_id,
                    provider,
                });
            }
            Err(e) => {
                tracing::error!(
                    account_id = %reset.account_id,
                    provider,
                    "Failed to deliver password reset link: {}",
                    e
                );
                counter!("password_reset_delivery_failures_total").increment(1);
                events.publish(RecoveryEvent::DeliveryFailed {
                    account_id: reset.account_id,
                    provider,
                    timestamp: reset.issued_at,
                });
            }
        }
    })
}
