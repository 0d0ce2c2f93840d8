use crate::models::IssuedReset;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to build email message: {0}")]
    MessageBuildError(String),

    #[error("Failed to send email: {0}")]
    SendError(String),
}

/// Out-of-band channel that carries the reset link to the account owner
#[async_trait]
pub trait ResetDelivery: Send + Sync {
    async fn deliver(&self, reset: &IssuedReset) -> Result<(), DeliveryError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
