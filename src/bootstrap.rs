use crate::api::middleware::AppState;
use crate::config::Config;
use crate::database::Database;
use crate::domain::ports::account_repository::AccountRepository;
use crate::domain::ports::password_reset_repository::PasswordResetRepository;
use crate::domain::ports::reset_delivery::{DeliveryError, ResetDelivery};
use crate::domain::ports::time_service::TimeService;
use crate::events::RecoveryEventBus;
use crate::infrastructure::runtime::TokioTimeService;
use crate::services::{
    LogResetDelivery, PasswordResetService, ReaperSettings, ResetSettings, ResetTokenHasher,
    ResetTokenReaper, SmtpResetMailer,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Invalid RESET_TOKEN_PEPPER")]
    InvalidPepper,

    #[error("Email delivery setup failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Wire the recovery services over one database and start the reaper
pub async fn build_app_state(db: Database, config: &Config) -> Result<AppState, BootstrapError> {
    let clock = Arc::new(TokioTimeService::new()) as Arc<dyn TimeService>;
    let tokens = Arc::new(db.clone()) as Arc<dyn PasswordResetRepository>;
    let accounts = Arc::new(db) as Arc<dyn AccountRepository>;

    let event_bus = RecoveryEventBus::default();

    let hasher = ResetTokenHasher::new(config.token_pepper.as_bytes())
        .map_err(|_| BootstrapError::InvalidPepper)?;

    let password_reset_service = PasswordResetService::new(
        tokens.clone(),
        accounts,
        hasher,
        ResetSettings::from_config(config),
    )
    .with_clock(clock.clone())
    .with_events(event_bus.clone());
    tracing::info!(
        "Password reset service initialized ({} minute tokens)",
        config.token_ttl_minutes
    );

    let reset_delivery: Arc<dyn ResetDelivery> = match &config.smtp {
        Some(smtp) => {
            tracing::info!("Password reset links delivered via SMTP ({})", smtp.host);
            Arc::new(SmtpResetMailer::new(smtp, &config.reset_base_url)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; password reset links will not be sent");
            Arc::new(LogResetDelivery)
        }
    };

    // Start reset token reaper background task
    let reaper = ResetTokenReaper::new(tokens, clock, ReaperSettings::from_config(&config.store))
        .with_events(event_bus.clone());
    tokio::spawn(reaper.run());

    Ok(AppState {
        password_reset_service,
        reset_delivery,
        event_bus,
    })
}
