use std::sync::Arc;

use crate::{
    domain::ports::reset_delivery::ResetDelivery, events::RecoveryEventBus,
    services::PasswordResetService,
};

#[derive(Clone)]
pub struct AppState {
    pub password_reset_service: PasswordResetService,
    pub reset_delivery: Arc<dyn ResetDelivery>,
    pub event_bus: RecoveryEventBus,
}
