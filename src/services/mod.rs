pub mod auth;
pub mod email_validator;
pub mod password_reset_email_service;
pub mod password_reset_service;
pub mod reset_token;
pub mod reset_token_reaper;

pub use auth::*;
pub use email_validator::*;
pub use password_reset_email_service::*;
pub use password_reset_service::*;
pub use reset_token::*;
pub use reset_token_reaper::*;
