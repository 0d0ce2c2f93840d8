use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Duration, OffsetDateTime};

/// Response for every reset request, whether or not the account exists.
pub const RESET_REQUEST_MESSAGE: &str =
    "If an account exists with that email, a password reset link has been sent.";

pub const RESET_SUCCESS_MESSAGE: &str =
    "Password has been reset successfully. Please log in with your new password.";

/// Why a token stopped being valid before it expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenInvalidation {
    /// The token itself was used to change the password
    Redeemed,
    /// A newer token was issued for the same account
    Superseded,
    /// Another token for the same account was redeemed
    SiblingRedeemed,
}

impl TokenInvalidation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenInvalidation::Redeemed => "redeemed",
            TokenInvalidation::Superseded => "superseded",
            TokenInvalidation::SiblingRedeemed => "sibling_redeemed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "redeemed" => Some(TokenInvalidation::Redeemed),
            "superseded" => Some(TokenInvalidation::Superseded),
            "sibling_redeemed" => Some(TokenInvalidation::SiblingRedeemed),
            _ => None,
        }
    }
}

impl fmt::Display for TokenInvalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored record of an issued reset capability.
///
/// Only the keyed hash of the raw token is kept; the raw value leaves the
/// process exactly once, inside the reset link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub token_hash: String,
    pub account_id: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub used: bool,
    pub used_at: Option<OffsetDateTime>,
    pub invalidation: Option<TokenInvalidation>,
}

impl PasswordResetToken {
    pub fn new(account_id: String, token_hash: String, now: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            token_hash,
            account_id,
            created_at: now,
            expires_at: now + ttl,
            used: false,
            used_at: None,
            invalidation: None,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Unused and unexpired: the only state that authorizes a password change
    pub fn is_valid(&self, now: OffsetDateTime) -> bool {
        !self.used && !self.is_expired(now)
    }

    /// Used rows go immediately; expired rows are kept for `retention` first
    pub fn is_sweepable(&self, now: OffsetDateTime, retention: Duration) -> bool {
        self.used || self.expires_at <= now - retention
    }

    pub fn invalidate(&mut self, reason: TokenInvalidation, now: OffsetDateTime) {
        self.used = true;
        self.used_at = Some(now);
        self.invalidation = Some(reason);
    }
}

/// Raw reset token as handed to the delivery channel.
///
/// `Debug` is redacted so the value cannot end up in logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct RawResetToken(String);

impl RawResetToken {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawResetToken(<redacted>)")
    }
}

/// A freshly issued token together with where it has to be sent
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub account_id: String,
    pub email: String,
    pub token: RawResetToken,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl IssuedReset {
    pub fn ttl_minutes(&self) -> i64 {
        (self.expires_at - self.issued_at).whole_minutes()
    }
}

/// Outcome of a reset request. Callers outside the workflow only ever see
/// [`ResetIssuance::message`], which is the same in both cases.
#[derive(Debug, Clone)]
pub struct ResetIssuance {
    pub reset: Option<IssuedReset>,
}

impl ResetIssuance {
    pub fn issued(reset: IssuedReset) -> Self {
        Self { reset: Some(reset) }
    }

    pub fn not_issued() -> Self {
        Self { reset: None }
    }

    pub fn is_issued(&self) -> bool {
        self.reset.is_some()
    }

    pub fn message(&self) -> &'static str {
        RESET_REQUEST_MESSAGE
    }
}

// ==================== HTTP payloads ====================

#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestPasswordResetResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResetTokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResetTokenResponse {
    pub valid: bool,
}
