//! Domain service for the account lifecycle.
//!
//! Covers registration, email verification, login, and password reset. The
//! trait is the seam between HTTP handlers and storage.

use thiserror::Error;

use crate::entities::users;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is banned")]
    Banned { reason: String },

    #[error("Email not verified")]
    NotVerified { email: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or expired verification code")]
    InvalidCode,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A signed session plus the user it belongs to.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub token: String,
    pub user: users::Model,
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an unverified local account, allocates the next UID (the
    /// first ever becomes the owner), creates its empty profile, and emails
    /// a 6-digit verification code valid for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Conflict`] when the username or email is
    /// taken, compared case-insensitively.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<users::Model, AccountError>;

    /// Consumes a verification code: marks the user verified, deletes every
    /// outstanding code for them, and signs a session token.
    async fn verify_email(&self, email: &str, code: &str)
    -> Result<AuthenticatedUser, AccountError>;

    /// Replaces outstanding codes with a fresh one on a new 5-minute clock.
    async fn resend_code(&self, email: &str) -> Result<(), AccountError>;

    /// Case-insensitive lookup by username or email. Bans and unverified
    /// accounts are reported before a token is ever signed.
    async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AccountError>;

    /// Always succeeds from the caller's point of view, whether or not the
    /// email is registered. When it is, a one-hour reset token is issued and
    /// only its SHA-256 digest is persisted.
    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError>;

    /// Redeems a reset token. The token row is deleted on first use, so a
    /// replay fails.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError>;

    /// Clears legacy session rows. The bearer token itself stays valid until
    /// natural expiry.
    async fn logout(&self, user_id: i32) -> Result<(), AccountError>;
}
