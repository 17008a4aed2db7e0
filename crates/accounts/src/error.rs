use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format: expected <payload>.<signature>")]
    InvalidFormat,
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("User not found")]
    NotFound,
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}
