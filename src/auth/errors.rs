//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ==================
    // Login Errors
    // ==================

    /// Login body lacks email or password
    #[error("Please provide email and password!")]
    MissingCredentials,

    /// Unknown email or wrong password
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// `updateMyPassword` with a wrong current password
    #[error("Your current password is wrong.")]
    WrongCurrentPassword,

    // ==================
    // Token Errors
    // ==================

    /// No bearer token on a protected route
    #[error("You are not logged in! Please log in to get access.")]
    NotLoggedIn,

    /// JWT is malformed or signed with another key
    #[error("Invalid token. Please log in again!")]
    InvalidToken,

    /// JWT is past its expiry
    #[error("Your token has expired! Please log in again.")]
    TokenExpired,

    /// Token subject no longer exists or was deactivated
    #[error("The user belonging to this token does no longer exist.")]
    UserGone,

    /// Token issued before the last password change
    #[error("User recently changed password! Please log in again.")]
    PasswordChanged,

    // ==================
    // Authorization Errors
    // ==================

    /// Role not allowed on this route
    #[error("You do not have permission to perform this action")]
    Forbidden,

    // ==================
    // Password Reset Errors
    // ==================

    /// `forgotPassword` for an unknown address
    #[error("There is no user with that email address.")]
    UnknownEmail,

    /// Reset token unknown or older than its validity window
    #[error("Token is invalid or has expired")]
    ResetTokenInvalid,

    /// The reset email could not be delivered
    #[error("There was an error sending the email. Try again later!")]
    EmailFailed(String),

    // ==================
    // Internal Errors
    // ==================

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    /// Misconfigured mail transport
    #[error("Email transport error: {0}")]
    EmailTransport(String),

    /// The users collection rejected a read or write
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::MissingCredentials => 400,
            AuthError::ResetTokenInvalid => 400,

            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::WrongCurrentPassword => 401,
            AuthError::NotLoggedIn => 401,
            AuthError::InvalidToken => 401,
            AuthError::TokenExpired => 401,
            AuthError::UserGone => 401,
            AuthError::PasswordChanged => 401,

            // 403 Forbidden
            AuthError::Forbidden => 403,

            // 404 Not Found
            AuthError::UnknownEmail => 404,

            // 500 Internal Server Error
            AuthError::EmailFailed(_) => 500,
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
            AuthError::EmailTransport(_) => 500,

            AuthError::Store(err) => err.status_code(),
        }
    }

    /// Whether the message is meant for the client. A failed reset email is
    /// reported to the client even though it is a server-side failure.
    pub fn is_operational(&self) -> bool {
        match self {
            AuthError::Store(err) => err.is_operational(),
            AuthError::EmailFailed(_) => true,
            _ => self.status_code() < 500,
        }
    }
}
