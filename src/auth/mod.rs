//! # Auth Module
//!
//! Password hashing, JWT issuing and checking, role restriction and the
//! email-based password reset.

pub mod crypto;
pub mod email;
pub mod errors;
pub mod jwt;
pub mod service;

pub use email::{create_email_sender, EmailConfig, EmailSender, EmailTemplate, LogEmailSender};
pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtClaims, JwtConfig, JwtManager};
pub use service::{AuthService, IssuedToken, RESET_TOKEN_TTL_MINUTES};
