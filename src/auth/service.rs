//! # Auth Service
//!
//! Signup, login, token checks and the password reset flow on top of the
//! users collection.
//!
//! ## Reset flow
//! 1. `forgot_password` stores the SHA-256 digest of a random token with a ten
//!    minute expiry and mails the raw token to the user.
//! 2. `reset_password` looks the digest up among unexpired tokens, sets the
//!    new password and clears the token.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use super::crypto::{constant_time_str_eq, generate_token, hash_token, verify_password};
use super::email::{EmailSender, EmailTemplate};
use super::errors::{AuthError, AuthResult};
use super::jwt::JwtManager;
use crate::models::user::{self, Role, User};
use crate::query::{Filter, Projection, QuerySpec, Queryable};
use crate::store::schema::format_date;
use crate::store::{Collection, Validation, ID_FIELD};

/// How long a password reset token stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Fields a signup may set; everything else, `role` included, is ignored
const SIGNUP_FIELDS: [&str; 4] = ["name", "email", "password", "passwordConfirm"];

/// A freshly signed token together with the user it was issued for
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user: Value,
}

/// Authentication over the users collection
#[derive(Clone)]
pub struct AuthService {
    users: Arc<Collection>,
    jwt: JwtManager,
    email: Arc<dyn EmailSender>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("jwt", &self.jwt).finish()
    }
}

impl AuthService {
    pub fn new(users: Arc<Collection>, jwt: JwtManager, email: Arc<dyn EmailSender>) -> Self {
        Self { users, jwt, email }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    fn issue(&self, user: Value) -> AuthResult<IssuedToken> {
        let id = user
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or(AuthError::TokenGenerationFailed)?;
        let token = self.jwt.sign(id)?;
        Ok(IssuedToken { token, user })
    }

    /// Create a user with the default role and sign them in
    pub fn signup(&self, body: &Map<String, Value>) -> AuthResult<IssuedToken> {
        let fields = user::filter_fields(body, &SIGNUP_FIELDS);
        let created = self.users.insert(Value::Object(fields), Validation::Run)?;
        tracing::info!(user = ?created.get(ID_FIELD), "user signed up");
        self.issue(created)
    }

    /// Check credentials and sign a token
    pub fn login(&self, email: Option<&str>, password: Option<&str>) -> AuthResult<String> {
        let (Some(email), Some(password)) = (
            email.filter(|e| !e.is_empty()),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingCredentials);
        };

        let found = self.users.find_one(
            Filter::eq("email", email.trim().to_lowercase()),
            Some(&Projection::parse("+password")),
        )?;

        let Some(found) = found else {
            tracing::warn!("login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        let user = User::from_document(found)?;
        if !user.password.as_deref().is_some_and(|hash| verify_password(password, hash)) {
            tracing::warn!(user = %user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.jwt.sign(&user.id)
    }

    /// Resolve a bearer token to a current user
    pub fn protect(&self, token: Option<&str>) -> AuthResult<User> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::NotLoggedIn)?;
        let claims = self.jwt.verify(token)?;

        let current = self
            .users
            .find_by_id(&claims.sub)
            .map_err(|_| AuthError::InvalidToken)?
            .ok_or(AuthError::UserGone)?;
        let user = User::from_document(current)?;

        if user.changed_password_after(claims.iat) {
            return Err(AuthError::PasswordChanged);
        }
        Ok(user)
    }

    /// Forbid users whose role is not listed
    pub fn restrict_to(user: &User, roles: &[Role]) -> AuthResult<()> {
        if user.has_role(roles) {
            Ok(())
        } else {
            tracing::warn!(user = %user.id, role = %user.role, "access denied");
            Err(AuthError::Forbidden)
        }
    }

    /// Mail a reset link to the owner of `email`. `base_url` is the scheme and
    /// host the link points at.
    pub async fn forgot_password(&self, email: Option<&str>, base_url: &str) -> AuthResult<()> {
        let email = email.unwrap_or_default().trim().to_lowercase();
        let found = self
            .users
            .find_one(Filter::eq("email", email.as_str()), None)?
            .ok_or(AuthError::UnknownEmail)?;
        let user = User::from_document(found)?;

        let reset_token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users.update_by_id(
            &user.id,
            json!({
                "passwordResetToken": hash_token(&reset_token),
                "passwordResetExpiresAt": format_date(expires_at),
            }),
            Validation::Skip,
        )?;

        let template = EmailTemplate::PasswordReset {
            user_email: user.email.clone(),
            reset_url: format!(
                "{}/api/v1/users/resetPassword/{reset_token}",
                base_url.trim_end_matches('/')
            ),
        };

        if let Err(err) = self.email.send(template).await {
            tracing::error!(user = %user.id, error = %err, "reset email failed");
            self.users.update_by_id(
                &user.id,
                json!({"passwordResetToken": null, "passwordResetExpiresAt": null}),
                Validation::Skip,
            )?;
            return Err(match err {
                AuthError::EmailFailed(reason) | AuthError::EmailTransport(reason) => AuthError::EmailFailed(reason),
                other => other,
            });
        }
        Ok(())
    }

    /// Set a new password with a mailed reset token
    pub fn reset_password(
        &self,
        reset_token: &str,
        password: Option<&Value>,
        password_confirm: Option<&Value>,
    ) -> AuthResult<IssuedToken> {
        let digest = hash_token(reset_token);
        let unexpired = Filter::eq(
            "passwordResetExpiresAt",
            json!({"$gt": format_date(Utc::now())}),
        );
        let candidates = QuerySpec::new()
            .find(unexpired)
            .select(Projection::parse("+passwordResetToken"));
        let owner = self
            .users
            .run(&candidates)?
            .into_iter()
            .find(|doc| {
                doc.get("passwordResetToken")
                    .and_then(Value::as_str)
                    .is_some_and(|stored| constant_time_str_eq(stored, &digest))
            })
            .ok_or(AuthError::ResetTokenInvalid)?;
        let id = owner
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or(AuthError::ResetTokenInvalid)?;

        let updated = self
            .users
            .update_by_id(
                id,
                json!({
                    "password": password.cloned().unwrap_or(Value::Null),
                    "passwordConfirm": password_confirm.cloned().unwrap_or(Value::Null),
                    "passwordResetToken": null,
                    "passwordResetExpiresAt": null,
                }),
                Validation::Run,
            )?
            .ok_or(AuthError::ResetTokenInvalid)?;

        tracing::info!(user = %id, "password reset");
        self.issue(updated)
    }

    /// Change the password of a logged-in user who knows the current one
    pub fn update_password(
        &self,
        user_id: &str,
        current: Option<&str>,
        password: Option<&Value>,
        password_confirm: Option<&Value>,
    ) -> AuthResult<IssuedToken> {
        let stored = self
            .users
            .find_by_id_with(user_id, Some(&Projection::parse("+password")))?
            .ok_or(AuthError::UserGone)?;
        let user = User::from_document(stored)?;

        let current_matches = match (current, user.password.as_deref()) {
            (Some(current), Some(hash)) => verify_password(current, hash),
            _ => false,
        };
        if !current_matches {
            return Err(AuthError::WrongCurrentPassword);
        }

        let updated = self
            .users
            .update_by_id(
                &user.id,
                json!({
                    "password": password.cloned().unwrap_or(Value::Null),
                    "passwordConfirm": password_confirm.cloned().unwrap_or(Value::Null),
                }),
                Validation::Run,
            )?
            .ok_or(AuthError::UserGone)?;

        self.issue(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::email::LogEmailSender;
    use crate::auth::jwt::JwtConfig;
    use crate::models::Database;

    struct Fixture {
        db: Database,
        mail: Arc<LogEmailSender>,
        auth: AuthService,
    }

    fn fixture() -> Fixture {
        let db = Database::open();
        let mail = Arc::new(LogEmailSender::new());
        let auth = AuthService::new(
            Arc::clone(&db.users),
            JwtManager::new(JwtConfig {
                secret: "test-secret".to_string(),
                ..JwtConfig::default()
            }),
            mail.clone(),
        );
        Fixture { db, mail, auth }
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn signup(auth: &AuthService) -> IssuedToken {
        auth.signup(&body(json!({
            "name": "Lourdes Browning",
            "email": "loulou@example.com",
            "password": "pass1234",
            "passwordConfirm": "pass1234",
            "role": "admin"
        })))
        .unwrap()
    }

    #[test]
    fn test_signup_ignores_role() {
        let f = fixture();
        let issued = signup(&f.auth);
        assert_eq!(issued.user["role"], json!("user"));

        let user = f.auth.protect(Some(&issued.token)).unwrap();
        assert_eq!(user.email, "loulou@example.com");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_login() {
        let f = fixture();
        signup(&f.auth);

        assert!(f.auth.login(Some("LOULOU@example.com"), Some("pass1234")).is_ok());
        assert_eq!(
            f.auth.login(Some("loulou@example.com"), Some("wrongpass")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            f.auth.login(Some("nobody@example.com"), Some("pass1234")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(f.auth.login(None, Some("pass1234")), Err(AuthError::MissingCredentials));
    }

    #[test]
    fn test_protect_rejects() {
        let f = fixture();
        assert_eq!(f.auth.protect(None).unwrap_err(), AuthError::NotLoggedIn);
        assert_eq!(f.auth.protect(Some("garbage")).unwrap_err(), AuthError::InvalidToken);

        let issued = signup(&f.auth);
        let id = issued.user["_id"].as_str().unwrap();
        f.db.users
            .update_by_id(id, json!({"active": false}), Validation::Skip)
            .unwrap();
        assert_eq!(f.auth.protect(Some(&issued.token)).unwrap_err(), AuthError::UserGone);
    }

    #[test]
    fn test_token_before_password_change_rejected() {
        let f = fixture();
        let issued = signup(&f.auth);
        let id = issued.user["_id"].as_str().unwrap();

        let old_token = f.auth.jwt().sign_at(id, Utc::now() - Duration::hours(1)).unwrap();
        f.auth
            .update_password(id, Some("pass1234"), Some(&json!("newpass123")), Some(&json!("newpass123")))
            .unwrap();

        assert_eq!(f.auth.protect(Some(&old_token)).unwrap_err(), AuthError::PasswordChanged);
        assert!(f.auth.login(Some("loulou@example.com"), Some("newpass123")).is_ok());
    }

    #[test]
    fn test_update_password_needs_current() {
        let f = fixture();
        let issued = signup(&f.auth);
        let id = issued.user["_id"].as_str().unwrap();

        let err = f
            .auth
            .update_password(id, Some("not-it"), Some(&json!("newpass123")), Some(&json!("newpass123")))
            .unwrap_err();
        assert_eq!(err, AuthError::WrongCurrentPassword);
    }

    #[test]
    fn test_restrict_to() {
        let f = fixture();
        let issued = signup(&f.auth);
        let user = f.auth.protect(Some(&issued.token)).unwrap();

        assert!(AuthService::restrict_to(&user, &[Role::User, Role::Admin]).is_ok());
        assert_eq!(
            AuthService::restrict_to(&user, &[Role::Admin, Role::LeadGuide]),
            Err(AuthError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let f = fixture();
        signup(&f.auth);

        assert_eq!(
            f.auth.forgot_password(Some("ghost@example.com"), "http://localhost:3000").await,
            Err(AuthError::UnknownEmail)
        );

        f.auth
            .forgot_password(Some("loulou@example.com"), "http://localhost:3000/")
            .await
            .unwrap();
        let sent = f.mail.sent();
        assert_eq!(sent.len(), 1);

        let marker = "/api/v1/users/resetPassword/";
        let start = sent[0].body.find(marker).unwrap() + marker.len();
        let token: String = sent[0].body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        assert_eq!(token.len(), 43);

        let pw = json!("brandnew1");
        let issued = f.auth.reset_password(&token, Some(&pw), Some(&pw)).unwrap();
        assert!(f.auth.protect(Some(&issued.token)).is_ok());
        assert!(f.auth.login(Some("loulou@example.com"), Some("brandnew1")).is_ok());

        // Tokens are single use
        assert_eq!(
            f.auth.reset_password(&token, Some(&pw), Some(&pw)).unwrap_err(),
            AuthError::ResetTokenInvalid
        );
    }

    #[test]
    fn test_reset_with_unknown_token() {
        let f = fixture();
        signup(&f.auth);
        let pw = json!("brandnew1");
        assert_eq!(
            f.auth.reset_password("nope", Some(&pw), Some(&pw)).unwrap_err(),
            AuthError::ResetTokenInvalid
        );
    }
}
