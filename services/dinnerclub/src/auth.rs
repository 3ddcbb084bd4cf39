//! Authentication gateway
//!
//! Orchestrates registration, login and logout on top of the credential
//! store, the password hasher, the token issuer and the request's session.
//! Storage failures are classified here so the transport layer never sees a
//! raw database error.

use common::error::DatabaseError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::jwt::{TokenError, TokenService};
use crate::models::user::normalize_username;
use crate::models::{LoginCredentials, NewUser, Registration, UpdateUser, User};
use crate::password::{PasswordError, PasswordService};
use crate::repositories::UserRepository;
use crate::session::Session;
use crate::validation::{
    FieldError, Validator, non_blank, validate_email, validate_length, validate_password,
    validate_username,
};

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User already signed up")]
    DuplicateUsername,

    #[error("Email address is already in use")]
    DuplicateEmail,

    #[error("Referral code does not match")]
    ReferralMismatch,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid input")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl AuthError {
    /// Map a unique violation on the users table to the duplicate it represents
    fn from_storage(err: DatabaseError) -> Self {
        if err.violates("users.username") {
            AuthError::DuplicateUsername
        } else if err.violates("users.email") {
            AuthError::DuplicateEmail
        } else {
            AuthError::Storage(err)
        }
    }
}

/// Access and refresh token issued at login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// A freshly issued access token
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    passwords: PasswordService,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: UserRepository, passwords: PasswordService, tokens: TokenService) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new user.
    ///
    /// `referral_gate` is the configured referral code; when it is set and
    /// non-empty the candidate must present the same code.
    pub async fn register(
        &self,
        registration: Registration,
        referral_gate: Option<&str>,
    ) -> Result<User, AuthError> {
        let username = normalize_username(&registration.username);
        let firstname = non_blank(registration.firstname);
        let lastname = non_blank(registration.lastname);
        let email = non_blank(registration.email).map(|e| e.to_lowercase());
        let referral_code = non_blank(registration.referral_code);

        Validator::new()
            .check("username", validate_username(&username))
            .check("password", validate_password(&registration.password))
            .check("firstname", validate_length(firstname.as_deref(), "First name"))
            .check("lastname", validate_length(lastname.as_deref(), "Last name"))
            .check("email", validate_email(email.as_deref()))
            .finish()
            .map_err(AuthError::Validation)?;

        if self.users.username_taken(&username).await? {
            debug!("Registration rejected, username taken: {}", username);
            return Err(AuthError::DuplicateUsername);
        }

        if let Some(expected) = referral_gate.filter(|code| !code.is_empty()) {
            if referral_code.as_deref() != Some(expected) {
                debug!("Registration rejected, referral code mismatch: {}", username);
                return Err(AuthError::ReferralMismatch);
            }
        }

        let password_hash = self.passwords.hash_blocking(&registration.password).await?;

        let user = self
            .users
            .create(&NewUser {
                username,
                password_hash,
                firstname,
                lastname,
                email,
                referral_code,
            })
            .await
            .map_err(AuthError::from_storage)?;

        info!("Registered new user: {}", user.username);
        Ok(user)
    }

    /// Verify credentials, issue tokens and mark the session as authenticated.
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn login(
        &self,
        session: &Session,
        credentials: &LoginCredentials,
    ) -> Result<LoginOutcome, AuthError> {
        let username = normalize_username(&credentials.username);

        let Some(user) = self.users.find_by_username(&username).await? else {
            debug!("Login failed, unknown user: {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .passwords
            .verify_blocking(&credentials.password, &user.password_hash)
            .await?
        {
            debug!("Login failed, wrong password: {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = TokenPair {
            access_token: self.tokens.issue_access_token(user.id)?,
            refresh_token: self.tokens.issue_refresh_token(user.id)?,
            token_type: "Bearer",
            expires_in: self.tokens.access_token_expiry(),
        };

        session.set_user_id(user.id).await;
        info!("User logged in: {}", user.username);

        Ok(LoginOutcome { user, tokens })
    }

    /// Drop the authenticated identity from the session. Idempotent.
    pub async fn logout(&self, session: &Session) {
        if let Some(user_id) = session.user_id().await {
            info!("User logged out: {}", user_id);
        }
        session.clear_user_id().await;
    }

    /// The user id the session is authenticated as
    pub async fn current_user_id(&self, session: &Session) -> Option<Uuid> {
        session.user_id().await
    }

    /// Username of the authenticated user, `None` when anonymous or when the
    /// account no longer exists
    pub async fn current_username(&self, session: &Session) -> Option<String> {
        let user_id = self.current_user_id(session).await?;
        self.username_of(user_id).await
    }

    /// Resolve a user id to its username; never fails
    pub async fn username_of(&self, user_id: Uuid) -> Option<String> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => user.map(|u| u.username),
            Err(e) => {
                error!("Failed to resolve user {}: {}", user_id, e);
                None
            }
        }
    }

    /// The active account behind a user id
    pub async fn user(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.find_by_id(user_id).await?)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let user_id = self.tokens.verify_refresh_token(refresh_token).map_err(|e| {
            debug!("Refresh token rejected: {}", e);
            AuthError::InvalidToken
        })?;

        if self.users.find_by_id(user_id).await?.is_none() {
            debug!("Refresh token for missing user: {}", user_id);
            return Err(AuthError::InvalidToken);
        }

        Ok(AccessToken {
            access_token: self.tokens.issue_access_token(user_id)?,
            token_type: "Bearer",
            expires_in: self.tokens.access_token_expiry(),
        })
    }

    /// Replace the profile fields of the given account
    pub async fn update_profile(&self, user_id: Uuid, update: UpdateUser) -> Result<User, AuthError> {
        let update = UpdateUser {
            firstname: non_blank(update.firstname),
            lastname: non_blank(update.lastname),
            email: non_blank(update.email).map(|e| e.to_lowercase()),
        };

        Validator::new()
            .check("firstname", validate_length(update.firstname.as_deref(), "First name"))
            .check("lastname", validate_length(update.lastname.as_deref(), "Last name"))
            .check("email", validate_email(update.email.as_deref()))
            .finish()
            .map_err(AuthError::Validation)?;

        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(AuthError::from_storage)?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Soft-delete an account and log the session out.
    /// Returns the username of the deleted account.
    pub async fn delete_account(
        &self,
        user_id: Uuid,
        session: &Session,
    ) -> Result<Option<String>, AuthError> {
        let username = self.username_of(user_id).await;
        self.users.soft_delete(user_id).await?;
        self.logout(session).await;

        Ok(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrate_schema;
    use crate::jwt::JwtConfig;
    use crate::password::PasswordConfig;
    use common::database::{DatabaseConfig, init_pool};

    async fn service() -> AuthService {
        let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
        migrate_schema(&pool).await.unwrap();

        let passwords = PasswordService::new(&PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens = TokenService::new(JwtConfig {
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        });

        AuthService::new(UserRepository::new(pool), passwords, tokens)
    }

    fn registration(username: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: password.to_string(),
            firstname: None,
            lastname: None,
            email: None,
            referral_code: None,
        }
    }

    fn credentials(username: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service().await;
        let user = auth
            .register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();
        assert_ne!(user.password_hash, "correcthorsebattery");

        let session = Session::new();
        let outcome = auth
            .login(&session, &credentials("alice01", "correcthorsebattery"))
            .await
            .unwrap();

        assert_eq!(outcome.user.id, user.id);
        assert_eq!(auth.current_user_id(&session).await, Some(user.id));
        assert_eq!(
            auth.current_username(&session).await.as_deref(),
            Some("alice01")
        );
        assert_ne!(outcome.tokens.access_token, outcome.tokens.refresh_token);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service().await;
        auth.register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();

        let session = Session::new();
        let unknown = auth
            .login(&session, &credentials("mallory", "correcthorsebattery"))
            .await
            .unwrap_err();
        let wrong = auth
            .login(&session, &credentials("alice01", "wrongpassword"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(auth.current_user_id(&session).await, None);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let auth = service().await;
        auth.register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();

        let err = auth
            .register(registration("Alice01", "anotherpassword"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let auth = service().await;
        let mut first = registration("alice01", "correcthorsebattery");
        first.email = Some("alice@example.com".to_string());
        auth.register(first, None).await.unwrap();

        let mut second = registration("bob01", "correcthorsebattery");
        second.email = Some("ALICE@example.com".to_string());
        let err = auth.register(second, None).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_referral_gate() {
        let auth = service().await;

        let err = auth
            .register(registration("alice01", "correcthorsebattery"), Some("supper"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ReferralMismatch));

        let mut candidate = registration("alice01", "correcthorsebattery");
        candidate.referral_code = Some("supper".to_string());
        assert!(auth.register(candidate, Some("supper")).await.is_ok());

        // an empty configured code disables the gate
        assert!(
            auth.register(registration("bob01", "correcthorsebattery"), Some(""))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_invalid_registration() {
        let auth = service().await;
        let err = auth
            .register(registration("a!", "short"), None)
            .await
            .unwrap_err();

        let AuthError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let auth = service().await;
        auth.register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();
        let session = Session::new();
        auth.login(&session, &credentials("alice01", "correcthorsebattery"))
            .await
            .unwrap();

        auth.logout(&session).await;
        assert_eq!(auth.current_user_id(&session).await, None);
        auth.logout(&session).await;
        assert_eq!(auth.current_user_id(&session).await, None);
    }

    #[tokio::test]
    async fn test_deleted_account() {
        let auth = service().await;
        auth.register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();
        let session = Session::new();
        let outcome = auth
            .login(&session, &credentials("alice01", "correcthorsebattery"))
            .await
            .unwrap();

        let deleted = auth
            .delete_account(outcome.user.id, &session)
            .await
            .unwrap();
        assert_eq!(deleted.as_deref(), Some("alice01"));
        assert_eq!(auth.current_user_id(&session).await, None);

        // a stale session pointing at the deleted account resolves to nothing
        let stale = Session::new();
        stale.set_user_id(outcome.user.id).await;
        assert_eq!(auth.current_username(&stale).await, None);

        let err = auth
            .login(&Session::new(), &credentials("alice01", "correcthorsebattery"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth
            .register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let auth = service().await;
        auth.register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();
        let outcome = auth
            .login(&Session::new(), &credentials("alice01", "correcthorsebattery"))
            .await
            .unwrap();

        let refreshed = auth
            .refresh_access_token(&outcome.tokens.refresh_token)
            .await
            .unwrap();
        assert_eq!(refreshed.token_type, "Bearer");

        let err = auth
            .refresh_access_token(&outcome.tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let auth = service().await;
        let user = auth
            .register(registration("alice01", "correcthorsebattery"), None)
            .await
            .unwrap();

        let updated = auth
            .update_profile(
                user.id,
                UpdateUser {
                    firstname: Some(" Alice ".to_string()),
                    lastname: Some("".to_string()),
                    email: Some("Alice@Example.com".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.firstname.as_deref(), Some("Alice"));
        assert_eq!(updated.lastname, None);
        assert_eq!(updated.email.as_deref(), Some("alice@example.com"));

        let err = auth
            .update_profile(
                user.id,
                UpdateUser {
                    email: Some("nope".to_string()),
                    ..UpdateUser::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
