/// Account lifecycle orchestration
///
/// Every account moves through one state machine: registered-unverified,
/// then verified, with password reset layered on top of verified (and
/// unverified) accounts. This service owns the transitions; persistence
/// and token mechanics live in the collaborators it drives.
use sqlx::PgPool;
use tokio::task;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{oauth_repo, user_repo};
use crate::error::{conflict_on_unique, AuthError, Result};
use crate::models::{OtpPurpose, TokenPair, User, UserResponse};
use crate::security::password::{hash_password, verify_password};
use crate::security::token_digest::generate_opaque_token;
use crate::services::email::EmailService;
use crate::services::oauth::{GoogleOauth, GOOGLE_PROVIDER};
use crate::services::otp_issuer::OtpIssuer;
use crate::services::tokens::TokenService;
use crate::validators::{mask_email, validate_email, validate_password, validate_username};

#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    otp: OtpIssuer,
    tokens: TokenService,
    email: EmailService,
    oauth: Option<GoogleOauth>,
}

impl AuthService {
    pub fn new(
        db: PgPool,
        otp: OtpIssuer,
        tokens: TokenService,
        email: EmailService,
        oauth: Option<GoogleOauth>,
    ) -> Self {
        Self {
            db,
            otp,
            tokens,
            email,
            oauth,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an unverified account and send its verification code.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if !validate_username(username) {
            return Err(AuthError::Validation(
                "Username must be 3-32 characters, start with a letter or digit, and contain only letters, digits, underscores and hyphens".to_string(),
            ));
        }
        if !validate_email(email) {
            return Err(AuthError::Validation("Invalid email address".to_string()));
        }
        if !validate_password(password) {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters with upper and lower case letters, a digit and a special character".to_string(),
            ));
        }

        // Friendly pre-checks; the unique constraints below remain the
        // source of truth under concurrency.
        if user_repo::find_by_email(&self.db, email).await?.is_some() {
            return Err(AuthError::Conflict("Email".to_string()));
        }
        if user_repo::username_exists(&self.db, username).await? {
            return Err(AuthError::Conflict("Username".to_string()));
        }

        let password_hash = hash_password(password)?;

        let user = user_repo::create_user(&self.db, username, email, &password_hash)
            .await
            .map_err(|e| conflict_on_unique(e, "Account"))?;

        let code = self.otp.issue(user.id, OtpPurpose::VerifyEmail).await?;
        self.dispatch_verification_email(&user, code);

        info!(
            user_id = %user.id,
            email = %mask_email(&user.email),
            "user registered"
        );

        Ok(user)
    }

    /// Consume a verification code and activate the account. Verifying an
    /// already-verified account is a no-op success.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<UserResponse> {
        let user = user_repo::find_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::OtpNotFound)?;

        if user.is_verified {
            return Ok(UserResponse::from(user));
        }

        self.otp.verify(user.id, OtpPurpose::VerifyEmail, code).await?;
        let user = user_repo::mark_verified(&self.db, user.id).await?;

        let email_service = self.email.clone();
        let (to, name) = (user.email.clone(), user.username.clone());
        task::spawn(async move {
            if let Err(e) = email_service.send_welcome(&to, &name).await {
                warn!(error = %e, "failed to send welcome email");
            }
        });

        info!(
            user_id = %user.id,
            email = %mask_email(&user.email),
            "email verified"
        );

        Ok(UserResponse::from(user))
    }

    /// Re-send the verification code, replacing the previous one. Silent
    /// no-op for unknown or already-verified addresses; rate limit errors
    /// surface as 429.
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let user = match user_repo::find_by_email(&self.db, email).await? {
            Some(user) => user,
            None => {
                info!(email = %mask_email(email), "verification resend for unknown email");
                return Ok(());
            }
        };

        if user.is_verified {
            return Ok(());
        }

        self.otp
            .enforce_resend_limit(email, OtpPurpose::VerifyEmail)
            .await?;

        let code = self.otp.issue(user.id, OtpPurpose::VerifyEmail).await?;
        self.dispatch_verification_email(&user, code);

        Ok(())
    }

    /// Password login. Unknown usernames and wrong passwords fail the
    /// same way; only valid credentials learn the account's state.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: Option<&str>,
    ) -> Result<TokenPair> {
        let user = user_repo::find_by_username(&self.db, username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        if !user.is_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let pair = self.tokens.issue_pair(&user, device_id).await?;

        info!(user_id = %user.id, "user logged in");

        Ok(pair)
    }

    /// Rotate a refresh token for a new pair.
    pub async fn refresh(&self, raw_refresh: &str) -> Result<TokenPair> {
        self.tokens.refresh(raw_refresh).await
    }

    /// The authenticated account's own view.
    pub async fn me(&self, user_id: Uuid) -> Result<UserResponse> {
        let user = user_repo::find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))?;
        Ok(UserResponse::from(user))
    }

    /// End one session. Succeeds whether or not the token was live.
    pub async fn logout(&self, raw_refresh: &str) -> Result<()> {
        self.tokens.revoke(raw_refresh).await
    }

    /// End every session the user holds.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64> {
        let revoked = self.tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    /// Start a password reset. Always succeeds from the caller's view:
    /// unknown addresses and rate-limited requests are logged, not
    /// reported.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let user = match user_repo::find_by_email(&self.db, email).await? {
            Some(user) => user,
            None => {
                info!(email = %mask_email(email), "password reset for unknown email");
                return Ok(());
            }
        };

        match self
            .otp
            .enforce_resend_limit(email, OtpPurpose::ResetPassword)
            .await
        {
            Err(AuthError::RateLimited) => {
                warn!(
                    user_id = %user.id,
                    "password reset rate limited, request dropped"
                );
                return Ok(());
            }
            other => other?,
        }

        let code = self.otp.issue(user.id, OtpPurpose::ResetPassword).await?;

        let email_service = self.email.clone();
        let ttl = self.otp.ttl_minutes();
        let (to, name) = (user.email.clone(), user.username.clone());
        task::spawn(async move {
            if let Err(e) = email_service
                .send_password_reset_code(&to, &name, &code, ttl)
                .await
            {
                warn!(error = %e, "failed to send password reset email");
            }
        });

        info!(user_id = %user.id, "password reset requested");

        Ok(())
    }

    /// Check a reset code without consuming it. The same code is
    /// re-submitted to complete the reset.
    pub async fn verify_password_reset(&self, email: &str, code: &str) -> Result<()> {
        let user = user_repo::find_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::OtpNotFound)?;

        self.otp.check(user.id, OtpPurpose::ResetPassword, code).await
    }

    /// Consume the reset code, set the new password and revoke every
    /// session. One-shot: a second completion with the same code fails.
    pub async fn complete_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        if !validate_password(new_password) {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters with upper and lower case letters, a digit and a special character".to_string(),
            ));
        }

        let user = user_repo::find_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::OtpNotFound)?;

        self.otp.verify(user.id, OtpPurpose::ResetPassword, code).await?;

        let password_hash = hash_password(new_password)?;
        user_repo::update_password(&self.db, user.id, &password_hash).await?;

        let revoked = self.tokens.revoke_all(user.id).await?;

        info!(
            user_id = %user.id,
            revoked,
            "password reset completed, sessions revoked"
        );

        Ok(())
    }

    /// Change the password from a logged-in session. All other sessions
    /// are revoked; the current one stays.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if !validate_password(new_password) {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters with upper and lower case letters, a digit and a special character".to_string(),
            ));
        }

        let user = user_repo::find_by_id(&self.db, user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(old_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = hash_password(new_password)?;
        user_repo::update_password(&self.db, user.id, &password_hash).await?;

        let revoked = self.tokens.revoke_all_except(user.id, session_id).await?;

        info!(
            user_id = %user.id,
            revoked,
            "password changed, other sessions revoked"
        );

        Ok(())
    }

    /// Authorization URL for the Google redirect.
    pub async fn google_login_url(&self) -> Result<String> {
        let oauth = self.oauth.as_ref().ok_or(AuthError::OauthUnavailable)?;
        oauth.authorization_url().await
    }

    /// Handle the Google callback: consume the state, exchange the code,
    /// then sign in the linked account, creating and linking one as
    /// needed. Accounts created here are born verified.
    pub async fn google_callback(&self, code: &str, state: &str) -> Result<TokenPair> {
        let oauth = self.oauth.as_ref().ok_or(AuthError::OauthUnavailable)?;

        oauth.consume_state(state).await?;
        let identity = oauth.exchange_code(code).await?;

        let user = match oauth_repo::find_by_provider(&self.db, GOOGLE_PROVIDER, &identity.sub)
            .await?
        {
            Some(link) => user_repo::find_by_id(&self.db, link.user_id)
                .await?
                .ok_or_else(|| AuthError::Internal("dangling oauth link".to_string()))?,
            None => {
                if !identity.email_verified {
                    return Err(AuthError::Oauth(
                        "Google account email is not verified".to_string(),
                    ));
                }

                let user = match user_repo::find_by_email(&self.db, &identity.email).await? {
                    Some(existing) => existing,
                    None => self.create_user_from_google(&identity.email).await?,
                };

                oauth_repo::link(&self.db, user.id, GOOGLE_PROVIDER, &identity.sub)
                    .await
                    .map_err(|e| conflict_on_unique(e, "OAuth account"))?;

                user
            }
        };

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let pair = self.tokens.issue_pair(&user, Some("google-oauth")).await?;

        info!(
            user_id = %user.id,
            email = %mask_email(&user.email),
            "google sign-in"
        );

        Ok(pair)
    }

    async fn create_user_from_google(&self, email: &str) -> Result<User> {
        // The account has no usable password; holders sign in via Google
        // or run the password reset flow to set one.
        let placeholder = hash_password(&generate_opaque_token())?;

        let mut username = derive_username(email);
        for _ in 0..3 {
            if !user_repo::username_exists(&self.db, &username).await? {
                break;
            }
            username = format!("{}-{}", derive_username(email), short_suffix());
        }

        let user = user_repo::create_oauth_user(&self.db, &username, email, &placeholder)
            .await
            .map_err(|e| conflict_on_unique(e, "Account"))?;

        info!(
            user_id = %user.id,
            email = %mask_email(email),
            "account created from google identity"
        );

        Ok(user)
    }

    fn dispatch_verification_email(&self, user: &User, code: String) {
        let email_service = self.email.clone();
        let ttl = self.otp.ttl_minutes();
        let (to, name) = (user.email.clone(), user.username.clone());
        task::spawn(async move {
            if let Err(e) = email_service
                .send_verification_code(&to, &name, &code, ttl)
                .await
            {
                warn!(error = %e, "failed to send verification email");
            }
        });
    }
}

/// Build a valid username from an email's local part.
fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut username: String = local
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(24)
        .collect();

    while username
        .chars()
        .next()
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(false)
    {
        username.remove(0);
    }

    if username.len() < 3 {
        username = format!("dev-{}", short_suffix());
    }

    username
}

fn short_suffix() -> String {
    use rand::Rng;
    format!("{:04}", rand::rngs::OsRng.gen_range(0..10_000u32))
}
