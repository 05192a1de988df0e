/// Token issuance, rotation and revocation
///
/// Access tokens are short-lived HS256 JWTs validated statelessly.
/// Refresh tokens are opaque random values stored by digest; rotation
/// revokes the old row and inserts the replacement in one transaction,
/// so a replayed token loses deterministically.
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::db::{refresh_token_repo, user_repo};
use crate::error::{AuthError, Result};
use crate::models::{TokenPair, User};
use crate::security::jwt::{self, AccessClaims};
use crate::security::token_digest::{generate_opaque_token, sha256_hex};

#[derive(Clone)]
pub struct TokenService {
    db: PgPool,
    config: JwtConfig,
}

impl TokenService {
    pub fn new(db: PgPool, config: JwtConfig) -> Self {
        Self { db, config }
    }

    /// Open a new session for a user: fresh session ID, stored refresh
    /// token, signed access token.
    pub async fn issue_pair(&self, user: &User, device_id: Option<&str>) -> Result<TokenPair> {
        let session_id = Uuid::new_v4();

        let raw_refresh = generate_opaque_token();
        let token_hash = sha256_hex(&raw_refresh);
        let expires_at = Utc::now() + Duration::days(self.config.refresh_ttl_days);

        refresh_token_repo::create(
            &self.db,
            user.id,
            &token_hash,
            session_id,
            device_id,
            expires_at,
        )
        .await?;

        let access_token = jwt::encode_access_token(
            &self.config.secret,
            user.id,
            user.role,
            session_id,
            self.config.access_ttl_secs,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token: raw_refresh,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_ttl_secs,
        })
    }

    /// Exchange a refresh token for a new pair, rotating it. The old
    /// token is revoked in the same transaction that stores the new one;
    /// of two concurrent exchanges of the same token, one gets the new
    /// pair and the other gets TokenRevoked.
    pub async fn refresh(&self, raw_refresh: &str) -> Result<TokenPair> {
        let token_hash = sha256_hex(raw_refresh);

        let record = refresh_token_repo::find_by_hash(&self.db, &token_hash)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if record.revoked {
            return Err(AuthError::TokenRevoked);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let user = user_repo::find_by_id(&self.db, record.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let new_raw = generate_opaque_token();
        let new_hash = sha256_hex(&new_raw);
        let expires_at = Utc::now() + Duration::days(self.config.refresh_ttl_days);

        let rotated = refresh_token_repo::rotate(
            &self.db,
            record.id,
            record.user_id,
            &new_hash,
            record.session_id,
            record.device_id.as_deref(),
            expires_at,
        )
        .await?;

        if rotated.is_none() {
            return Err(AuthError::TokenRevoked);
        }

        let access_token = jwt::encode_access_token(
            &self.config.secret,
            user.id,
            user.role,
            record.session_id,
            self.config.access_ttl_secs,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token: new_raw,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_ttl_secs,
        })
    }

    /// Validate an access token: signature and expiry only, no store hit.
    pub fn validate_access(&self, token: &str) -> Result<AccessClaims> {
        jwt::validate_access_token(&self.config.secret, token)
    }

    /// Revoke a single refresh token. Idempotent: revoking an unknown or
    /// already-revoked token is not an error, so logout never leaks
    /// whether a token existed.
    pub async fn revoke(&self, raw_refresh: &str) -> Result<()> {
        let token_hash = sha256_hex(raw_refresh);
        refresh_token_repo::revoke_by_hash(&self.db, &token_hash).await?;
        Ok(())
    }

    /// Revoke every live refresh token a user holds.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64> {
        Ok(refresh_token_repo::revoke_all_for_user(&self.db, user_id).await?)
    }

    /// Revoke all of a user's tokens except the given session's.
    pub async fn revoke_all_except(&self, user_id: Uuid, session_id: Uuid) -> Result<u64> {
        Ok(refresh_token_repo::revoke_all_except_session(&self.db, user_id, session_id).await?)
    }
}
