/// One-time code issuance and verification
///
/// Codes live in Postgres, one row per (user, purpose); issuing replaces
/// the prior row atomically, consuming flips a flag exactly once. Redis
/// only carries the resend rate-limit counters.
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::OtpConfig;
use crate::db::otp_repo;
use crate::error::{AuthError, Result};
use crate::models::{OtpPurpose, OtpRecord};
use crate::security::otp;
use crate::validators::mask_email;

const RATE_LIMIT_KEY_PREFIX: &str = "devsearch:otp:rate:";

#[derive(Clone)]
pub struct OtpIssuer {
    db: PgPool,
    redis: ConnectionManager,
    config: OtpConfig,
}

impl OtpIssuer {
    pub fn new(db: PgPool, redis: ConnectionManager, config: OtpConfig) -> Self {
        Self { db, redis, config }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.config.ttl_minutes
    }

    /// Issue a fresh code for (user, purpose), invalidating any earlier
    /// one. Returns the raw code for delivery; only its digest is stored.
    pub async fn issue(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<String> {
        let code = otp::generate_code();
        let code_hash = otp::hash_code(&code);
        let expires_at = Utc::now() + Duration::minutes(self.config.ttl_minutes);

        otp_repo::upsert_code(&self.db, user_id, purpose, &code_hash, expires_at).await?;

        Ok(code)
    }

    /// Verify and consume in one shot. Of N concurrent submissions of the
    /// same valid code, exactly one passes; the rest see AlreadyConsumed.
    pub async fn verify(&self, user_id: Uuid, purpose: OtpPurpose, submitted: &str) -> Result<()> {
        let record = self.validate(user_id, purpose, submitted).await?;

        let consumed = otp_repo::consume(&self.db, record.id).await?;
        if consumed == 0 {
            return Err(AuthError::OtpAlreadyConsumed);
        }

        Ok(())
    }

    /// Validate without consuming. The reset flow peeks here before the
    /// client re-submits the same code to complete.
    pub async fn check(&self, user_id: Uuid, purpose: OtpPurpose, submitted: &str) -> Result<()> {
        self.validate(user_id, purpose, submitted).await.map(|_| ())
    }

    async fn validate(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
        submitted: &str,
    ) -> Result<OtpRecord> {
        let record = otp_repo::find_current(&self.db, user_id, purpose)
            .await?
            .ok_or(AuthError::OtpNotFound)?;

        if record.consumed {
            return Err(AuthError::OtpAlreadyConsumed);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::OtpExpired);
        }
        if !otp::code_matches(submitted, &record.code_hash) {
            return Err(AuthError::OtpMismatch);
        }

        Ok(record)
    }

    /// Fixed-window resend limit per (email, purpose). The first request
    /// in a window starts the clock; going over the limit is 429.
    pub async fn enforce_resend_limit(&self, email: &str, purpose: OtpPurpose) -> Result<()> {
        let key = format!(
            "{}{}:{}",
            RATE_LIMIT_KEY_PREFIX,
            purpose.as_str(),
            email.to_lowercase()
        );
        let mut conn = self.redis.clone();

        let count: u32 = conn.incr(&key, 1u32).await?;
        if count == 1 {
            let _: bool = conn.expire(&key, self.config.resend_window_secs as i64).await?;
        }

        if count > self.config.resend_limit {
            warn!(
                email = %mask_email(email),
                purpose = purpose.as_str(),
                count,
                "resend rate limit exceeded"
            );
            return Err(AuthError::RateLimited);
        }

        Ok(())
    }
}
