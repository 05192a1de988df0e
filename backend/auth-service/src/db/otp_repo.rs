/// OTP repository - one-time codes keyed by (user, purpose)
///
/// The UNIQUE (user_id, purpose) constraint plus the upsert below keep at
/// most one live code per user and purpose: issuing a new code atomically
/// replaces whatever was there, consumed or not.
use crate::models::{OtpPurpose, OtpRecord};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a fresh code for (user, purpose), replacing any prior one.
pub async fn upsert_code(
    pool: &PgPool,
    user_id: Uuid,
    purpose: OtpPurpose,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<OtpRecord, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, OtpRecord>(
        r#"
        INSERT INTO otp_codes (id, user_id, purpose, code_hash, expires_at, consumed, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        ON CONFLICT (user_id, purpose) DO UPDATE
        SET code_hash = EXCLUDED.code_hash,
            expires_at = EXCLUDED.expires_at,
            consumed = FALSE,
            created_at = EXCLUDED.created_at
        RETURNING id, user_id, purpose, code_hash, expires_at, consumed, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(purpose)
    .bind(code_hash)
    .bind(expires_at)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Fetch the current code row for (user, purpose), consumed or not.
pub async fn find_current(
    pool: &PgPool,
    user_id: Uuid,
    purpose: OtpPurpose,
) -> Result<Option<OtpRecord>, sqlx::Error> {
    sqlx::query_as::<_, OtpRecord>(
        r#"
        SELECT id, user_id, purpose, code_hash, expires_at, consumed, created_at
        FROM otp_codes
        WHERE user_id = $1 AND purpose = $2
        "#,
    )
    .bind(user_id)
    .bind(purpose)
    .fetch_optional(pool)
    .await
}

/// Mark a code consumed. Returns the number of rows updated: zero means
/// another request consumed it first.
pub async fn consume(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE otp_codes
        SET consumed = TRUE
        WHERE id = $1 AND consumed = FALSE
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Drop expired rows. Called opportunistically, not on any hot path.
pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM otp_codes
        WHERE expires_at < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
