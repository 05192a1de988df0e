/// Refresh token repository
///
/// Tokens are stored by digest. Revocation is a flag flip, never a delete,
/// so a replayed token is distinguishable from one that never existed.
use crate::models::RefreshTokenRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Store a new refresh token for a session.
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    session_id: Uuid,
    device_id: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<RefreshTokenRecord, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, session_id, device_id, issued_at, expires_at, revoked, revoked_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NULL)
        RETURNING id, user_id, token_hash, session_id, device_id, issued_at, expires_at, revoked, revoked_at
        "#
    )
    .bind(id)
    .bind(user_id)
    .bind(token_hash)
    .bind(session_id)
    .bind(device_id)
    .bind(now)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Look up a token by its digest.
pub async fn find_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
    sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        SELECT id, user_id, token_hash, session_id, device_id, issued_at, expires_at, revoked, revoked_at
        FROM refresh_tokens
        WHERE token_hash = $1
        "#
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Rotate a token in one transaction: revoke the old row and insert the
/// replacement carrying the same session. Returns None when the old row
/// was already revoked, which is how the losing side of a concurrent
/// replay observes the race.
pub async fn rotate(
    pool: &PgPool,
    old_id: Uuid,
    user_id: Uuid,
    new_token_hash: &str,
    session_id: Uuid,
    device_id: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE, revoked_at = $1
        WHERE id = $2 AND revoked = FALSE
        "#,
    )
    .bind(now)
    .bind(old_id)
    .execute(&mut *tx)
    .await?;

    if revoked.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let record = sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, session_id, device_id, issued_at, expires_at, revoked, revoked_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NULL)
        RETURNING id, user_id, token_hash, session_id, device_id, issued_at, expires_at, revoked, revoked_at
        "#
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(new_token_hash)
    .bind(session_id)
    .bind(device_id)
    .bind(now)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(record))
}

/// Revoke a single token by digest. Returns rows updated.
pub async fn revoke_by_hash(pool: &PgPool, token_hash: &str) -> Result<u64, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE, revoked_at = $1
        WHERE token_hash = $2 AND revoked = FALSE
        "#,
    )
    .bind(now)
    .bind(token_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Revoke every live token a user holds.
pub async fn revoke_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE, revoked_at = $1
        WHERE user_id = $2 AND revoked = FALSE
        "#,
    )
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Revoke every live token a user holds except the given session's.
/// Password change uses this to keep the current device signed in.
pub async fn revoke_all_except_session(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE, revoked_at = $1
        WHERE user_id = $2 AND session_id != $3 AND revoked = FALSE
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
