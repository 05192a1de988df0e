/// User repository - all database operations for accounts
use crate::models::User;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new unverified account. A unique violation on username or
/// email surfaces as sqlx::Error and is mapped to Conflict upstream.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, FALSE, TRUE, 'user', $5, $5)
        RETURNING id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        "#
    )
    .bind(id)
    .bind(username)
    .bind(email.to_lowercase())
    .bind(password_hash)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Create an account from a trusted OAuth identity: already verified,
/// carrying an unusable random password hash.
pub async fn create_oauth_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, TRUE, TRUE, 'user', $5, $5)
        RETURNING id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        "#
    )
    .bind(id)
    .bind(username)
    .bind(email.to_lowercase())
    .bind(password_hash)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Find a user by email
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        FROM users
        WHERE email = $1
        "#
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Find a user by username
pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        FROM users
        WHERE username = $1
        "#
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Find a user by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        FROM users
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Mark an account verified. Idempotent.
pub async fn mark_verified(pool: &PgPool, user_id: Uuid) -> Result<User, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_verified = TRUE, updated_at = $1
        WHERE id = $2
        RETURNING id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        "#
    )
    .bind(now)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Replace a user's password hash
pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    new_password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET password_hash = $1, updated_at = $2
        WHERE id = $3
        RETURNING id, username, email, password_hash, is_verified, is_active, role, created_at, updated_at
        "#
    )
    .bind(new_password_hash)
    .bind(now)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Check if a username is already taken
pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)
        "#,
    )
    .bind(username)
    .fetch_one(pool)
    .await
}
