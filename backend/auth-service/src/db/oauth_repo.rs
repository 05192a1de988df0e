/// OAuth account links - external identities attached to local accounts
use crate::models::OauthAccount;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Find a link by provider identity.
pub async fn find_by_provider(
    pool: &PgPool,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<OauthAccount>, sqlx::Error> {
    sqlx::query_as::<_, OauthAccount>(
        r#"
        SELECT id, user_id, provider, provider_user_id, created_at
        FROM oauth_accounts
        WHERE provider = $1 AND provider_user_id = $2
        "#,
    )
    .bind(provider)
    .bind(provider_user_id)
    .fetch_optional(pool)
    .await
}

/// Attach an external identity to a local account.
pub async fn link(
    pool: &PgPool,
    user_id: Uuid,
    provider: &str,
    provider_user_id: &str,
) -> Result<OauthAccount, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, OauthAccount>(
        r#"
        INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, provider, provider_user_id, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(provider)
    .bind(provider_user_id)
    .bind(now)
    .fetch_one(pool)
    .await
}
