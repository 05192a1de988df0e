/// Integration tests for refresh token rotation, revocation and session
/// scoping.
mod common;

#[cfg(test)]
mod tests {
    use super::common::fixtures;
    use auth_service::error::AuthError;
    use auth_service::models::{OtpPurpose, TokenPair, User};

    async fn registered_verified_user(
        stack: &fixtures::TestStack,
    ) -> (User, String) {
        let username = fixtures::unique_username();
        let email = fixtures::unique_email(&username);

        let user = stack
            .auth
            .register(&username, &email, fixtures::TEST_PASSWORD)
            .await
            .expect("registration failed");
        let code = stack
            .otp
            .issue(user.id, OtpPurpose::VerifyEmail)
            .await
            .expect("issue failed");
        stack
            .auth
            .verify_email(&email, &code)
            .await
            .expect("verification failed");

        (user, username)
    }

    async fn login(stack: &fixtures::TestStack, username: &str) -> TokenPair {
        stack
            .auth
            .login(username, fixtures::TEST_PASSWORD, None)
            .await
            .expect("login failed")
    }

    // ============================================
    // Rotation
    // ============================================

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_refresh_rotates_token_and_revokes_previous() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let first = login(&stack, &username).await;

        let second = stack
            .auth
            .refresh(&first.refresh_token)
            .await
            .expect("refresh failed");
        assert_ne!(second.refresh_token, first.refresh_token);

        // The session survives rotation.
        let first_claims = stack
            .tokens
            .validate_access(&first.access_token)
            .expect("first access token invalid");
        let second_claims = stack
            .tokens
            .validate_access(&second.access_token)
            .expect("second access token invalid");
        assert_eq!(
            first_claims.session_id().expect("bad sid"),
            second_claims.session_id().expect("bad sid")
        );

        // Replaying the rotated-out token fails; the new one still works.
        let replay = stack.auth.refresh(&first.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::TokenRevoked)));

        stack
            .auth
            .refresh(&second.refresh_token)
            .await
            .expect("fresh token should rotate again");

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_refresh_with_unknown_token_is_invalid() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let unknown = stack.auth.refresh(&"ab".repeat(32)).await;
        assert!(matches!(unknown, Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_refresh_with_expired_token_is_rejected() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let pair = login(&stack, &username).await;

        sqlx::query(
            "UPDATE refresh_tokens SET expires_at = NOW() - INTERVAL '1 hour' WHERE user_id = $1",
        )
        .bind(user.id)
        .execute(&pool)
        .await
        .expect("failed to age refresh token");

        let expired = stack.auth.refresh(&pair.refresh_token).await;
        assert!(matches!(expired, Err(AuthError::TokenExpired)));

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_disabled_account_cannot_refresh() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let pair = login(&stack, &username).await;

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .expect("failed to disable account");

        let refused = stack.auth.refresh(&pair.refresh_token).await;
        assert!(matches!(refused, Err(AuthError::AccountDisabled)));

        fixtures::delete_user(&pool, user.id).await;
    }

    // ============================================
    // Logout
    // ============================================

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_logout_revokes_refresh_token_idempotently() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let pair = login(&stack, &username).await;

        stack
            .auth
            .logout(&pair.refresh_token)
            .await
            .expect("logout failed");

        let replay = stack.auth.refresh(&pair.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::TokenRevoked)));

        // A second logout with the same token still succeeds.
        stack
            .auth
            .logout(&pair.refresh_token)
            .await
            .expect("repeated logout should be a no-op");

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_logout_all_ends_every_session() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let laptop = login(&stack, &username).await;
        let phone = login(&stack, &username).await;

        let revoked = stack
            .auth
            .logout_all(user.id)
            .await
            .expect("logout all failed");
        assert_eq!(revoked, 2);

        for pair in [laptop, phone] {
            let replay = stack.auth.refresh(&pair.refresh_token).await;
            assert!(matches!(replay, Err(AuthError::TokenRevoked)));
        }

        fixtures::delete_user(&pool, user.id).await;
    }

    // ============================================
    // Password change
    // ============================================

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_change_password_keeps_current_session_only() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let current = login(&stack, &username).await;
        let other = login(&stack, &username).await;

        let current_session = stack
            .tokens
            .validate_access(&current.access_token)
            .expect("access token invalid")
            .session_id()
            .expect("bad sid");

        let new_password = "An0ther$ecret";
        stack
            .auth
            .change_password(
                user.id,
                current_session,
                fixtures::TEST_PASSWORD,
                new_password,
            )
            .await
            .expect("password change failed");

        // The session that changed the password survives.
        stack
            .auth
            .refresh(&current.refresh_token)
            .await
            .expect("current session should survive");

        let evicted = stack.auth.refresh(&other.refresh_token).await;
        assert!(matches!(evicted, Err(AuthError::TokenRevoked)));

        // Old credential is gone, new one works.
        let stale = stack.auth.login(&username, fixtures::TEST_PASSWORD, None).await;
        assert!(matches!(stale, Err(AuthError::InvalidCredentials)));
        stack
            .auth
            .login(&username, new_password, None)
            .await
            .expect("login with new password failed");

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_change_password_requires_correct_old_password() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username) = registered_verified_user(&stack).await;
        let pair = login(&stack, &username).await;
        let session = stack
            .tokens
            .validate_access(&pair.access_token)
            .expect("access token invalid")
            .session_id()
            .expect("bad sid");

        let wrong = stack
            .auth
            .change_password(user.id, session, "WrongPass1!", "An0ther$ecret")
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        // The existing session is untouched after the failed attempt.
        stack
            .auth
            .refresh(&pair.refresh_token)
            .await
            .expect("session should survive a failed change");

        fixtures::delete_user(&pool, user.id).await;
    }
}
