/// Integration tests for the password reset flow: request, code check,
/// completion and the session revocation that follows.
mod common;

#[cfg(test)]
mod tests {
    use super::common::fixtures;
    use auth_service::error::AuthError;
    use auth_service::models::{OtpPurpose, User};

    const NEW_PASSWORD: &str = "Fresh$tart99";

    async fn verified_user(stack: &fixtures::TestStack) -> (User, String, String) {
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

        (user, username, email)
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_reset_request_never_reveals_account_existence() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        // Unknown address: accepted, nothing issued.
        let ghost = fixtures::unique_email(&fixtures::unique_username());
        stack
            .auth
            .request_password_reset(&ghost)
            .await
            .expect("unknown email must not error");

        // Known address: accepted, code issued.
        let (user, _, email) = verified_user(&stack).await;
        stack
            .auth
            .request_password_reset(&email)
            .await
            .expect("reset request failed");

        let pending =
            auth_service::db::otp_repo::find_current(&pool, user.id, OtpPurpose::ResetPassword)
                .await
                .expect("query failed");
        assert!(pending.is_some());

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_full_reset_flow_consumes_code_and_revokes_sessions() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, username, email) = verified_user(&stack).await;
        let session = stack
            .auth
            .login(&username, fixtures::TEST_PASSWORD, None)
            .await
            .expect("login failed");

        let code = stack
            .otp
            .issue(user.id, OtpPurpose::ResetPassword)
            .await
            .expect("issue failed");

        // The pre-check endpoint does not consume the code, so checking
        // twice and then completing all work with the same code.
        stack
            .auth
            .verify_password_reset(&email, &code)
            .await
            .expect("first check failed");
        stack
            .auth
            .verify_password_reset(&email, &code)
            .await
            .expect("second check failed");

        stack
            .auth
            .complete_password_reset(&email, &code, NEW_PASSWORD)
            .await
            .expect("reset completion failed");

        // One-shot completion.
        let replay = stack
            .auth
            .complete_password_reset(&email, &code, NEW_PASSWORD)
            .await;
        assert!(matches!(replay, Err(AuthError::OtpAlreadyConsumed)));

        // Every pre-reset session is gone.
        let evicted = stack.auth.refresh(&session.refresh_token).await;
        assert!(matches!(evicted, Err(AuthError::TokenRevoked)));

        // Credentials rolled over.
        let stale = stack
            .auth
            .login(&username, fixtures::TEST_PASSWORD, None)
            .await;
        assert!(matches!(stale, Err(AuthError::InvalidCredentials)));
        stack
            .auth
            .login(&username, NEW_PASSWORD, None)
            .await
            .expect("login with new password failed");

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_reset_completion_rejects_weak_password() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, _, email) = verified_user(&stack).await;
        let code = stack
            .otp
            .issue(user.id, OtpPurpose::ResetPassword)
            .await
            .expect("issue failed");

        let weak = stack
            .auth
            .complete_password_reset(&email, &code, "password")
            .await;
        assert!(matches!(weak, Err(AuthError::Validation(_))));

        // The code survives a rejected completion.
        stack
            .auth
            .verify_password_reset(&email, &code)
            .await
            .expect("code should remain usable");

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_reset_check_rejects_wrong_code() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let (user, _, email) = verified_user(&stack).await;
        let code = stack
            .otp
            .issue(user.id, OtpPurpose::ResetPassword)
            .await
            .expect("issue failed");
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let mismatch = stack.auth.verify_password_reset(&email, wrong).await;
        assert!(matches!(mismatch, Err(AuthError::OtpMismatch)));

        let missing = stack
            .auth
            .verify_password_reset(&fixtures::unique_email("nobody"), &code)
            .await;
        assert!(matches!(missing, Err(AuthError::OtpNotFound)));

        fixtures::delete_user(&pool, user.id).await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_verification_and_reset_codes_do_not_cross() {
        let pool = fixtures::create_test_pool().await;
        let redis = fixtures::create_test_redis().await;
        let stack = fixtures::build_stack(&pool, &redis);

        let username = fixtures::unique_username();
        let email = fixtures::unique_email(&username);
        let user = stack
            .auth
            .register(&username, &email, fixtures::TEST_PASSWORD)
            .await
            .expect("registration failed");

        // A reset code must not verify an email address.
        let reset_code = stack
            .otp
            .issue(user.id, OtpPurpose::ResetPassword)
            .await
            .expect("issue failed");
        let verify_code = stack
            .otp
            .issue(user.id, OtpPurpose::VerifyEmail)
            .await
            .expect("issue failed");

        if reset_code != verify_code {
            let crossed = stack.auth.verify_email(&email, &reset_code).await;
            assert!(matches!(crossed, Err(AuthError::OtpMismatch)));
        }

        stack
            .auth
            .verify_email(&email, &verify_code)
            .await
            .expect("verification failed");

        // The reset code is still intact for its own purpose.
        stack
            .auth
            .verify_password_reset(&email, &reset_code)
            .await
            .expect("reset code should be unaffected");

        fixtures::delete_user(&pool, user.id).await;
    }
}
