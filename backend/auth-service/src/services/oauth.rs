/// Google OAuth 2.0 sign-in
///
/// The state parameter is a random token parked in Redis for ten minutes
/// and consumed atomically on callback, so each authorization redirect is
/// good for exactly one callback.
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use reqwest::Client;
use serde::Deserialize;

use crate::config::OauthConfig;
use crate::error::{AuthError, Result};
use crate::security::token_digest::generate_opaque_token;

const STATE_KEY_PREFIX: &str = "devsearch:oauth:state:";
const STATE_TTL_SECS: u64 = 600;

pub const GOOGLE_PROVIDER: &str = "google";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleOauth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http_client: Client,
    redis: ConnectionManager,
}

impl GoogleOauth {
    /// Build the client when all three Google variables are present.
    pub fn from_config(config: &OauthConfig, redis: ConnectionManager) -> Option<Self> {
        match (
            &config.google_client_id,
            &config.google_client_secret,
            &config.google_redirect_url,
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(Self {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                redirect_url: redirect_url.clone(),
                http_client: Client::new(),
                redis,
            }),
            _ => None,
        }
    }

    /// Create a single-use state token and build the authorization URL.
    pub async fn authorization_url(&self) -> Result<String> {
        let state = generate_opaque_token();

        let key = format!("{}{}", STATE_KEY_PREFIX, state);
        let mut conn = self.redis.clone();
        let _: () = conn.set_ex(&key, 1u8, STATE_TTL_SECS).await?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&state)
        ))
    }

    /// Consume a state token. Unknown, expired or reused states all fail
    /// the same way.
    pub async fn consume_state(&self, state: &str) -> Result<()> {
        if state.is_empty() {
            return Err(AuthError::Oauth("missing state parameter".to_string()));
        }

        let key = format!("{}{}", STATE_KEY_PREFIX, state);
        let mut conn = self.redis.clone();

        let found: Option<u8> = conn.get_del(&key).await?;
        if found.is_none() {
            return Err(AuthError::Oauth("invalid or expired state".to_string()));
        }

        Ok(())
    }

    /// Exchange the authorization code and fetch the user's identity.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Oauth("authorization code exchange failed".to_string()));
        }

        let token_response = response.json::<GoogleTokenResponse>().await?;

        let user_info = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token_response.access_token)
            .send()
            .await?
            .json::<GoogleUserInfo>()
            .await?;

        Ok(user_info)
    }
}
