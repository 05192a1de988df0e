pub mod auth;
pub mod email;
pub mod oauth;
pub mod otp_issuer;
pub mod tokens;
