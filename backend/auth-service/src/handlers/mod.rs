pub mod auth;
pub mod health;
pub mod oauth;
pub mod password;

pub use auth::{
    login, logout, logout_all, me, refresh_token, register, resend_verification, verify_email,
};
pub use health::{health_check, readiness_check};
pub use oauth::{google_callback, google_login};
pub use password::{
    change_password, complete_password_reset, request_password_reset, verify_password_reset,
};
