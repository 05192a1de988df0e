pub mod jwt;
pub mod otp;
pub mod password;
pub mod token_digest;
