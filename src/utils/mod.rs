pub mod auth;
pub mod base64;
pub mod time;
