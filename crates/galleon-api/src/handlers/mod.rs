pub mod basic_auth;
pub mod health;
