//! HTTP route handlers.

pub mod cms;
pub mod handover;
pub mod health;
pub mod session_hint;
pub mod state;
pub mod validate_token;
