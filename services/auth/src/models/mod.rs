//! Authentication service models

pub mod token;
pub mod user;

// Re-export for convenience
pub use token::RefreshToken;
pub use user::{NewUser, User};
