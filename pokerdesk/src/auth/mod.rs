//! Authentication module providing user accounts and access tokens.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - JWT access tokens carrying the staff flag
//! - Walk-in account creation for staff-entered registrations
//! - Password re-verification for destructive staff actions
//!
//! ## Example
//!
//! ```no_run
//! use pokerdesk::auth::{AuthManager, RegisterRequest};
//! use pokerdesk::db::InMemoryRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthManager::new(
//!         Arc::new(InMemoryRepository::new()),
//!         "secret_pepper".to_string(),
//!         "jwt_secret".to_string(),
//!     );
//!
//!     let request = RegisterRequest {
//!         email: "player@example.com".to_string(),
//!         name: "Player One".to_string(),
//!         password: "SecurePass123".to_string(),
//!     };
//!
//!     let user = auth.register(request).await?;
//!     println!("Registered user: {}", user.email);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, normalize_email};
pub use models::{AccessTokenClaims, LoginRequest, NewUser, RegisterRequest, User, UserId};
