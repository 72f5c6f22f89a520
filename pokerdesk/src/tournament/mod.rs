//! Tournament module: configuration, catalog and per-tournament locking.
//!
//! This module provides:
//! - Tournament configuration (blinds, buy-in, bonuses, add-on, rebuy tiers)
//! - Validation of configurations at the boundary
//! - Catalog operations (create, list, status, delete, force delete)
//! - The lock registry that serializes mutations per tournament
//!
//! ## Example
//!
//! ```no_run
//! use pokerdesk::auth::AuthManager;
//! use pokerdesk::db::InMemoryRepository;
//! use pokerdesk::tournament::{TournamentConfig, TournamentLocks, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Arc::new(InMemoryRepository::new());
//!     let auth = AuthManager::new(repo.clone(), "pepper".to_string(), "secret".to_string());
//!     let tournaments = TournamentManager::new(repo, auth, TournamentLocks::new());
//!
//!     let config = TournamentConfig::new(
//!         "Sunday Special".to_string(),
//!         chrono::Utc::now(),
//!         10_000,
//!         100,
//!     );
//!
//!     let tournament = tournaments.create_tournament(config).await?;
//!     println!("Created tournament: {}", tournament.id);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod locks;
pub mod manager;
pub mod models;

pub use errors::{TournamentError, TournamentResult};
pub use locks::TournamentLocks;
pub use manager::TournamentManager;
pub use models::{
    AddonConfig, BlindLevel, Bonus, BonusAddon, RebuyConfig, RebuyKind, RebuyTier, Tournament,
    TournamentConfig, TournamentId, TournamentStatus,
};
