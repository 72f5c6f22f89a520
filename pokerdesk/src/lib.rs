//! # Pokerdesk
//!
//! Back-office library for running live poker tournaments: player registration,
//! check-in, rebuys and add-ons, eliminations and payment settlement.
//!
//! ## Architecture
//!
//! Every registration moves through a small lifecycle:
//!
//! - **Registered**: signed up, stack seeded from the starting stack and any bonuses
//! - **CheckedIn**: present at the venue and counted in the field
//! - **Eliminated**: knocked out, holds an elimination order
//! - **Champion**: last player standing, finish place 1
//!
//! The arithmetic behind those transitions lives in pure modules
//! ([`registration::ledger`], [`registration::elimination`],
//! [`registration::settlement`]). The managers load records through an
//! injected [`db::TournamentRepository`], run the pure step and write the
//! result back while holding a per-tournament lock.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Tournament configuration, catalog operations and locking
//! - [`registration`]: Registration lifecycle, stack ledger, eliminations, settlement
//! - [`auth`]: User accounts, password hashing and access tokens
//! - [`db`]: PostgreSQL pool, repository trait and an in-memory repository
//! - [`export`]: CSV rendering of final standings
//!
//! ## Example
//!
//! ```
//! use pokerdesk::registration::ledger::apply_adjustment;
//!
//! // A single rebuy worth 10,000 chips
//! assert_eq!(apply_adjustment(10_000, 10_000), 20_000);
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod export;
pub mod registration;
pub mod tournament;

pub use error::ErrorKind;
