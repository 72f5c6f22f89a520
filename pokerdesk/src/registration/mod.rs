//! Registration module: a player's entry in a tournament from sign-up to
//! final standing.
//!
//! - [`ledger`]: chip arithmetic
//! - [`elimination`]: elimination order, champion detection, finish places
//! - [`settlement`]: payment reconciliation
//! - [`manager`]: the lifecycle operations, persisted through the repository

pub mod elimination;
pub mod ledger;
pub mod manager;
pub mod models;
pub mod settlement;

pub use elimination::EliminationOutcome;
pub use manager::RegistrationManager;
pub use models::{
    ManualRegistration, NewRegistration, PaymentStatus, RebuyEvent, Registration, RegistrationId,
    RegistrationState,
};
pub use settlement::{SettlementOutcome, SettlementRequest};
