//! Registration data models.

use crate::auth::UserId;
use crate::tournament::{RebuyKind, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration ID type
pub type RegistrationId = i64;

/// Payment status of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    /// Player declined to pay and was withdrawn
    Eliminated,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Eliminated => "eliminated",
        }
    }

    /// Parse the stored representation
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "eliminated" => Some(PaymentStatus::Eliminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state, derived from the registration flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Registered,
    CheckedIn,
    Eliminated,
    Champion,
}

/// One rebuy purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuyEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: RebuyKind,
    /// Chips added by this rebuy
    pub stack: i64,
}

/// A player's entry in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub checked_in: bool,
    pub current_stack: i64,
    /// Bonuses credited to the stack
    pub selected_bonuses: Vec<String>,
    pub bonuses_paid: Vec<String>,
    pub bonus_addons_used: Vec<String>,
    pub addon_used: bool,
    pub addon_paid: bool,
    pub single_rebuys: u32,
    pub double_rebuys: u32,
    pub rebuy_history: Vec<RebuyEvent>,
    pub eliminated: bool,
    /// 1 = first out; assigned at elimination
    pub elimination_order: Option<u32>,
    /// 1 = champion; assigned once a champion exists
    pub finish_place: Option<u32>,
    pub payment_status: PaymentStatus,
    pub buy_in_paid: bool,
    pub rebuys_paid: bool,
    pub payment_timestamp: Option<DateTime<Utc>>,
    pub seat_number: Option<u32>,
    pub table_number: Option<u32>,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Current lifecycle state
    pub fn state(&self) -> RegistrationState {
        if self.is_champion() {
            RegistrationState::Champion
        } else if self.eliminated {
            RegistrationState::Eliminated
        } else if self.checked_in {
            RegistrationState::CheckedIn
        } else {
            RegistrationState::Registered
        }
    }

    pub fn is_champion(&self) -> bool {
        self.finish_place == Some(1)
    }

    /// Checked in and not yet knocked out
    pub fn is_active(&self) -> bool {
        self.checked_in && !self.eliminated
    }
}

/// Data needed to insert a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub current_stack: i64,
    pub selected_bonuses: Vec<String>,
}

impl NewRegistration {
    /// Materialize a fresh registration with default flags
    pub fn into_registration(self, id: RegistrationId, registered_at: DateTime<Utc>) -> Registration {
        Registration {
            id,
            tournament_id: self.tournament_id,
            user_id: self.user_id,
            checked_in: false,
            current_stack: self.current_stack,
            selected_bonuses: self.selected_bonuses,
            bonuses_paid: Vec::new(),
            bonus_addons_used: Vec::new(),
            addon_used: false,
            addon_paid: false,
            single_rebuys: 0,
            double_rebuys: 0,
            rebuy_history: Vec::new(),
            eliminated: false,
            elimination_order: None,
            finish_place: None,
            payment_status: PaymentStatus::Pending,
            buy_in_paid: false,
            rebuys_paid: false,
            payment_timestamp: None,
            seat_number: None,
            table_number: None,
            registered_at,
        }
    }
}

/// Staff-entered registration for a walk-in player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualRegistration {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub selected_bonuses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        NewRegistration {
            tournament_id: 1,
            user_id: 2,
            current_stack: 10_000,
            selected_bonuses: vec![],
        }
        .into_registration(3, Utc::now())
    }

    #[test]
    fn test_fresh_registration_defaults() {
        let reg = registration();
        assert_eq!(reg.state(), RegistrationState::Registered);
        assert_eq!(reg.payment_status, PaymentStatus::Pending);
        assert_eq!(reg.single_rebuys, 0);
        assert!(reg.finish_place.is_none());
    }

    #[test]
    fn test_state_progression() {
        let mut reg = registration();
        reg.checked_in = true;
        assert_eq!(reg.state(), RegistrationState::CheckedIn);
        assert!(reg.is_active());

        reg.eliminated = true;
        reg.elimination_order = Some(1);
        assert_eq!(reg.state(), RegistrationState::Eliminated);
        assert!(!reg.is_active());
    }

    #[test]
    fn test_champion_state_wins_over_eliminated_flag() {
        let mut reg = registration();
        reg.checked_in = true;
        reg.eliminated = true;
        reg.finish_place = Some(1);
        assert_eq!(reg.state(), RegistrationState::Champion);
    }

    #[test]
    fn test_payment_status_from_db() {
        assert_eq!(PaymentStatus::from_db("paid"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::from_db("refunded"), None);
    }
}
