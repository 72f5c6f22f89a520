//! Settlement calculator.
//!
//! Reconciles what a registration owes when staff confirm (or refuse) a
//! payment and returns the registration with its payment flags and stack
//! updated. Chips from newly credited bonuses, bonus add-ons and the add-on
//! are summed and applied to the stack once.

use super::ledger::{apply_adjustment, rebuy_cost};
use super::models::{PaymentStatus, Registration};
use crate::tournament::{Tournament, TournamentError, TournamentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Staff payment confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// `false` withdraws the player
    pub confirm_payment: bool,
    #[serde(default)]
    pub include_buy_in: bool,
    #[serde(default)]
    pub include_addon: bool,
    #[serde(default)]
    pub selected_bonuses: Vec<String>,
    #[serde(default)]
    pub selected_bonus_addons: Vec<String>,
}

/// Settled registration plus the amount collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementOutcome {
    pub registration: Registration,
    /// Money owed for the items settled by this request
    pub amount_due: i64,
    /// Chips added to the stack by this request
    pub stack_delta: i64,
}

/// Settle a registration against its tournament
///
/// Bonuses chosen at registration already hold their chips; settling them
/// here only marks them paid.
///
/// # Errors
///
/// * `TournamentError::InvalidBonusSelection` - A selected bonus or bonus add-on is not defined
/// * `TournamentError::InvalidInput` - The rebuy total is too large
pub fn settle(
    registration: &Registration,
    tournament: &Tournament,
    request: &SettlementRequest,
    now: DateTime<Utc>,
) -> TournamentResult<SettlementOutcome> {
    let mut settled = registration.clone();

    if !request.confirm_payment {
        settled.payment_status = PaymentStatus::Eliminated;
        settled.eliminated = true;
        return Ok(SettlementOutcome {
            registration: settled,
            amount_due: 0,
            stack_delta: 0,
        });
    }

    for name in request
        .selected_bonuses
        .iter()
        .chain(request.selected_bonus_addons.iter())
    {
        if tournament.bonus(name).is_none() {
            return Err(TournamentError::InvalidBonusSelection(name.clone()));
        }
    }

    let config = &tournament.config;
    let mut stack_delta = 0i64;
    let mut amount_due = 0i64;

    if !settled.rebuys_paid {
        amount_due = rebuy_cost(&config.rebuy, settled.single_rebuys, settled.double_rebuys)?;
    }
    settled.rebuys_paid = true;
    settled.payment_status = PaymentStatus::Paid;
    settled.payment_timestamp = Some(now);

    if request.include_buy_in {
        if !settled.buy_in_paid {
            amount_due = amount_due.saturating_add(config.buy_in);
        }
        settled.buy_in_paid = true;
    }

    for name in &request.selected_bonuses {
        let Some(bonus) = tournament.bonus(name) else {
            continue;
        };
        if !settled.selected_bonuses.contains(name) {
            stack_delta = stack_delta.saturating_add(bonus.stack);
            settled.selected_bonuses.push(name.clone());
        }
        if !settled.bonuses_paid.contains(name) {
            amount_due = amount_due.saturating_add(bonus.price);
            settled.bonuses_paid.push(name.clone());
        }
    }

    for name in &request.selected_bonus_addons {
        if settled.bonus_addons_used.contains(name) {
            continue;
        }
        if let Some(addon) = tournament.bonus(name).and_then(|b| b.addon.as_ref()) {
            stack_delta = stack_delta.saturating_add(addon.stack);
            amount_due = amount_due.saturating_add(addon.price);
        }
        settled.bonus_addons_used.push(name.clone());
    }

    if settled.addon_used && !settled.addon_paid {
        amount_due = amount_due.saturating_add(config.addon.price);
        settled.addon_paid = true;
    }

    if request.include_addon && !settled.addon_used && config.addon.allowed {
        stack_delta = stack_delta.saturating_add(config.addon.stack);
        amount_due = amount_due.saturating_add(config.addon.price);
        settled.addon_used = true;
        settled.addon_paid = true;
    }

    settled.current_stack = apply_adjustment(settled.current_stack, stack_delta);

    Ok(SettlementOutcome {
        registration: settled,
        amount_due,
        stack_delta,
    })
}
