//! Elimination engine.
//!
//! Assigns elimination order to a knocked-out player and, once exactly one
//! checked-in player is left, crowns that player and converts every
//! elimination order into a finish place.
//!
//! The engine is pure: it receives the tournament's registrations and returns
//! the rows that changed. Persisting them is the caller's job, and must happen
//! in one batch write.

use super::models::Registration;
use crate::tournament::{TournamentError, TournamentResult};

/// Result of one elimination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationOutcome {
    /// The eliminated registration, after the update
    pub eliminated: Registration,
    /// The auto-crowned champion, if this elimination left one player standing
    pub champion: Option<Registration>,
    /// Every registration whose row changed, including the two above
    pub changed: Vec<Registration>,
}

/// Eliminate `target` from the field described by `registrations`
///
/// `registrations` is every registration of the tournament, `target` included.
///
/// # Errors
///
/// * `TournamentError::AlreadyEliminated` - Target is already out
/// * `TournamentError::NotCheckedIn` - Target never checked in
pub fn eliminate(
    registrations: &[Registration],
    target: &Registration,
) -> TournamentResult<EliminationOutcome> {
    if target.eliminated {
        return Err(TournamentError::AlreadyEliminated);
    }
    if !target.checked_in {
        return Err(TournamentError::NotCheckedIn);
    }

    let total_players = registrations.iter().filter(|r| r.checked_in).count() as u32;
    // Withdrawn registrations that never checked in are not part of the field
    let eliminated_players = registrations
        .iter()
        .filter(|r| r.checked_in && r.eliminated)
        .count() as u32;

    let mut updated: Vec<Registration> = registrations.to_vec();

    let order = eliminated_players + 1;
    let target_idx = match updated.iter().position(|r| r.id == target.id) {
        Some(idx) => idx,
        None => {
            updated.push(target.clone());
            updated.len() - 1
        }
    };
    {
        let row = &mut updated[target_idx];
        row.eliminated = true;
        row.elimination_order = Some(order);
        row.finish_place = None;
    }

    let mut champion_idx = None;
    if i64::from(total_players) - i64::from(order) == 1 {
        let active: Vec<usize> = updated
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active())
            .map(|(idx, _)| idx)
            .collect();
        champion_idx = match active.as_slice() {
            [idx] => Some(*idx),
            _ => None,
        };
        match champion_idx {
            Some(idx) => {
                let champion = &mut updated[idx];
                champion.elimination_order = Some(total_players);
                champion.finish_place = Some(1);
                champion.eliminated = true;
                log::info!(
                    "Tournament {}: user {} crowned champion of {} players",
                    champion.tournament_id,
                    champion.user_id,
                    total_players
                );
            }
            None => log::warn!(
                "Tournament {}: one player should remain but {} are active",
                target.tournament_id,
                active.len()
            ),
        }
    }

    if champion_idx.is_some() {
        finalize_places(&mut updated, total_players);
    }

    let eliminated = updated[target_idx].clone();
    let champion = champion_idx.map(|idx| updated[idx].clone());

    let changed = updated
        .into_iter()
        .filter(|row| {
            registrations
                .iter()
                .find(|orig| orig.id == row.id)
                .is_none_or(|orig| orig != row)
        })
        .collect();

    Ok(EliminationOutcome {
        eliminated,
        champion,
        changed,
    })
}

/// Convert elimination order into finish place for every ranked registration
///
/// Registrations without an elimination order (never checked in, or withdrawn
/// at settlement) keep no finish place.
pub fn finalize_places(registrations: &mut [Registration], total_players: u32) {
    for registration in registrations.iter_mut() {
        if let Some(order) = registration.elimination_order {
            let place = i64::from(total_players) - i64::from(order) + 1;
            registration.finish_place = u32::try_from(place).ok().filter(|p| *p > 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::models::NewRegistration;
    use chrono::Utc;

    fn field(n: usize) -> Vec<Registration> {
        (0..n)
            .map(|i| {
                let mut reg = NewRegistration {
                    tournament_id: 1,
                    user_id: 100 + i as i64,
                    current_stack: 10_000,
                    selected_bonuses: vec![],
                }
                .into_registration(i as i64 + 1, Utc::now());
                reg.checked_in = true;
                reg
            })
            .collect()
    }

    fn apply(field: &mut [Registration], changed: &[Registration]) {
        for row in changed {
            if let Some(slot) = field.iter_mut().find(|r| r.id == row.id) {
                *slot = row.clone();
            }
        }
    }

    #[test]
    fn test_three_player_scenario() {
        let mut regs = field(3);

        let a = regs[0].clone();
        let outcome = eliminate(&regs, &a).unwrap();
        assert_eq!(outcome.eliminated.elimination_order, Some(1));
        assert_eq!(outcome.eliminated.finish_place, None);
        assert!(outcome.champion.is_none());
        assert_eq!(outcome.changed.len(), 1);
        apply(&mut regs, &outcome.changed);

        let b = regs[1].clone();
        let outcome = eliminate(&regs, &b).unwrap();
        let champion = outcome.champion.clone().unwrap();
        assert_eq!(champion.id, regs[2].id);
        assert_eq!(champion.elimination_order, Some(3));
        assert_eq!(champion.finish_place, Some(1));
        assert!(champion.eliminated);
        apply(&mut regs, &outcome.changed);

        assert_eq!(regs[0].finish_place, Some(3));
        assert_eq!(regs[1].finish_place, Some(2));
        assert_eq!(regs[2].finish_place, Some(1));
    }

    #[test]
    fn test_already_eliminated_rejected() {
        let mut regs = field(3);
        let a = regs[0].clone();
        let outcome = eliminate(&regs, &a).unwrap();
        apply(&mut regs, &outcome.changed);

        let again = eliminate(&regs, &regs[0]);
        assert!(matches!(again, Err(TournamentError::AlreadyEliminated)));
    }

    #[test]
    fn test_not_checked_in_rejected() {
        let mut regs = field(3);
        regs[2].checked_in = false;
        let result = eliminate(&regs, &regs[2]);
        assert!(matches!(result, Err(TournamentError::NotCheckedIn)));
    }

    #[test]
    fn test_unchecked_registrations_ignored_in_head_count() {
        let mut regs = field(4);
        regs[3].checked_in = false;

        let outcome = eliminate(&regs, &regs[0].clone()).unwrap();
        assert!(outcome.champion.is_none());
        apply(&mut regs, &outcome.changed);

        let outcome = eliminate(&regs, &regs[1].clone()).unwrap();
        assert_eq!(outcome.champion.as_ref().map(|c| c.id), Some(regs[2].id));
        apply(&mut regs, &outcome.changed);

        assert_eq!(regs[3].finish_place, None);
        assert_eq!(regs[3].elimination_order, None);
    }

    #[test]
    fn test_heads_up_single_elimination_crowns() {
        let regs = field(2);
        let outcome = eliminate(&regs, &regs[1]).unwrap();
        let champion = outcome.champion.unwrap();
        assert_eq!(champion.id, regs[0].id);
        assert_eq!(outcome.eliminated.finish_place, Some(2));
        assert_eq!(outcome.changed.len(), 2);
    }

    #[test]
    fn test_unchecked_withdrawal_does_not_shorten_the_field() {
        let mut regs = field(4);
        // Registered, never checked in, then declined payment
        regs[3].checked_in = false;
        regs[3].eliminated = true;

        let outcome = eliminate(&regs, &regs[0].clone()).unwrap();
        assert_eq!(outcome.eliminated.elimination_order, Some(1));
        assert!(outcome.champion.is_none());
        apply(&mut regs, &outcome.changed);
        assert_eq!(regs.iter().filter(|r| r.is_active()).count(), 2);

        let outcome = eliminate(&regs, &regs[1].clone()).unwrap();
        assert_eq!(outcome.eliminated.elimination_order, Some(2));
        let champion = outcome.champion.clone().unwrap();
        assert_eq!(champion.id, regs[2].id);
        assert_eq!(champion.elimination_order, Some(3));
        apply(&mut regs, &outcome.changed);

        let places: Vec<Option<u32>> = regs.iter().map(|r| r.finish_place).collect();
        assert_eq!(places, vec![Some(3), Some(2), Some(1), None]);
    }

    #[test]
    fn test_withdrawn_player_counts_toward_eliminations() {
        let mut regs = field(3);
        // Declined payment at settlement: out, but without an elimination order
        regs[2].eliminated = true;

        let outcome = eliminate(&regs, &regs[0].clone()).unwrap();
        assert_eq!(outcome.eliminated.elimination_order, Some(2));
        let champion = outcome.champion.unwrap();
        assert_eq!(champion.id, regs[1].id);

        let withdrawn = outcome.changed.iter().find(|r| r.id == regs[2].id);
        assert!(withdrawn.is_none());
    }

    #[test]
    fn test_crowning_condition_not_met_leaves_places_unset() {
        let mut regs = field(2);
        regs[1].eliminated = true;
        regs[1].elimination_order = Some(1);

        let outcome = eliminate(&regs, &regs[0].clone()).unwrap();
        // order 2 of 2 players: nobody left to crown
        assert!(outcome.champion.is_none());
        assert_eq!(outcome.eliminated.elimination_order, Some(2));
        assert_eq!(outcome.eliminated.finish_place, None);
    }

    #[test]
    fn test_finalize_places() {
        let mut regs = field(4);
        for (i, reg) in regs.iter_mut().enumerate() {
            reg.elimination_order = Some(i as u32 + 1);
        }
        finalize_places(&mut regs, 4);
        let places: Vec<_> = regs.iter().map(|r| r.finish_place.unwrap()).collect();
        assert_eq!(places, vec![4, 3, 2, 1]);
    }
}
