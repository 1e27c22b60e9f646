use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::state::session::RotationState;

/// A specific way in which a [`RotationState`] fails its data-model
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The two on-field slots name the same team.
    #[error("on-field slots must name two distinct teams (both are `{team_id}`)")]
    OnFieldNotDistinct {
        /// The identifier occupying both slots.
        team_id: Uuid,
    },
    /// An on-field slot names a team missing from the roster.
    #[error("on-field team `{team_id}` is not part of the session roster")]
    OnFieldTeamMissing {
        /// The unknown identifier.
        team_id: Uuid,
    },
    /// The queue lists the same team more than once.
    #[error("queue contains team `{team_id}` more than once")]
    DuplicateQueueEntry {
        /// The duplicated identifier.
        team_id: Uuid,
    },
    /// A team is both on field and queued.
    #[error("on-field team `{team_id}` also appears in the queue")]
    OnFieldTeamQueued {
        /// The doubly placed identifier.
        team_id: Uuid,
    },
    /// On-field plus queue do not account for every team exactly once.
    #[error("placement accounts for {accounted} teams but the roster has {expected}")]
    TeamCountMismatch {
        /// Distinct identifiers placed on field or in the queue.
        accounted: usize,
        /// Roster size.
        expected: usize,
    },
    /// The session has fewer teams than the rotation supports.
    #[error("rotation needs at least 3 teams, session has {count}")]
    TooFewTeams {
        /// Roster size.
        count: usize,
    },
}

/// Check every data-model invariant against `state`.
///
/// Total and side-effect free: it reports the first violation found, it never
/// panics. Callers decide whether a violation is fatal.
pub fn check(state: &RotationState) -> Result<(), InvariantViolation> {
    let on_field = state.on_field;

    // Invariant 1: exactly two distinct on-field teams, both known.
    if on_field.a_team_id == on_field.b_team_id {
        return Err(InvariantViolation::OnFieldNotDistinct {
            team_id: on_field.a_team_id,
        });
    }
    for team_id in [on_field.a_team_id, on_field.b_team_id] {
        if !state.teams.contains_key(&team_id) {
            return Err(InvariantViolation::OnFieldTeamMissing { team_id });
        }
    }

    // Invariant 2: no duplicate queue entries.
    let mut queued = HashSet::with_capacity(state.queue.len());
    for &team_id in &state.queue {
        if !queued.insert(team_id) {
            return Err(InvariantViolation::DuplicateQueueEntry { team_id });
        }
    }

    // Invariant 3: on-field teams are not queued.
    for team_id in [on_field.a_team_id, on_field.b_team_id] {
        if queued.contains(&team_id) {
            return Err(InvariantViolation::OnFieldTeamQueued { team_id });
        }
    }

    // Invariant 4: on-field + queue covers the roster exactly once.
    let accounted = queued.len() + 2;
    if accounted != state.teams.len() {
        return Err(InvariantViolation::TeamCountMismatch {
            accounted,
            expected: state.teams.len(),
        });
    }

    // Invariant 5: rotation needs at least 3 teams.
    if state.teams.len() < 3 {
        return Err(InvariantViolation::TooFewTeams {
            count: state.teams.len(),
        });
    }

    Ok(())
}
