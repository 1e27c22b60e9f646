use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::state::{
    invariants,
    session::{OnField, RotationState, StateSnapshot, UNDO_DEPTH},
};

/// Event consumed by the rotation reducer.
///
/// The serde shape mirrors the persisted event blob (`{"type": "...", ...}`),
/// and unrecognized tags fold into [`SessionEvent::Unknown`] so stored events
/// from newer shapes still deserialize and reduce to a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// One of the on-field teams won the match.
    DeclareWinner {
        /// Identifier of the winning team; must currently be on field.
        #[serde(rename = "winnerTeamId")]
        winner_team_id: Uuid,
    },
    /// The match ended without a winner; both on-field teams rotate out.
    DeclareTie,
    /// Restore the most recent undo snapshot, if any.
    Undo,
    /// Fallback for event tags this build does not know.
    #[serde(other)]
    Unknown,
}

/// Why a transition was refused.
///
/// A rejection is a diagnostic, not a fault: the reducer leaves the input
/// state untouched and the session stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectedTransition {
    /// The declared winner is not one of the two on-field teams.
    #[error("team `{winner_team_id}` is not on field")]
    WinnerNotOnField {
        /// The identifier that was declared.
        winner_team_id: Uuid,
    },
    /// The queue is empty, so no team can rotate in. A 2-team session always
    /// ends up here; that configuration is unsupported rather than
    /// special-cased.
    #[error("queue is empty; no team available to rotate in")]
    EmptyQueue,
    /// A tie needs two replacement teams waiting.
    #[error("queue holds {queued} team(s); a tie needs two replacements")]
    QueueTooShort {
        /// Current queue length.
        queued: usize,
    },
}

/// Apply `event` to `state`, returning the next state.
///
/// Pure and total: the same (state, event) pair always yields the same
/// result, no I/O or clock is consulted, and no event value makes this
/// panic. On rejection the input is left untouched and no undo entry is
/// pushed; the caller keeps its state and surfaces the diagnostic as it
/// sees fit.
pub fn apply_event(
    state: &RotationState,
    event: &SessionEvent,
) -> Result<RotationState, RejectedTransition> {
    match event {
        SessionEvent::DeclareWinner { winner_team_id } => {
            apply_declare_winner(state, *winner_team_id)
        }
        SessionEvent::DeclareTie => apply_declare_tie(state),
        SessionEvent::Undo => Ok(apply_undo(state)),
        SessionEvent::Unknown => Ok(state.clone()),
    }
}

/// Winner stays in slot A, the queue head takes slot B, the loser joins the
/// queue tail.
fn apply_declare_winner(
    state: &RotationState,
    winner_team_id: Uuid,
) -> Result<RotationState, RejectedTransition> {
    if !state.on_field.contains(winner_team_id) {
        return Err(RejectedTransition::WinnerNotOnField { winner_team_id });
    }

    let Some((&incoming, remaining)) = state.queue.split_first() else {
        return Err(RejectedTransition::EmptyQueue);
    };

    let loser_team_id = if winner_team_id == state.on_field.a_team_id {
        state.on_field.b_team_id
    } else {
        state.on_field.a_team_id
    };

    let mut queue = remaining.to_vec();
    queue.push(loser_team_id);

    let next = RotationState {
        on_field: OnField {
            a_team_id: winner_team_id,
            b_team_id: incoming,
        },
        queue,
        undo: push_snapshot(state),
        ..state.clone()
    };

    verify(&next, "DECLARE_WINNER");
    Ok(next)
}

/// Both on-field teams rotate out; the two queue heads take the field and the
/// old pair is appended in A-then-B order.
fn apply_declare_tie(state: &RotationState) -> Result<RotationState, RejectedTransition> {
    if state.queue.len() < 2 {
        return Err(RejectedTransition::QueueTooShort {
            queued: state.queue.len(),
        });
    }

    let mut queue: Vec<Uuid> = state.queue[2..].to_vec();
    queue.push(state.on_field.a_team_id);
    queue.push(state.on_field.b_team_id);

    let next = RotationState {
        on_field: OnField {
            a_team_id: state.queue[0],
            b_team_id: state.queue[1],
        },
        queue,
        undo: push_snapshot(state),
        ..state.clone()
    };

    verify(&next, "DECLARE_TIE");
    Ok(next)
}

/// Pop the most recent snapshot and make it current; a no-op when the history
/// is empty. Undo never pushes an undo entry of its own (no redo stack).
fn apply_undo(state: &RotationState) -> RotationState {
    let mut history = state.undo.clone();
    if history.is_empty() {
        return state.clone();
    }
    let snapshot = history.remove(0);
    snapshot.restore(history)
}

/// Snapshot the pre-transition state onto the front of the history, evicting
/// the oldest entry beyond [`UNDO_DEPTH`].
fn push_snapshot(state: &RotationState) -> Vec<StateSnapshot> {
    let mut history = Vec::with_capacity(UNDO_DEPTH);
    history.push(StateSnapshot::from(state));
    history.extend(state.undo.iter().take(UNDO_DEPTH - 1).cloned());
    history
}

/// Post-transition invariant check. A violation here is a reducer defect, not
/// a user-input problem: abort loudly in debug builds, log and proceed in
/// release builds.
fn verify(next: &RotationState, event: &'static str) {
    if let Err(violation) = invariants::check(next) {
        if cfg!(debug_assertions) {
            panic!("invariant violation after {event}: {violation}");
        }
        error!(%violation, event, "reducer produced an inconsistent state");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::state::session::{RotationState, SessionSetup, StateSnapshot};

    fn fresh(team_count: usize) -> RotationState {
        RotationState::create(SessionSetup {
            team_count,
            goal_cap: None,
            team_colors: HashMap::new(),
        })
    }

    fn ids(state: &RotationState) -> Vec<Uuid> {
        state.team_ids().collect()
    }

    fn declare_winner(winner_team_id: Uuid) -> SessionEvent {
        SessionEvent::DeclareWinner { winner_team_id }
    }

    #[test]
    fn winner_keeps_field_and_loser_joins_queue_tail() {
        // 4 teams: on field {T1, T2}, queue [T3, T4].
        let state = fresh(4);
        let t = ids(&state);

        let next = apply_event(&state, &declare_winner(t[0])).unwrap();

        assert_eq!(next.on_field.a_team_id, t[0]);
        assert_eq!(next.on_field.b_team_id, t[2]);
        assert_eq!(next.queue, vec![t[3], t[1]]);
        assert_eq!(next.queue.len(), state.queue.len());
        assert_eq!(invariants::check(&next), Ok(()));
    }

    #[test]
    fn winner_in_slot_b_also_rotates_correctly() {
        let state = fresh(4);
        let t = ids(&state);

        let next = apply_event(&state, &declare_winner(t[1])).unwrap();

        assert_eq!(next.on_field.a_team_id, t[1]);
        assert_eq!(next.on_field.b_team_id, t[2]);
        assert_eq!(next.queue, vec![t[3], t[0]]);
    }

    #[test]
    fn tie_brings_in_both_queue_heads_in_order() {
        // 4 teams: on field {T1, T2}, queue [T3, T4].
        let state = fresh(4);
        let t = ids(&state);

        let next = apply_event(&state, &SessionEvent::DeclareTie).unwrap();

        assert_eq!(next.on_field.a_team_id, t[2]);
        assert_eq!(next.on_field.b_team_id, t[3]);
        assert_eq!(next.queue, vec![t[0], t[1]]);
        assert_eq!(invariants::check(&next), Ok(()));
    }

    #[test]
    fn tie_with_single_queued_team_is_rejected() {
        // 3 teams: queue [T3] is too short for a tie.
        let state = fresh(3);

        let err = apply_event(&state, &SessionEvent::DeclareTie).unwrap_err();

        assert_eq!(err, RejectedTransition::QueueTooShort { queued: 1 });
    }

    #[test]
    fn winner_not_on_field_is_rejected_without_any_change() {
        let state = fresh(4);
        let queued = state.queue[0];

        let err = apply_event(&state, &declare_winner(queued)).unwrap_err();

        assert_eq!(
            err,
            RejectedTransition::WinnerNotOnField {
                winner_team_id: queued
            }
        );
        // The caller's state is untouched, field for field.
        assert!(state.undo.is_empty());
    }

    #[test]
    fn winner_with_empty_queue_is_rejected() {
        let state = fresh(2);
        let a = state.on_field.a_team_id;

        let err = apply_event(&state, &declare_winner(a)).unwrap_err();

        assert_eq!(err, RejectedTransition::EmptyQueue);
    }

    #[test]
    fn successful_transition_pushes_pre_state_snapshot() {
        let state = fresh(4);
        let a = state.on_field.a_team_id;

        let next = apply_event(&state, &declare_winner(a)).unwrap();

        assert_eq!(next.undo.len(), 1);
        assert_eq!(next.undo[0], StateSnapshot::from(&state));
    }

    #[test]
    fn undo_history_is_capped_at_three_snapshots() {
        let mut state = fresh(4);

        for expected_depth in 1..=3 {
            let a = state.on_field.a_team_id;
            state = apply_event(&state, &declare_winner(a)).unwrap();
            assert_eq!(state.undo.len(), expected_depth);
        }

        let third_snapshot = state.undo[0].clone();
        let a = state.on_field.a_team_id;
        state = apply_event(&state, &declare_winner(a)).unwrap();

        // Fourth push evicts the oldest entry; the previous newest shifts down.
        assert_eq!(state.undo.len(), 3);
        assert_eq!(state.undo[1], third_snapshot);
    }

    #[test]
    fn undo_restores_the_pre_transition_state() {
        let state = fresh(4);
        let a = state.on_field.a_team_id;
        let advanced = apply_event(&state, &declare_winner(a)).unwrap();

        let restored = apply_event(&advanced, &SessionEvent::Undo).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn undo_is_not_itself_undoable() {
        let state = fresh(4);
        let a = state.on_field.a_team_id;
        let advanced = apply_event(&state, &declare_winner(a)).unwrap();
        let restored = apply_event(&advanced, &SessionEvent::Undo).unwrap();

        // History was consumed, not re-pushed; a second undo is a no-op.
        assert!(restored.undo.is_empty());
        let again = apply_event(&restored, &SessionEvent::Undo).unwrap();
        assert_eq!(again, restored);
    }

    #[test]
    fn undo_after_two_transitions_steps_back_one_at_a_time() {
        let initial = fresh(5);
        let a = initial.on_field.a_team_id;
        let first = apply_event(&initial, &declare_winner(a)).unwrap();
        let second = apply_event(&first, &SessionEvent::DeclareTie).unwrap();

        let back_one = apply_event(&second, &SessionEvent::Undo).unwrap();
        assert_eq!(back_one, first);

        let back_two = apply_event(&back_one, &SessionEvent::Undo).unwrap();
        assert_eq!(back_two, initial);
    }

    #[test]
    fn rejected_transition_pushes_no_undo_entry() {
        let state = fresh(3);
        let before = state.clone();

        let _ = apply_event(&state, &SessionEvent::DeclareTie).unwrap_err();

        assert_eq!(state, before);
    }

    #[test]
    fn unknown_event_is_a_no_op() {
        let state = fresh(4);
        let next = apply_event(&state, &SessionEvent::Unknown).unwrap();
        assert_eq!(next, state);
    }

    #[test]
    fn unrecognized_event_tag_deserializes_to_unknown() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"RESOLVE_TIE_STAY"}"#).unwrap();
        assert_eq!(event, SessionEvent::Unknown);

        let state = fresh(4);
        let next = apply_event(&state, &event).unwrap();
        assert_eq!(next, state);
    }

    #[test]
    fn declare_winner_event_round_trips_through_serde() {
        let winner = Uuid::new_v4();
        let event = declare_winner(winner);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("DECLARE_WINNER"));
        assert!(json.contains("winnerTeamId"));
        assert_eq!(serde_json::from_str::<SessionEvent>(&json).unwrap(), event);
    }

    #[test]
    fn three_team_rotation_cycles_through_every_team() {
        let state = fresh(3);
        let t = ids(&state);

        // T1 beats T2; T3 comes in, T2 waits.
        let next = apply_event(&state, &declare_winner(t[0])).unwrap();
        assert_eq!(next.on_field.a_team_id, t[0]);
        assert_eq!(next.on_field.b_team_id, t[2]);
        assert_eq!(next.queue, vec![t[1]]);

        // T3 beats T1; T2 comes back in.
        let next = apply_event(&next, &declare_winner(t[2])).unwrap();
        assert_eq!(next.on_field.a_team_id, t[2]);
        assert_eq!(next.on_field.b_team_id, t[1]);
        assert_eq!(next.queue, vec![t[0]]);
    }
}
