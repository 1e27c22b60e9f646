use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of snapshots retained in the undo history; the oldest entry
/// is evicted when a push would exceed this.
pub const UNDO_DEPTH: usize = 3;

/// A team participating in the rotation.
///
/// Teams are created once at session start and never added, removed, or
/// renamed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Stable identifier for the team, unique within the session.
    pub id: Uuid,
    /// Display name ("Team 1".."Team N" in creation order).
    pub name: String,
    /// Optional color tag (lowercase hyphenated, e.g. "red"); `None` means no color.
    pub color: Option<String>,
}

/// The pair of teams currently playing.
///
/// The A/B tags are display slots only; they carry no competitive meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnField {
    /// Team shown in slot A.
    pub a_team_id: Uuid,
    /// Team shown in slot B.
    pub b_team_id: Uuid,
}

impl OnField {
    /// Whether `team_id` occupies one of the two field slots.
    pub fn contains(&self, team_id: Uuid) -> bool {
        team_id == self.a_team_id || team_id == self.b_team_id
    }
}

/// Session rules. The reducer itself never consults these; the goal cap is
/// carried for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleSet {
    /// Optional goal cap; `None` means "no cap".
    pub goal_cap: Option<u32>,
}

/// Coarse phase of the session.
///
/// `TieDecision` is declared for the 3-team tie-resolution flow but has no
/// transition logic yet; treat it as informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    /// Two known teams on field; winner and tie events are accepted.
    #[serde(rename = "normal")]
    #[default]
    Normal,
    /// Reserved phase for resolving a tie in a 3-team session.
    #[serde(rename = "tieDecision")]
    TieDecision,
}

/// Structural copy of a [`RotationState`] minus its own undo history, taken
/// immediately before a transition so the transition can be reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Version tag of the captured state.
    pub version: u32,
    /// Team roster at capture time (identical across a session's lifetime).
    pub teams: IndexMap<Uuid, Team>,
    /// On-field pair at capture time.
    pub on_field: OnField,
    /// Queue at capture time.
    pub queue: Vec<Uuid>,
    /// Phase at capture time.
    pub phase: SessionPhase,
    /// Rules at capture time.
    pub rules: RuleSet,
}

impl StateSnapshot {
    /// Rebuild a full [`RotationState`] from this snapshot and the undo
    /// history that should remain after restoring it.
    pub fn restore(self, undo: Vec<StateSnapshot>) -> RotationState {
        RotationState {
            version: self.version,
            teams: self.teams,
            on_field: self.on_field,
            queue: self.queue,
            phase: self.phase,
            rules: self.rules,
            undo,
        }
    }
}

impl From<&RotationState> for StateSnapshot {
    fn from(state: &RotationState) -> Self {
        Self {
            version: state.version,
            teams: state.teams.clone(),
            on_field: state.on_field,
            queue: state.queue.clone(),
            phase: state.phase,
            rules: state.rules,
        }
    }
}

/// Setup parameters collected by the session form.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    /// Number of teams to create (at least 2; fewer than 3 will later fail
    /// the rotation invariants, which is the documented limitation for
    /// 2-team sessions).
    pub team_count: usize,
    /// Optional goal cap, stored verbatim.
    pub goal_cap: Option<u32>,
    /// Normalized color tag per team index (0-based); missing entries mean
    /// no color.
    pub team_colors: HashMap<usize, Option<String>>,
}

/// Aggregate state of a rotation session.
///
/// Values of this type are immutable once built: the reducer always returns a
/// freshly constructed state, which is what makes the undo history a cheap
/// list of structural snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationState {
    /// Schema version of the state shape.
    pub version: u32,
    /// All teams in creation order, keyed by identifier.
    pub teams: IndexMap<Uuid, Team>,
    /// The two teams currently playing.
    pub on_field: OnField,
    /// Teams waiting to play; the head is next up.
    pub queue: Vec<Uuid>,
    /// Coarse session phase.
    pub phase: SessionPhase,
    /// Session rules.
    pub rules: RuleSet,
    /// Prior snapshots, most recent first, capped at [`UNDO_DEPTH`].
    pub undo: Vec<StateSnapshot>,
}

/// Current schema version written into fresh states.
pub const STATE_VERSION: u32 = 1;

impl RotationState {
    /// Build the initial state for a fresh session.
    ///
    /// Teams are named "Team 1..N" in creation order with fresh identifiers;
    /// the first two go on field (A then B) and the rest queue up in creation
    /// order. Pure apart from identifier generation.
    pub fn create(setup: SessionSetup) -> Self {
        debug_assert!(setup.team_count >= 2, "a session needs at least two teams");

        let teams: IndexMap<Uuid, Team> = (0..setup.team_count)
            .map(|index| {
                let id = Uuid::new_v4();
                let team = Team {
                    id,
                    name: format!("Team {}", index + 1),
                    color: setup.team_colors.get(&index).cloned().flatten(),
                };
                (id, team)
            })
            .collect();

        let mut ids = teams.keys().copied();
        let a_team_id = ids.next().unwrap_or_else(Uuid::new_v4);
        let b_team_id = ids.next().unwrap_or_else(Uuid::new_v4);
        let queue: Vec<Uuid> = ids.collect();

        Self {
            version: STATE_VERSION,
            teams,
            on_field: OnField {
                a_team_id,
                b_team_id,
            },
            queue,
            phase: SessionPhase::Normal,
            rules: RuleSet {
                goal_cap: setup.goal_cap,
            },
            undo: Vec::new(),
        }
    }

    /// Ordered team identifiers, creation order.
    pub fn team_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.teams.keys().copied()
    }
}
