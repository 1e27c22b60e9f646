use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{
    reducer::RejectedTransition,
    session::{RotationState, SessionPhase, Team},
};

/// Payload collected by the setup form to bootstrap a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Number of teams to create.
    pub team_count: usize,
    /// Optional goal cap; `None` means "no cap".
    pub goal_cap: Option<u32>,
    /// Raw color choice per team index (0-based); missing entries mean no
    /// color.
    #[serde(default)]
    pub team_colors: HashMap<usize, String>,
}

/// Render-ready team data.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional color tag.
    pub color: Option<String>,
    /// Short badge text derived from the name.
    pub abbreviation: String,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            color: team.color.clone(),
            abbreviation: abbreviate(&team.name),
        }
    }
}

/// The on-field pair, resolved for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OnFieldView {
    /// Team shown in slot A.
    pub a: TeamView,
    /// Team shown in slot B.
    pub b: TeamView,
}

/// Render-ready projection of a [`RotationState`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Coarse session phase.
    pub phase: SessionPhase,
    /// The two teams currently playing.
    pub on_field: OnFieldView,
    /// Waiting teams, head of queue first.
    pub queue: Vec<TeamView>,
    /// Optional goal cap from the session rules.
    pub goal_cap: Option<u32>,
    /// Number of undo snapshots currently available.
    pub undo_depth: usize,
}

impl SessionView {
    /// Resolve every identifier in `state` to display data.
    ///
    /// Returns `None` when the state references a team missing from its own
    /// roster, which cannot happen for states that pass the invariant
    /// checker.
    pub fn project(state: &RotationState) -> Option<Self> {
        let team = |id: Uuid| state.teams.get(&id).map(TeamView::from);

        Some(Self {
            phase: state.phase,
            on_field: OnFieldView {
                a: team(state.on_field.a_team_id)?,
                b: team(state.on_field.b_team_id)?,
            },
            queue: state
                .queue
                .iter()
                .map(|&id| team(id))
                .collect::<Option<Vec<_>>>()?,
            goal_cap: state.rules.goal_cap,
            undo_depth: state.undo.len(),
        })
    }
}

/// Outcome of applying one event through the service layer.
#[derive(Debug, Clone)]
pub struct TransitionReport {
    /// The authoritative session after the call (unchanged on rejection).
    pub session: SessionView,
    /// Why the transition was refused, when it was.
    pub rejected: Option<RejectedTransition>,
    /// Whether the reported state is known to be durably saved. `false`
    /// means the most recent write failed; the in-memory state stays
    /// authoritative. On a rejection this carries the status of the last
    /// attempted save, since rejections write nothing.
    pub persisted: bool,
}

/// Badge text for a team name: initials for multi-word names, the first two
/// letters otherwise.
fn abbreviate(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > 1 {
        words
            .iter()
            .filter_map(|word| word.chars().next())
            .collect::<String>()
            .to_uppercase()
    } else {
        name.trim().chars().take(2).collect::<String>().to_uppercase()
    }
}
