use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::session::{
    OnField, RotationState, RuleSet, SessionPhase, StateSnapshot, Team,
};

/// Representation of a team inside the persisted session blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name chosen for the team.
    pub name: String,
    /// Optional color tag assigned at setup.
    pub color: Option<String>,
}

/// Persisted form of the on-field pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnFieldEntity {
    /// Team occupying display slot A.
    pub a_team_id: Uuid,
    /// Team occupying display slot B.
    pub b_team_id: Uuid,
}

/// Persisted form of the session rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetEntity {
    /// Optional goal cap, stored verbatim.
    pub goal_cap: Option<u32>,
}

/// Persisted undo snapshot: a session entity minus timestamp and undo list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntity {
    /// Schema version of the captured state.
    pub version: u32,
    /// Team roster at capture time.
    pub teams: Vec<TeamEntity>,
    /// On-field pair at capture time.
    pub on_field: OnFieldEntity,
    /// Queue at capture time.
    pub queue: Vec<Uuid>,
    /// Phase at capture time.
    pub phase: SessionPhase,
    /// Rules at capture time.
    pub rules: RuleSetEntity,
}

/// Aggregate session entity written to and read from the session store.
///
/// The field names mirror the blob the presentation layer historically
/// persisted, so an existing record keeps loading across versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Schema version of the state shape.
    pub version: u32,
    /// Last time the session was active; drives the staleness rule.
    #[serde(with = "time::serde::timestamp::milliseconds")]
    pub last_active_at: OffsetDateTime,
    /// All teams in creation order.
    pub teams: Vec<TeamEntity>,
    /// The two teams currently playing.
    pub on_field: OnFieldEntity,
    /// Teams waiting to play, head first.
    pub queue: Vec<Uuid>,
    /// Coarse session phase.
    pub phase: SessionPhase,
    /// Session rules.
    pub rules: RuleSetEntity,
    /// Undo snapshots, most recent first.
    pub undo: Vec<SnapshotEntity>,
}

impl SessionEntity {
    /// Capture `state` for persistence, refreshing the last-active timestamp.
    ///
    /// The timestamp is clamped to whole milliseconds, the granularity the
    /// blob stores, so a saved entity compares equal after reloading.
    pub fn snapshot(state: &RotationState) -> Self {
        Self {
            version: state.version,
            last_active_at: millisecond_precision(OffsetDateTime::now_utc()),
            teams: state.teams.values().cloned().map(Into::into).collect(),
            on_field: state.on_field.into(),
            queue: state.queue.clone(),
            phase: state.phase,
            rules: state.rules.into(),
            undo: state.undo.iter().cloned().map(Into::into).collect(),
        }
    }

    /// Age of the record relative to `now`.
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.last_active_at
    }
}

impl From<Team> for TeamEntity {
    fn from(value: Team) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
        }
    }
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
        }
    }
}

impl From<OnField> for OnFieldEntity {
    fn from(value: OnField) -> Self {
        Self {
            a_team_id: value.a_team_id,
            b_team_id: value.b_team_id,
        }
    }
}

impl From<OnFieldEntity> for OnField {
    fn from(value: OnFieldEntity) -> Self {
        Self {
            a_team_id: value.a_team_id,
            b_team_id: value.b_team_id,
        }
    }
}

impl From<RuleSet> for RuleSetEntity {
    fn from(value: RuleSet) -> Self {
        Self {
            goal_cap: value.goal_cap,
        }
    }
}

impl From<RuleSetEntity> for RuleSet {
    fn from(value: RuleSetEntity) -> Self {
        Self {
            goal_cap: value.goal_cap,
        }
    }
}

impl From<StateSnapshot> for SnapshotEntity {
    fn from(value: StateSnapshot) -> Self {
        Self {
            version: value.version,
            teams: value.teams.into_values().map(Into::into).collect(),
            on_field: value.on_field.into(),
            queue: value.queue,
            phase: value.phase,
            rules: value.rules.into(),
        }
    }
}

impl From<SnapshotEntity> for StateSnapshot {
    fn from(value: SnapshotEntity) -> Self {
        Self {
            version: value.version,
            teams: roster(value.teams),
            on_field: value.on_field.into(),
            queue: value.queue,
            phase: value.phase,
            rules: value.rules.into(),
        }
    }
}

impl From<SessionEntity> for RotationState {
    fn from(value: SessionEntity) -> Self {
        Self {
            version: value.version,
            teams: roster(value.teams),
            on_field: value.on_field.into(),
            queue: value.queue,
            phase: value.phase,
            rules: value.rules.into(),
            undo: value.undo.into_iter().map(Into::into).collect(),
        }
    }
}

/// Drop sub-millisecond precision so the timestamp survives the blob's
/// millisecond serialization unchanged.
fn millisecond_precision(timestamp: OffsetDateTime) -> OffsetDateTime {
    let nanos = timestamp.nanosecond();
    timestamp
        .replace_nanosecond(nanos - nanos % 1_000_000)
        .unwrap_or(timestamp)
}

/// Rebuild the creation-ordered roster map from its persisted list form.
fn roster(teams: Vec<TeamEntity>) -> IndexMap<Uuid, Team> {
    teams
        .into_iter()
        .map(|team| (team.id, Team::from(team)))
        .collect()
}
