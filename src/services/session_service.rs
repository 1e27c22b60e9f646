use std::collections::HashMap;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::{AppConfig, NO_COLOR},
    dao::models::SessionEntity,
    dto::session::{CreateSessionRequest, SessionView, TransitionReport},
    error::ServiceError,
    state::{
        SharedState,
        reducer::{self, SessionEvent},
        session::{RotationState, SessionSetup},
    },
};

/// Bootstrap a fresh session from the setup form input and make it current.
///
/// The new state is installed in memory first and then persisted; a failed
/// write leaves the in-memory session authoritative and is reported through
/// [`TransitionReport::persisted`].
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<TransitionReport, ServiceError> {
    let setup = build_setup(state.config(), request)?;
    let session = RotationState::create(setup);

    {
        let mut slot = state.session().write().await;
        *slot = Some(session.clone());
    }

    info!(teams = session.teams.len(), "created new rotation session");
    let persisted = persist(state, &session).await;

    Ok(TransitionReport {
        session: project(&session)?,
        rejected: None,
        persisted,
    })
}

/// Load the persisted session, if a valid and fresh one exists, and make it
/// current.
///
/// `Ok(None)` is the defined empty state: stale or missing records route the
/// caller back to session creation.
pub async fn resume_session(state: &SharedState) -> Result<Option<SessionView>, ServiceError> {
    let Some(entity) = state.store().load().await? else {
        let mut slot = state.session().write().await;
        *slot = None;
        return Ok(None);
    };

    let session = RotationState::from(entity);
    let view = project(&session)?;

    let mut slot = state.session().write().await;
    *slot = Some(session);
    // The session came straight from the store, so it is durably saved.
    state.set_persisted(true);

    Ok(Some(view))
}

/// Render-ready view of the live session, if any.
pub async fn current_session(state: &SharedState) -> Option<SessionView> {
    let guard = state.session().read().await;
    guard.as_ref().and_then(SessionView::project)
}

/// Declare `winner_team_id` the winner of the current match.
pub async fn declare_winner(
    state: &SharedState,
    winner_team_id: Uuid,
) -> Result<TransitionReport, ServiceError> {
    apply(state, SessionEvent::DeclareWinner { winner_team_id }).await
}

/// Declare the current match a tie.
pub async fn declare_tie(state: &SharedState) -> Result<TransitionReport, ServiceError> {
    apply(state, SessionEvent::DeclareTie).await
}

/// Revert the most recent transition, if any snapshot is available.
pub async fn undo(state: &SharedState) -> Result<TransitionReport, ServiceError> {
    apply(state, SessionEvent::Undo).await
}

/// End the session: drop the in-memory state, then clear the store.
pub async fn end_session(state: &SharedState) -> Result<(), ServiceError> {
    {
        let mut slot = state.session().write().await;
        *slot = None;
    }
    state.store().clear().await?;
    state.set_persisted(true);
    info!("session cleared");
    Ok(())
}

/// Run one event through the reducer and persist the result.
///
/// A rejected transition is a diagnostic, not a fault: the session stays as
/// it was and the reason travels in the report.
async fn apply(state: &SharedState, event: SessionEvent) -> Result<TransitionReport, ServiceError> {
    let mut slot = state.session().write().await;
    let Some(current) = slot.as_ref() else {
        return Err(ServiceError::NoSession);
    };

    match reducer::apply_event(current, &event) {
        Ok(next) => {
            *slot = Some(next.clone());
            drop(slot);

            let persisted = persist(state, &next).await;
            Ok(TransitionReport {
                session: project(&next)?,
                rejected: None,
                persisted,
            })
        }
        Err(rejection) => {
            // Nothing new to write; report whether the last save went through.
            let report = TransitionReport {
                session: project(current)?,
                rejected: Some(rejection),
                persisted: state.is_persisted(),
            };
            drop(slot);

            warn!(%rejection, "transition rejected");
            Ok(report)
        }
    }
}

/// Persist `session`, keeping the in-memory state authoritative on failure.
/// The outcome is remembered on the shared state for later reports.
async fn persist(state: &SharedState, session: &RotationState) -> bool {
    let saved = match state.store().save(SessionEntity::snapshot(session)).await {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "failed to persist session; in-memory state remains authoritative");
            false
        }
    };
    state.set_persisted(saved);
    saved
}

fn project(session: &RotationState) -> Result<SessionView, ServiceError> {
    SessionView::project(session).ok_or_else(|| {
        ServiceError::InvalidState("session references a team missing from its roster".into())
    })
}

/// Validate the setup form input at the boundary and turn it into factory
/// parameters.
fn build_setup(
    config: &AppConfig,
    request: CreateSessionRequest,
) -> Result<SessionSetup, ServiceError> {
    let CreateSessionRequest {
        team_count,
        goal_cap,
        team_colors,
    } = request;

    if team_count < 2 {
        return Err(ServiceError::InvalidInput(
            "a session requires at least two teams".into(),
        ));
    }

    let mut colors = HashMap::with_capacity(team_colors.len());
    for (index, raw) in team_colors {
        if index >= team_count {
            return Err(ServiceError::InvalidInput(format!(
                "color assigned to unknown team index {index}"
            )));
        }
        colors.insert(index, normalize_color(config, &raw)?);
    }

    Ok(SessionSetup {
        team_count,
        goal_cap,
        team_colors: colors,
    })
}

/// Map a raw form choice to a palette tag; empty and "no-color" mean no
/// color.
fn normalize_color(config: &AppConfig, raw: &str) -> Result<Option<String>, ServiceError> {
    let tag = raw.trim().to_lowercase().replace(' ', "-");
    if tag.is_empty() || tag == NO_COLOR {
        return Ok(None);
    }
    if !config.contains(&tag) {
        return Err(ServiceError::InvalidInput(format!(
            "unknown team color `{raw}`"
        )));
    }
    Ok(Some(tag))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{
            session_store::{SessionStore, file::FileSessionStore},
            storage::{StorageError, StorageResult},
        },
        state::AppState,
    };

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("nexturno-service-{}", Uuid::new_v4()))
    }

    fn shared_with_store(store: Arc<dyn SessionStore>) -> SharedState {
        AppState::new(AppConfig::default(), store)
    }

    fn shared(dir: &std::path::Path) -> SharedState {
        shared_with_store(Arc::new(FileSessionStore::new(dir)))
    }

    fn request(team_count: usize) -> CreateSessionRequest {
        CreateSessionRequest {
            team_count,
            goal_cap: None,
            team_colors: HashMap::new(),
        }
    }

    /// Store whose writes always fail, for exercising the degraded path.
    struct FailingStore;

    impl SessionStore for FailingStore {
        fn load(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
            Box::pin(async { Ok(None) })
        }

        fn save(&self, _entity: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "disk full".into(),
                    std::io::Error::other("disk full"),
                ))
            })
        }

        fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn create_session_rejects_fewer_than_two_teams() {
        let state = shared(&temp_dir());
        let err = create_session(&state, request(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_session_rejects_unknown_colors() {
        let state = shared(&temp_dir());
        let mut req = request(3);
        req.team_colors.insert(0, "mauve".into());

        let err = create_session(&state, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_session_normalizes_color_choices() {
        let state = shared(&temp_dir());
        let mut req = request(3);
        req.team_colors.insert(0, "Red".into());
        req.team_colors.insert(1, "no-color".into());

        let report = create_session(&state, req).await.unwrap();

        assert!(report.persisted);
        assert_eq!(report.session.on_field.a.color.as_deref(), Some("red"));
        assert_eq!(report.session.on_field.b.color, None);
    }

    #[tokio::test]
    async fn created_session_can_be_resumed_from_the_store() {
        let dir = temp_dir();
        let report = {
            let state = shared(&dir);
            create_session(&state, request(4)).await.unwrap()
        };

        // Fresh state over the same directory, as after a reload.
        let state = shared(&dir);
        let resumed = resume_session(&state).await.unwrap();

        assert_eq!(resumed, Some(report.session));
    }

    #[tokio::test]
    async fn resume_without_a_record_is_the_empty_state() {
        let state = shared(&temp_dir());
        assert_eq!(resume_session(&state).await.unwrap(), None);
        assert!(current_session(&state).await.is_none());
    }

    #[tokio::test]
    async fn declare_winner_rotates_and_persists() {
        let dir = temp_dir();
        let state = shared(&dir);
        let created = create_session(&state, request(4)).await.unwrap();
        let winner = created.session.on_field.a.id;
        let incoming = created.session.queue[0].id;

        let report = declare_winner(&state, winner).await.unwrap();

        assert!(report.rejected.is_none());
        assert!(report.persisted);
        assert_eq!(report.session.on_field.a.id, winner);
        assert_eq!(report.session.on_field.b.id, incoming);
        assert_eq!(report.session.undo_depth, 1);

        // The persisted record reflects the transition.
        let reloaded = resume_session(&state).await.unwrap().unwrap();
        assert_eq!(reloaded, report.session);
    }

    #[tokio::test]
    async fn rejected_winner_is_reported_and_leaves_the_session_usable() {
        let state = shared(&temp_dir());
        let created = create_session(&state, request(4)).await.unwrap();
        let queued = created.session.queue[0].id;

        let report = declare_winner(&state, queued).await.unwrap();

        assert!(report.rejected.is_some());
        assert_eq!(report.session, created.session);

        // A valid event still goes through afterwards.
        let winner = created.session.on_field.a.id;
        let next = declare_winner(&state, winner).await.unwrap();
        assert!(next.rejected.is_none());
    }

    #[tokio::test]
    async fn tie_with_short_queue_is_reported_not_failed() {
        let state = shared(&temp_dir());
        let created = create_session(&state, request(3)).await.unwrap();

        let report = declare_tie(&state).await.unwrap();

        assert!(report.rejected.is_some());
        assert_eq!(report.session, created.session);
    }

    #[tokio::test]
    async fn undo_restores_the_previous_view() {
        let state = shared(&temp_dir());
        let created = create_session(&state, request(4)).await.unwrap();
        let winner = created.session.on_field.a.id;
        declare_winner(&state, winner).await.unwrap();

        let report = undo(&state).await.unwrap();

        assert!(report.rejected.is_none());
        assert_eq!(report.session, created.session);
    }

    #[tokio::test]
    async fn events_without_a_session_are_an_error() {
        let state = shared(&temp_dir());
        let err = declare_tie(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoSession));
    }

    #[tokio::test]
    async fn end_session_clears_memory_and_store() {
        let state = shared(&temp_dir());
        create_session(&state, request(4)).await.unwrap();

        end_session(&state).await.unwrap();

        assert!(current_session(&state).await.is_none());
        assert_eq!(resume_session(&state).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejection_report_carries_the_last_known_persistence_status() {
        let state = shared_with_store(Arc::new(FailingStore));
        let created = create_session(&state, request(4)).await.unwrap();
        assert!(!created.persisted);

        // A rejected event writes nothing, so the report must not claim the
        // unsaved state is durable.
        let queued = created.session.queue[0].id;
        let report = declare_winner(&state, queued).await.unwrap();

        assert!(report.rejected.is_some());
        assert!(!report.persisted);
    }

    #[tokio::test]
    async fn save_failure_keeps_the_in_memory_state_authoritative() {
        let state = shared_with_store(Arc::new(FailingStore));
        let created = create_session(&state, request(4)).await.unwrap();
        assert!(!created.persisted);

        let winner = created.session.on_field.a.id;
        let report = declare_winner(&state, winner).await.unwrap();

        assert!(report.rejected.is_none());
        assert!(!report.persisted);
        // The transition still took effect in memory.
        let current = current_session(&state).await.unwrap();
        assert_eq!(current, report.session);
    }
}
