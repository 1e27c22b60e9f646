/// Invariant checks guarding the rotation data model.
pub mod invariants;
/// Pure event reducer driving the rotation.
pub mod reducer;
/// Rotation state types and the session factory.
pub mod session;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::RwLock;

use crate::{config::AppConfig, dao::session_store::SessionStore, state::session::RotationState};

pub use self::invariants::InvariantViolation;
pub use self::reducer::{RejectedTransition, SessionEvent};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the configuration, the injected session
/// store, and the live session.
///
/// There is exactly one logical mutator at a time (the user on this device);
/// the lock only serializes overlapping service calls.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<RotationState>>,
    persisted: AtomicBool,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> SharedState {
        Arc::new(Self {
            config,
            store,
            session: RwLock::new(None),
            persisted: AtomicBool::new(true),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the injected session store.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// The currently active session, if any.
    pub fn session(&self) -> &RwLock<Option<RotationState>> {
        &self.session
    }

    /// Whether the live session's latest state is known to be durably saved.
    pub fn is_persisted(&self) -> bool {
        self.persisted.load(Ordering::Relaxed)
    }

    /// Record the outcome of the most recent save or clear.
    pub fn set_persisted(&self, value: bool) {
        self.persisted.store(value, Ordering::Relaxed);
    }
}
