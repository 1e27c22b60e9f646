pub mod file;

use futures::future::BoxFuture;
use time::Duration;

use crate::dao::{models::SessionEntity, storage::StorageResult};

/// Retention window after which a persisted session is treated as absent.
pub const SESSION_TTL: Duration = Duration::hours(24);

/// Abstraction over durable storage for the single rotation session.
///
/// Implementations own the staleness rule: `load` must never hand back a
/// record older than [`SESSION_TTL`], discarding it eagerly instead.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, or `None` when nothing valid and fresh
    /// enough exists.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Durably write the session.
    fn save(&self, entity: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove any persisted session data.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
}
