use std::{io::ErrorKind, path::PathBuf};

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::fs;
use tracing::{info, warn};

use crate::{
    dao::{
        models::SessionEntity,
        session_store::{SESSION_TTL, SessionStore},
        storage::{StorageError, StorageResult},
    },
    state::{
        invariants::{self, InvariantViolation},
        session::RotationState,
    },
};

/// File name of the primary session record.
const PRIMARY_FILE: &str = "nexturno_session_primary.json";
/// File name of the backup copy written alongside the primary.
const BACKUP_FILE: &str = "nexturno_session_backup.json";

/// Session store backed by a pair of JSON files in a local directory.
///
/// Every save mirrors the record into a backup file; loads fall back to the
/// backup when the primary is unreadable or invalid. This is a durability
/// hedge against partial writes on a medium that can fail mid-save, not a
/// format the rest of the crate knows about.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
    primary: PathBuf,
    backup: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`; the directory is created lazily on the
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let root = dir.into();
        let primary = root.join(PRIMARY_FILE);
        let backup = root.join(BACKUP_FILE);
        Self {
            root,
            primary,
            backup,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let primary = self.primary.clone();
        let backup = self.backup.clone();
        Box::pin(async move {
            if let Some(entity) = load_and_validate(&primary).await {
                return Ok(Some(entity));
            }
            Ok(load_and_validate(&backup).await)
        })
    }

    fn save(&self, entity: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let root = self.root.clone();
        let primary = self.primary.clone();
        let backup = self.backup.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec_pretty(&entity).map_err(|err| {
                StorageError::unavailable("failed to encode session record".into(), err)
            })?;

            fs::create_dir_all(&root).await.map_err(|err| {
                StorageError::unavailable(
                    format!("failed to create session directory {}", root.display()),
                    err,
                )
            })?;

            fs::write(&primary, &payload).await.map_err(|err| {
                StorageError::unavailable(
                    format!("failed to write {}", primary.display()),
                    err,
                )
            })?;

            // The backup is best effort; the primary write already succeeded.
            if let Err(err) = fs::write(&backup, &payload).await {
                warn!(
                    path = %backup.display(),
                    error = %err,
                    "failed to mirror session record to backup"
                );
            }

            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let primary = self.primary.clone();
        let backup = self.backup.clone();
        Box::pin(async move {
            for path in [primary, backup] {
                match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => {
                        return Err(StorageError::unavailable(
                            format!("failed to remove {}", path.display()),
                            err,
                        ));
                    }
                }
            }
            Ok(())
        })
    }
}

/// Read one record file, discarding it when it is unparsable, inconsistent,
/// or past the retention window.
async fn load_and_validate(path: &PathBuf) -> Option<SessionEntity> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read session record");
            return None;
        }
    };

    let entity: SessionEntity = match serde_json::from_slice(&raw) {
        Ok(entity) => entity,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "discarding unparsable session record");
            remove_quietly(path).await;
            return None;
        }
    };

    // A 2-team session is structurally sound and accepted at setup; it only
    // cannot rotate, which the reducer already refuses on its own.
    match invariants::check(&RotationState::from(entity.clone())) {
        Ok(()) | Err(InvariantViolation::TooFewTeams { .. }) => {}
        Err(violation) => {
            warn!(
                path = %path.display(),
                %violation,
                "discarding inconsistent session record"
            );
            remove_quietly(path).await;
            return None;
        }
    }

    if entity.age(OffsetDateTime::now_utc()) > SESSION_TTL {
        info!(path = %path.display(), "discarding expired session record");
        remove_quietly(path).await;
        return None;
    }

    Some(entity)
}

async fn remove_quietly(path: &PathBuf) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove session record");
        }
    }
}
