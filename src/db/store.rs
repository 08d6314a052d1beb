// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Async facade over [`Database`].
//!
//! The store owns the only connection and hands it to the blocking pool for
//! each call. A mutex keeps one operation group (attach, query, upload) in
//! flight at a time.
//!
//! With a remote replica configured, the local file is a cache of an S3
//! object. Before each operation the store checks the object's ETag and
//! downloads a newer copy. After each write it uploads the file. A marker file
//! next to the database records an upload that has not completed, so a later
//! operation (or a later process) retries it before reading stale data.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::config::{Config, RemoteDb};
use crate::db::{ConnectOptions, DateRange, Database};
use crate::error::AppError;
use crate::models::{ActivityStats, Pushup, Run, RunReport};
use crate::services::s3::{GetObject, S3Client};
use crate::time_utils::now_local;

struct RemoteReplica {
    client: S3Client,
    location: RemoteDb,
}

#[derive(Default)]
struct Slot {
    db: Option<Database>,
    closed: bool,
    /// ETag of the remote object the local file matches.
    etag: Option<String>,
}

/// Shared handle to the fitness database.
pub struct Store {
    local_path: PathBuf,
    options: ConnectOptions,
    remote: Option<RemoteReplica>,
    slot: Mutex<Slot>,
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Internal(anyhow::anyhow!("database task failed: {}", e))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Run a blocking database call with the connection taken out of the slot.
async fn run_blocking<T, F>(
    slot: &mut Slot,
    operation: &'static str,
    f: F,
) -> Result<T, AppError>
where
    F: FnOnce(&mut Database) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let mut db = slot
        .db
        .take()
        .ok_or_else(|| AppError::storage(operation, "database is not connected"))?;

    let (db, result) = tokio::task::spawn_blocking(move || {
        let result = f(&mut db);
        (db, result)
    })
    .await
    .map_err(join_error)?;

    slot.db = Some(db);
    result
}

impl Store {
    /// Open the store described by `config`.
    ///
    /// For a remote store the replica is attached immediately so that
    /// configuration or credential problems surface at startup.
    pub async fn open(config: &Config, options: ConnectOptions) -> Result<Self, AppError> {
        let remote = match &config.remote_db {
            Some(location) => Some(RemoteReplica {
                client: S3Client::from_config(config)?,
                location: location.clone(),
            }),
            None => None,
        };

        let store = Self {
            local_path: config.db_path.clone(),
            options,
            remote,
            slot: Mutex::new(Slot::default()),
        };

        {
            let mut slot = store.slot.lock().await;
            store.attach(&mut slot).await?;
        }

        Ok(store)
    }

    /// Where the data lives, for display.
    pub fn location(&self) -> String {
        match &self.remote {
            Some(remote) => remote.location.uri(),
            None => self.local_path.display().to_string(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn pending_marker(&self) -> PathBuf {
        sibling(&self.local_path, ".pending-sync")
    }

    async fn open_database(&self) -> Result<Database, AppError> {
        let path = self.local_path.clone();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || Database::open(&path, &options))
            .await
            .map_err(join_error)?
    }

    /// Make the local connection current before an operation.
    async fn attach(&self, slot: &mut Slot) -> Result<(), AppError> {
        if slot.closed {
            return Err(AppError::storage("attach", "store is closed"));
        }

        let Some(remote) = &self.remote else {
            if slot.db.is_none() {
                slot.db = Some(self.open_database().await?);
            }
            return Ok(());
        };

        if tokio::fs::try_exists(self.pending_marker())
            .await
            .unwrap_or(false)
        {
            tracing::warn!(
                remote = %remote.location.uri(),
                "Local replica has writes that were not uploaded, syncing first"
            );
            if slot.db.is_none() {
                slot.db = Some(self.open_database().await?);
            }
            run_blocking(slot, "sync", |db| db.checkpoint()).await?;
            return self.upload(slot, remote).await;
        }

        let outcome = remote
            .client
            .get_object(
                &remote.location.bucket,
                &remote.location.key,
                slot.etag.as_deref(),
            )
            .await?;

        match outcome {
            GetObject::NotModified => {
                tracing::debug!(remote = %remote.location.uri(), "Remote database unchanged");
                if slot.db.is_none() {
                    slot.db = Some(self.open_database().await?);
                }
            }
            GetObject::NotFound => {
                // An open replica with no ETag was never uploaded; keep it.
                if slot.db.is_none() || slot.etag.is_some() {
                    tracing::info!(
                        remote = %remote.location.uri(),
                        "Remote database not found, starting an empty replica"
                    );
                    self.replace_local(slot, None).await?;
                }
                slot.etag = None;
            }
            GetObject::Found { body, etag } => {
                tracing::info!(
                    remote = %remote.location.uri(),
                    bytes = body.len(),
                    "Downloaded remote database"
                );
                self.replace_local(slot, Some(body)).await?;
                slot.etag = etag;
            }
        }
        Ok(())
    }

    /// Swap the local file for `body` (or nothing) and reconnect.
    async fn replace_local(&self, slot: &mut Slot, body: Option<Vec<u8>>) -> Result<(), AppError> {
        if let Some(db) = slot.db.take() {
            tokio::task::spawn_blocking(move || db.close())
                .await
                .map_err(join_error)?;
        }

        if let Some(parent) = self.local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage("attach", e))?;
        }

        remove_if_exists(&sibling(&self.local_path, ".wal")).await?;
        match body {
            Some(bytes) => tokio::fs::write(&self.local_path, bytes)
                .await
                .map_err(|e| AppError::storage("attach", e))?,
            None => remove_if_exists(&self.local_path).await?,
        }

        slot.db = Some(self.open_database().await?);
        Ok(())
    }

    /// Record that the local replica may hold writes the remote lacks.
    async fn mark_pending(&self) -> Result<PathBuf, AppError> {
        let marker = self.pending_marker();
        tokio::fs::write(&marker, now_local().to_string())
            .await
            .map_err(|e| AppError::storage("sync", e))?;
        Ok(marker)
    }

    /// Upload the local file. The marker is removed only once the PUT
    /// succeeds.
    async fn upload(&self, slot: &mut Slot, remote: &RemoteReplica) -> Result<(), AppError> {
        let marker = self.mark_pending().await?;

        let body = tokio::fs::read(&self.local_path)
            .await
            .map_err(|e| AppError::storage("sync", e))?;
        let bytes = body.len();

        let etag = remote
            .client
            .put_object(&remote.location.bucket, &remote.location.key, body)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    remote = %remote.location.uri(),
                    error = %e,
                    "Upload failed, will retry on next operation"
                );
            })?;

        remove_if_exists(&marker).await?;
        slot.etag = etag;
        tracing::info!(remote = %remote.location.uri(), bytes, "Uploaded database");
        Ok(())
    }

    async fn read<T, F>(&self, operation: &'static str, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Database) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let mut slot = self.slot.lock().await;
        self.attach(&mut slot).await?;
        run_blocking(&mut slot, operation, f).await
    }

    async fn write<T, F>(&self, operation: &'static str, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Database) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let mut slot = self.slot.lock().await;
        self.attach(&mut slot).await?;

        let Some(remote) = &self.remote else {
            return run_blocking(&mut slot, operation, f).await;
        };

        // The marker goes down before the commit so a crash between the
        // commit and the upload never leaves an unmarked replica.
        let marker = self.mark_pending().await?;
        let committed = run_blocking(&mut slot, operation, move |db| Ok(f(db))).await?;
        let value = match committed {
            Ok(value) => value,
            Err(e) => {
                // The operation rolled back; the replica still matches the remote.
                remove_if_exists(&marker).await?;
                return Err(e);
            }
        };

        run_blocking(&mut slot, "sync", |db| db.checkpoint()).await?;
        self.upload(&mut slot, remote).await?;
        Ok(value)
    }

    pub async fn get_runs(
        &self,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Run>, AppError> {
        self.read("get_runs", move |db| db.get_runs(&range, limit))
            .await
    }

    pub async fn get_run(&self, activity_id: i64) -> Result<Option<Run>, AppError> {
        self.read("get_run", move |db| db.get_run(activity_id)).await
    }

    pub async fn create_run(&self, run: Run) -> Result<Run, AppError> {
        self.write("create_run", move |db| db.create_run(run)).await
    }

    /// Upsert a batch of runs in one operation group (one upload).
    pub async fn upsert_runs(&self, runs: Vec<Run>) -> Result<usize, AppError> {
        self.write("upsert_runs", move |db| db.upsert_runs(runs).map(|runs| runs.len()))
            .await
    }

    pub async fn get_pushups(
        &self,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Pushup>, AppError> {
        self.read("get_pushups", move |db| db.get_pushups(&range, limit))
            .await
    }

    pub async fn create_pushup(&self, pushup: Pushup) -> Result<Pushup, AppError> {
        self.write("create_pushup", move |db| db.create_pushup(pushup))
            .await
    }

    pub async fn get_stats(&self, days: u32) -> Result<ActivityStats, AppError> {
        let now = now_local();
        self.read("get_stats", move |db| db.get_stats(days, now))
            .await
    }

    pub async fn get_report(&self, days: u32) -> Result<RunReport, AppError> {
        let now = now_local();
        self.read("get_report", move |db| db.get_report(days, now))
            .await
    }

    /// Drop and recreate all tables.
    pub async fn reset(&self) -> Result<(), AppError> {
        self.write("reset", |db| db.reset()).await
    }

    /// Release the connection. Safe to call more than once.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return;
        }
        slot.closed = true;

        if let Some(db) = slot.db.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || db.close()).await {
                tracing::warn!(error = %e, "Failed to close database");
            }
        }
        tracing::info!(location = %self.location(), "Store closed");
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), AppError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::storage("sync", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("data/fitlog.db");
        assert_eq!(sibling(path, ".wal"), PathBuf::from("data/fitlog.db.wal"));
        assert_eq!(
            sibling(path, ".pending-sync"),
            PathBuf::from("data/fitlog.db.pending-sync")
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("fitlog.db"),
            ..Default::default()
        };
        let store = Store::open(&config, ConnectOptions::default())
            .await
            .unwrap();
        assert!(!store.is_remote());

        store.close().await;
        store.close().await;

        let err = store.get_runs(DateRange::all(), None).await.unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable { .. }));
    }
}
