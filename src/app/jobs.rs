//! Background API round-trips.
//!
//! The UI loop never blocks on the network: each request is executed on a
//! short-lived thread and its [`JobOutcome`] is sent back over a channel that
//! the loop drains every tick. Nothing here retries or orders requests; reload
//! ordering is handled by [`Snapshot`](super::Snapshot) when outcomes arrive.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::api::{AdminApi, UserId, UserRecord, UserUpdate};
use crate::export;

/// Work submitted by the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Job {
    Reload {
        request_id: u64,
    },
    Update {
        id: UserId,
        username: String,
        update: UserUpdate,
    },
    Delete {
        id: UserId,
        username: String,
    },
    RevealPassword {
        id: UserId,
        username: String,
    },
    DownloadLogs,
}

/// Which mutation an [`JobOutcome::Mutation`] refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Premium { username: String, enabled: bool },
    Dev { username: String, enabled: bool },
    Password { username: String },
    Delete { username: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    Users {
        request_id: u64,
        result: Result<Vec<UserRecord>, String>,
    },
    Mutation {
        kind: MutationKind,
        result: Result<(), String>,
    },
    Password {
        username: String,
        result: Result<String, String>,
    },
    LogsExported {
        result: Result<PathBuf, String>,
    },
}

/// Anything that accepts jobs; the event loop talks to this instead of the
/// concrete worker so key handling can be exercised without threads.
pub trait JobSink {
    fn submit(&self, job: Job);
}

/// Run one job to completion on the calling thread.
pub fn execute(api: &dyn AdminApi, job: Job, export_dir: &Path) -> JobOutcome {
    match job {
        Job::Reload { request_id } => JobOutcome::Users {
            request_id,
            result: api.fetch_users().map_err(|e| e.to_string()),
        },
        Job::Update {
            id,
            username,
            update,
        } => {
            let kind = match &update {
                UserUpdate::Premium(on) => MutationKind::Premium {
                    username,
                    enabled: *on,
                },
                UserUpdate::Dev(on) => MutationKind::Dev {
                    username,
                    enabled: *on,
                },
                UserUpdate::Password(_) => MutationKind::Password { username },
            };
            let result = api
                .update_user(&id, &update)
                .and_then(|r| r.into_result())
                .map_err(|e| e.to_string());
            JobOutcome::Mutation { kind, result }
        }
        Job::Delete { id, username } => JobOutcome::Mutation {
            kind: MutationKind::Delete { username },
            result: api
                .delete_user(&id)
                .and_then(|r| r.into_result())
                .map_err(|e| e.to_string()),
        },
        Job::RevealPassword { id, username } => {
            let result = match api.reveal_password(&id) {
                Ok(r) if r.success => Ok(r.password.unwrap_or_default()),
                Ok(r) => Err(r.error.unwrap_or_else(|| "Unknown error.".to_string())),
                Err(e) => Err(e.to_string()),
            };
            JobOutcome::Password { username, result }
        }
        Job::DownloadLogs => {
            let result = match api.logs_and_stats() {
                Ok(data) if data.success => {
                    let csv = export::generate_csv(&data);
                    export::write_csv(export_dir, &csv).map_err(|e| e.to_string())
                }
                Ok(data) => Err(data
                    .error
                    .unwrap_or_else(|| "Unknown error occurred".to_string())),
                Err(e) => Err(e.to_string()),
            };
            JobOutcome::LogsExported { result }
        }
    }
}

/// Thread-per-request executor reporting back over an mpsc channel.
pub struct Worker {
    api: Arc<dyn AdminApi>,
    export_dir: PathBuf,
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
}

impl Worker {
    pub fn new(api: Arc<dyn AdminApi>, export_dir: PathBuf) -> Self {
        let (tx, rx) = channel();
        Self {
            api,
            export_dir,
            tx,
            rx,
        }
    }

    /// Outcomes that have arrived since the last call, oldest first.
    pub fn drain(&self) -> Vec<JobOutcome> {
        self.rx.try_iter().collect()
    }
}

impl JobSink for Worker {
    fn submit(&self, job: Job) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let dir = self.export_dir.clone();
        tracing::debug!(?job, "submitting job");
        std::thread::spawn(move || {
            let outcome = execute(api.as_ref(), job, &dir);
            // receiver only disappears when the UI is shutting down
            let _ = tx.send(outcome);
        });
    }
}
