//! Render session registry.
//!
//! Owns the in-memory session table (one `RenderSession` per in-flight or
//! recently finished job) and drives each job off the submission path:
//! plan building, supervised encoding, progress updates, and cleanup of
//! input/output files on every exit path.

mod cleanup;
mod errors;

pub use cleanup::{remove_file_if_exists, remove_files};
pub use errors::{RegistryError, RegistryResult};

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::Settings;
use crate::graph::{build_plan, encoder_args, FPS};
use crate::models::{
    RenderJob, RenderSession, RenderSettings, SessionStatus, StatusReport, MAX_IMAGES, MIN_IMAGES,
};
use crate::supervisor::{EncodeRequest, EncoderSupervisor};

/// Default interval between encoder progress reports, in seconds.
const DEFAULT_STATS_PERIOD: f64 = 0.5;

type SessionTable = Arc<Mutex<HashMap<String, RenderSession>>>;

/// Registry coordinating render sessions.
///
/// Constructed once per process and shared by handle; the session table is
/// the only shared mutable state and is mutex-guarded.
pub struct RenderRegistry {
    sessions: SessionTable,
    supervisor: Arc<EncoderSupervisor>,
    output_dir: PathBuf,
    stats_period: f64,
}

impl RenderRegistry {
    /// Create a registry rendering into `output_dir`.
    pub fn new(supervisor: Arc<EncoderSupervisor>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            supervisor,
            output_dir: output_dir.into(),
            stats_period: DEFAULT_STATS_PERIOD,
        }
    }

    /// Create a registry wired from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let supervisor = Arc::new(EncoderSupervisor::new(&settings.encoder.ffmpeg_path));
        let mut registry = Self::new(supervisor, &settings.paths.output_folder);
        registry.stats_period = settings.encoder.stats_period;
        registry
    }

    /// Number of sessions currently held (any state).
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Output artifact path for a session id.
    fn artifact_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}.mp4"))
    }

    /// Submit a render job.
    ///
    /// Validates the request, creates a session in `Processing`, and kicks
    /// off the encode on a background thread. Returns the session id
    /// immediately; callers observe progress by polling [`status`].
    ///
    /// [`status`]: RenderRegistry::status
    pub fn submit(
        &self,
        image_paths: Vec<PathBuf>,
        settings: RenderSettings,
    ) -> RegistryResult<String> {
        if image_paths.len() < MIN_IMAGES {
            return Err(RegistryError::validation(format!(
                "at least {MIN_IMAGES} images are required (got {})",
                image_paths.len()
            )));
        }
        if image_paths.len() > MAX_IMAGES {
            return Err(RegistryError::validation(format!(
                "at most {MAX_IMAGES} images are allowed (got {})",
                image_paths.len()
            )));
        }

        let id = Uuid::new_v4().to_string();
        fs::create_dir_all(&self.output_dir).map_err(|e| RegistryError::io(&id, e))?;

        let session = RenderSession::new(id.clone(), image_paths.clone());
        self.sessions.lock().insert(id.clone(), session);

        let job = RenderJob {
            session_id: id.clone(),
            image_paths,
            settings,
            output_path: self.artifact_path(&id),
        };
        self.spawn_render(job);

        tracing::info!(session = %id, "render session created");
        Ok(id)
    }

    /// Run one job on a background thread and reflect the outcome into
    /// the session table.
    fn spawn_render(&self, job: RenderJob) {
        let sessions = Arc::clone(&self.sessions);
        let supervisor = Arc::clone(&self.supervisor);
        let stats_period = self.stats_period;

        std::thread::spawn(move || {
            let plan = build_plan(&job.image_paths, &job.settings);
            let args = encoder_args(&plan, &job.output_path, stats_period);

            tracing::info!(
                session = %job.session_id,
                transition = %job.settings.transition,
                expected_duration = plan.expected_duration,
                "starting encode"
            );

            // A cancel between submit and spawn leaves no process to kill;
            // honor it here instead of starting a doomed encode.
            {
                let table = sessions.lock();
                match table.get(&job.session_id) {
                    Some(s) if s.status == SessionStatus::Processing => {}
                    _ => return,
                }
            }

            let request = EncodeRequest {
                session_id: job.session_id.clone(),
                args,
                expected_duration: plan.expected_duration,
                fps: f64::from(FPS),
                output_path: job.output_path.clone(),
            };

            // A cancel can also land between the check above and the
            // supervisor registering the process; the abort predicate is
            // re-evaluated once the handle exists, so that cancel kills
            // the fresh child instead of being lost.
            let abort_sessions = Arc::clone(&sessions);
            let abort_id = job.session_id.clone();
            let should_abort = move || {
                let table = abort_sessions.lock();
                !matches!(
                    table.get(&abort_id),
                    Some(s) if s.status == SessionStatus::Processing
                )
            };

            let progress_sessions = Arc::clone(&sessions);
            let progress_id = job.session_id.clone();
            let result = supervisor.run(&request, should_abort, |pct| {
                let mut table = progress_sessions.lock();
                if let Some(session) = table.get_mut(&progress_id) {
                    if session.status == SessionStatus::Processing {
                        session.progress = pct;
                    }
                }
            });

            match result {
                Ok(output) => Self::mark_completed(&sessions, &job, output),
                Err(e) => Self::mark_failed(&sessions, &job, &e.to_string()),
            }
        });
    }

    fn mark_completed(sessions: &SessionTable, job: &RenderJob, output: PathBuf) {
        let mut table = sessions.lock();
        let Some(session) = table.get_mut(&job.session_id) else {
            // Discarded mid-encode: nothing to record, just clean up.
            drop(table);
            remove_file_if_exists(&output);
            remove_files(&job.image_paths);
            return;
        };
        if session.status != SessionStatus::Processing {
            // Cancelled while the last frames were flushing; the cancel
            // path already cleaned up, but the output may have landed.
            drop(table);
            remove_file_if_exists(&output);
            remove_files(&job.image_paths);
            return;
        }

        session.status = SessionStatus::Completed;
        session.progress = 100.0;
        session.output_path = Some(output);
        let inputs = std::mem::take(&mut session.image_paths);
        drop(table);

        // Inputs are never needed again once the artifact exists.
        remove_files(&inputs);
        tracing::info!(session = %job.session_id, "encode completed");
    }

    fn mark_failed(sessions: &SessionTable, job: &RenderJob, message: &str) {
        let mut table = sessions.lock();
        let Some(session) = table.get_mut(&job.session_id) else {
            drop(table);
            remove_file_if_exists(&job.output_path);
            remove_files(&job.image_paths);
            return;
        };
        if session.status != SessionStatus::Processing {
            // The kill from a cancel surfaces here as a nonzero exit;
            // the session already reflects the cancellation.
            drop(table);
            remove_file_if_exists(&job.output_path);
            remove_files(&job.image_paths);
            return;
        }

        session.status = SessionStatus::Error;
        session.error = Some(message.to_string());
        let inputs = std::mem::take(&mut session.image_paths);
        drop(table);

        remove_file_if_exists(&job.output_path);
        remove_files(&inputs);
        tracing::warn!(session = %job.session_id, "encode failed: {message}");
    }

    /// Current status snapshot for a session.
    pub fn status(&self, id: &str) -> RegistryResult<StatusReport> {
        let table = self.sessions.lock();
        let session = table.get(id).ok_or_else(|| RegistryError::not_found(id))?;
        Ok(StatusReport {
            status: session.status,
            progress: session.progress,
            error: session.error.clone(),
        })
    }

    /// Cancel a processing session.
    ///
    /// Kills the encode (if one is running), transitions the session to
    /// `Cancelled`, and removes the partial output and all input files.
    /// Fails with [`RegistryError::StateConflict`] once the session has
    /// already reached a terminal state.
    pub fn cancel(&self, id: &str) -> RegistryResult<()> {
        let mut table = self.sessions.lock();
        let session = table.get_mut(id).ok_or_else(|| RegistryError::not_found(id))?;
        if session.status != SessionStatus::Processing {
            return Err(RegistryError::state_conflict(
                id,
                session.status.as_str(),
                "processing",
            ));
        }

        // The process may not have spawned yet, or may have exited
        // microseconds ago; either way the session is marked cancelled and
        // the render thread defers to that.
        let killed = self.supervisor.cancel(id);
        session.status = SessionStatus::Cancelled;
        let inputs = std::mem::take(&mut session.image_paths);
        drop(table);

        remove_file_if_exists(&self.artifact_path(id));
        remove_files(&inputs);

        tracing::info!(session = %id, killed, "session cancelled");
        Ok(())
    }

    /// Read the finished artifact and evict the session.
    ///
    /// The artifact is single-use: after a successful read the session is
    /// removed and the file deleted. Callers must persist the bytes
    /// elsewhere.
    pub fn fetch_output(&self, id: &str) -> RegistryResult<Vec<u8>> {
        let path = {
            let table = self.sessions.lock();
            let session = table.get(id).ok_or_else(|| RegistryError::not_found(id))?;
            if session.status != SessionStatus::Completed {
                return Err(RegistryError::NotReady {
                    id: id.to_string(),
                    status: session.status.as_str(),
                });
            }
            session
                .output_path
                .clone()
                .unwrap_or_else(|| self.artifact_path(id))
        };

        // The lock is not held across the read; artifacts can be large and
        // other sessions must keep making progress. `Completed` is
        // terminal, so the snapshot above can only be invalidated by a
        // concurrent discard.
        match fs::read(&path) {
            Ok(bytes) => {
                if self.sessions.lock().remove(id).is_none() {
                    // Discarded while reading; its cleanup already ran.
                    return Err(RegistryError::not_found(id));
                }
                remove_file_if_exists(&path);
                tracing::info!(session = %id, size = bytes.len(), "artifact downloaded and evicted");
                Ok(bytes)
            }
            // Completed but file gone: integrity fault, distinct from
            // "not ready".
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RegistryError::not_found(id))
            }
            Err(e) => Err(RegistryError::io(id, e)),
        }
    }

    /// Force-remove a session and its files, regardless of state.
    ///
    /// Idempotent: discarding an unknown or already-discarded id succeeds
    /// with no side effect.
    pub fn discard(&self, id: &str) {
        // Kill any encode still attached to the session.
        self.supervisor.cancel(id);

        let removed = self.sessions.lock().remove(id);
        match removed {
            Some(session) => {
                let output = session
                    .output_path
                    .unwrap_or_else(|| self.artifact_path(id));
                remove_file_if_exists(&output);
                remove_files(&session.image_paths);
                tracing::info!(session = %id, "session discarded");
            }
            None => {
                // Already gone; still make sure no artifact lingers.
                remove_file_if_exists(&self.artifact_path(id));
            }
        }
    }

    /// Evict terminal sessions older than `ttl`, deleting their files.
    ///
    /// Returns the number of sessions evicted. Sessions still processing
    /// are never touched.
    pub fn evict_stale(&self, ttl: TimeDelta) -> usize {
        let now = Utc::now();
        let mut stale = Vec::new();
        {
            let mut table = self.sessions.lock();
            table.retain(|id, session| {
                let expired = session.status.is_terminal() && now - session.created_at > ttl;
                if expired {
                    stale.push((
                        id.clone(),
                        session.output_path.clone(),
                        session.image_paths.clone(),
                    ));
                }
                !expired
            });
        }

        for (id, output, inputs) in &stale {
            let output = output.clone().unwrap_or_else(|| self.artifact_path(id));
            remove_file_if_exists(&output);
            remove_files(inputs);
            tracing::debug!(session = %id, "stale session evicted");
        }
        stale.len()
    }
}
