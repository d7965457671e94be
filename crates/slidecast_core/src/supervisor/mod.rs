//! Encode process supervision.
//!
//! Spawns one encoder process per render job, streams its stderr through
//! the progress estimator, and keeps a handle table keyed by session id so
//! a running encode can be cancelled. The table entry is removed on every
//! exit path (success, failure, cancellation) via a drop guard, and the
//! child is always killed and reaped before an error is surfaced.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::progress::ProgressTracker;

/// Trailing stderr characters retained for error reporting.
const STDERR_TAIL: usize = 500;

/// Errors from running the encoder process.
#[derive(Error, Debug)]
pub enum EncoderError {
    /// The encoder binary could not be started.
    #[error("failed to spawn encoder '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited with a nonzero status (or was killed).
    #[error("encoder exited with code {exit_code}: {tail}")]
    Exit { exit_code: i32, tail: String },

    /// The encode was cancelled before it could produce a result.
    #[error("encode aborted by cancellation")]
    Aborted,

    /// I/O failure while reading the encoder's diagnostic stream.
    #[error("I/O error while supervising encoder: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for supervisor operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Parameters for one supervised encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub session_id: String,
    /// Full encoder argument list, as produced by the graph serializer.
    pub args: Vec<String>,
    /// Expected output length in seconds (progress denominator).
    pub expected_duration: f64,
    pub fps: f64,
    pub output_path: PathBuf,
}

type HandleTable = Mutex<HashMap<String, Arc<Mutex<Child>>>>;

/// Supervises encoder subprocesses, one per active session.
pub struct EncoderSupervisor {
    encoder_path: PathBuf,
    active: HandleTable,
}

impl EncoderSupervisor {
    /// Create a supervisor for the given encoder binary.
    pub fn new(encoder_path: impl Into<PathBuf>) -> Self {
        Self {
            encoder_path: encoder_path.into(),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the encoder binary this supervisor spawns.
    pub fn encoder_path(&self) -> &std::path::Path {
        &self.encoder_path
    }

    /// Number of currently running encodes.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Run one encode to completion, forwarding strictly increasing
    /// progress percentages to `on_progress`.
    ///
    /// `should_abort` is evaluated once, right after the process handle is
    /// registered: a cancel issued before registration finds no process to
    /// kill, so the caller's cancellation state must be re-checked here.
    ///
    /// Blocks until the process exits. Resolves with the output path on a
    /// zero exit; a nonzero exit carries the exit code and the trailing
    /// stderr text. No child outlives an error return.
    pub fn run(
        &self,
        request: &EncodeRequest,
        should_abort: impl Fn() -> bool,
        mut on_progress: impl FnMut(f64),
    ) -> EncoderResult<PathBuf> {
        let mut child = Command::new(&self.encoder_path)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EncoderError::Spawn {
                binary: self.encoder_path.display().to_string(),
                source,
            })?;

        // stderr is read outside the handle mutex so cancel() can kill the
        // process while the read loop is blocked on it.
        let stderr = child.stderr.take();
        let handle = Arc::new(Mutex::new(child));
        let _guard = ActiveGuard::insert(&self.active, &request.session_id, Arc::clone(&handle));

        if should_abort() {
            reap(&handle);
            tracing::info!(session = %request.session_id, "encode aborted before start");
            return Err(EncoderError::Aborted);
        }

        tracing::debug!(
            session = %request.session_id,
            encoder = %self.encoder_path.display(),
            "encoder spawned"
        );

        let mut tracker = ProgressTracker::new(request.expected_duration, request.fps);
        let mut tail = String::new();

        if let Some(mut stderr) = stderr {
            let mut pending = String::new();
            let mut undecoded = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = match stderr.read(&mut buf) {
                    Ok(n) => n,
                    // The child may still be encoding; it must not keep
                    // running detached from the handle table.
                    Err(e) => {
                        reap(&handle);
                        return Err(EncoderError::Io(e));
                    }
                };
                if n == 0 {
                    break;
                }
                let chunk = decode_utf8_stream(&mut undecoded, &buf[..n]);
                push_tail(&mut tail, &chunk);
                pending.push_str(&chunk);

                // Progress lines end with \r, other diagnostics with \n.
                while let Some(pos) = pending.find(['\n', '\r']) {
                    let line: String = pending.drain(..=pos).collect();
                    if let Some(pct) = tracker.observe(line.trim_end()) {
                        on_progress(pct);
                    }
                }
            }
            if !undecoded.is_empty() {
                let rest = String::from_utf8_lossy(&undecoded).into_owned();
                push_tail(&mut tail, &rest);
                pending.push_str(&rest);
            }
            if let Some(pct) = tracker.observe(pending.trim_end()) {
                on_progress(pct);
            }
        }

        let status = handle.lock().wait()?;
        match status.code() {
            Some(0) => Ok(request.output_path.clone()),
            code => Err(EncoderError::Exit {
                exit_code: code.unwrap_or(-1),
                tail,
            }),
        }
    }

    /// Forcefully terminate the encode for a session.
    ///
    /// Returns `false` if the session has no running process (already
    /// finished, not yet registered, or unknown). Racing a cancel against
    /// natural completion is expected and never an error.
    pub fn cancel(&self, session_id: &str) -> bool {
        let handle = self.active.lock().remove(session_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.lock().kill() {
                    // Process exited between the table lookup and the kill.
                    tracing::debug!(session = %session_id, "kill after exit: {e}");
                }
                tracing::info!(session = %session_id, "encode cancelled");
                true
            }
            None => false,
        }
    }
}

/// Removes a session's handle table entry when dropped.
struct ActiveGuard<'a> {
    table: &'a HandleTable,
    session_id: String,
}

impl<'a> ActiveGuard<'a> {
    fn insert(table: &'a HandleTable, session_id: &str, handle: Arc<Mutex<Child>>) -> Self {
        table.lock().insert(session_id.to_string(), handle);
        Self {
            table,
            session_id: session_id.to_string(),
        }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().remove(&self.session_id);
    }
}

/// Kill a child and wait for it, so the process neither keeps encoding
/// nor lingers as a zombie.
fn reap(handle: &Mutex<Child>) {
    let mut child = handle.lock();
    if let Err(e) = child.kill() {
        tracing::debug!("kill after exit: {e}");
    }
    if let Err(e) = child.wait() {
        tracing::warn!("failed to reap encoder: {e}");
    }
}

/// Decode a byte chunk, carrying incomplete trailing UTF-8 sequences over
/// to the next chunk in `undecoded`. Invalid bytes become U+FFFD.
fn decode_utf8_stream(undecoded: &mut Vec<u8>, chunk: &[u8]) -> String {
    undecoded.extend_from_slice(chunk);
    let mut out = String::new();
    loop {
        match std::str::from_utf8(undecoded) {
            Ok(s) => {
                out.push_str(s);
                undecoded.clear();
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&undecoded[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        out.push('\u{FFFD}');
                        undecoded.drain(..valid + bad);
                    }
                    // Incomplete sequence at the end of the chunk.
                    None => {
                        undecoded.drain(..valid);
                        break;
                    }
                }
            }
        }
    }
    out
}

/// Append a chunk to the tail buffer, keeping only the last
/// [`STDERR_TAIL`] characters.
fn push_tail(tail: &mut String, chunk: &str) {
    tail.push_str(chunk);
    if tail.len() > STDERR_TAIL {
        let mut cut = tail.len() - STDERR_TAIL;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}
