//! Render job and session lifecycle records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::RenderSettings;

/// Minimum number of input images per job.
pub const MIN_IMAGES: usize = 3;
/// Maximum number of input images per job.
pub const MAX_IMAGES: usize = 5;

/// A single rendering request.
///
/// Created at submission time, immutable thereafter, and consumed exactly
/// once by the supervisor invocation that runs it. Image order is playback
/// order.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub session_id: String,
    pub image_paths: Vec<PathBuf>,
    pub settings: RenderSettings,
    pub output_path: PathBuf,
}

/// Lifecycle state of a render session.
///
/// `Processing` is the only non-terminal state; no session re-enters it
/// after leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl SessionStatus {
    /// Whether the session can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Wire/display string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable lifecycle record owned by the registry.
#[derive(Debug, Clone)]
pub struct RenderSession {
    /// Opaque unique session token.
    pub id: String,
    pub status: SessionStatus,
    /// 0-100, monotonically non-decreasing while `Processing`.
    pub progress: f64,
    /// Input file paths, kept for cleanup; emptied once deleted.
    pub image_paths: Vec<PathBuf>,
    /// Set only once the session reaches `Completed`.
    pub output_path: Option<PathBuf>,
    /// Set only on `Error`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RenderSession {
    /// Create a new session in `Processing` with zero progress.
    pub fn new(id: impl Into<String>, image_paths: Vec<PathBuf>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Processing,
            progress: 0.0,
            image_paths,
            output_path: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Status snapshot surfaced to callers polling a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
