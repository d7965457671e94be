//! Core data types: render settings, jobs and session records.

mod session;
mod settings;

pub use session::{
    RenderJob, RenderSession, SessionStatus, StatusReport, MAX_IMAGES, MIN_IMAGES,
};
pub use settings::{ImageDuration, RenderSettings, Resolution, SettingsError, Transition};
