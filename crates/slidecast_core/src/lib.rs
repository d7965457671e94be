//! Slidecast Core - slideshow render orchestration
//!
//! This crate turns an ordered set of images into a video by driving an
//! external ffmpeg process. It contains all business logic with zero UI
//! dependencies and can be embedded in a web service or a CLI tool.

pub mod config;
pub mod graph;
pub mod logging;
pub mod models;
pub mod progress;
pub mod registry;
pub mod supervisor;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
