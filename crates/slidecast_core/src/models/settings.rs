//! Render settings value types.
//!
//! Every field is validated at construction (or deserialization) time, so a
//! `RenderSettings` that exists is always inside its enumerated domain. The
//! graph builder relies on this and never re-validates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for settings values outside their enumerated domains.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("image duration must be 2, 3, 4 or 5 seconds (got {0})")]
    ImageDuration(u32),
}

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    /// Pixel dimensions of the output canvas.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd720 => (1280, 720),
            Resolution::Hd1080 => (1920, 1080),
        }
    }

    /// Get all available resolutions.
    pub fn all() -> &'static [Resolution] {
        &[Self::Hd720, Self::Hd1080]
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Hd720 => write!(f, "720p"),
            Resolution::Hd1080 => write!(f, "1080p"),
        }
    }
}

/// Per-image display time in seconds, restricted to 2..=5.
///
/// This is the hold time before any transition overlap is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ImageDuration(u32);

impl ImageDuration {
    /// Smallest allowed duration.
    pub const MIN: u32 = 2;
    /// Largest allowed duration.
    pub const MAX: u32 = 5;

    /// Create a duration, rejecting values outside 2..=5.
    pub fn new(seconds: u32) -> Result<Self, SettingsError> {
        if (Self::MIN..=Self::MAX).contains(&seconds) {
            Ok(Self(seconds))
        } else {
            Err(SettingsError::ImageDuration(seconds))
        }
    }

    /// Duration in seconds as a float, for timing arithmetic.
    pub fn seconds(&self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<u32> for ImageDuration {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImageDuration> for u32 {
    fn from(value: ImageDuration) -> Self {
        value.0
    }
}

impl std::fmt::Display for ImageDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Transition effect blending one image into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Dissolve between adjacent images.
    Crossfade,
    /// Alternating zoom-out/zoom-in pan-and-scale effect with dissolves.
    Kenburns,
    /// Directional wipe between adjacent images.
    Slide,
    /// Continuous centered zoom-in per image, concatenated.
    Zoom,
}

impl Transition {
    /// Get all available transitions.
    pub fn all() -> &'static [Transition] {
        &[Self::Crossfade, Self::Kenburns, Self::Slide, Self::Zoom]
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Crossfade => write!(f, "crossfade"),
            Transition::Kenburns => write!(f, "kenburns"),
            Transition::Slide => write!(f, "slide"),
            Transition::Zoom => write!(f, "zoom"),
        }
    }
}

/// Immutable render configuration for one job.
///
/// Constructed once from a validated external request, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub resolution: Resolution,
    #[serde(rename = "imageDuration")]
    pub image_duration: ImageDuration,
    #[serde(rename = "transitionType")]
    pub transition: Transition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_serializes_wire_name() {
        let json = serde_json::to_string(&Resolution::Hd720).unwrap();
        assert_eq!(json, "\"720p\"");
        let back: Resolution = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(back, Resolution::Hd1080);
    }

    #[test]
    fn resolution_dimensions() {
        assert_eq!(Resolution::Hd720.dimensions(), (1280, 720));
        assert_eq!(Resolution::Hd1080.dimensions(), (1920, 1080));
    }

    #[test]
    fn image_duration_rejects_out_of_domain() {
        assert!(ImageDuration::new(1).is_err());
        assert!(ImageDuration::new(6).is_err());
        for secs in 2..=5 {
            assert!(ImageDuration::new(secs).is_ok());
        }
    }

    #[test]
    fn image_duration_rejected_on_deserialize() {
        let err = serde_json::from_str::<ImageDuration>("7");
        assert!(err.is_err());
    }

    #[test]
    fn transition_serializes_lowercase() {
        let json = serde_json::to_string(&Transition::Kenburns).unwrap();
        assert_eq!(json, "\"kenburns\"");
    }

    #[test]
    fn settings_round_trip_matches_wire_format() {
        let json = r#"{"resolution":"720p","imageDuration":3,"transitionType":"slide"}"#;
        let settings: RenderSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.resolution, Resolution::Hd720);
        assert_eq!(u32::from(settings.image_duration), 3);
        assert_eq!(settings.transition, Transition::Slide);
        assert_eq!(serde_json::to_string(&settings).unwrap(), json);
    }
}
