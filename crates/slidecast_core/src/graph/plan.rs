//! Typed render plan.
//!
//! Intermediate representation between a render request and the encoder's
//! argument syntax: an ordered list of per-input processing stages plus a
//! description of how the resulting streams are chained into one output.

use std::path::PathBuf;

/// Frame rate every input is normalized to.
pub const FPS: u32 = 30;

/// Cross-transition overlap in seconds.
pub const TRANSITION_DURATION: f64 = 0.5;

/// One encoder input: a still image looped for a fixed hold time.
#[derive(Debug, Clone, PartialEq)]
pub struct InputClip {
    pub path: PathBuf,
    /// Seconds the looped image is held before filtering.
    pub hold: f64,
}

/// Direction of a continuous per-frame zoom ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomRamp {
    /// Zoom factor grows by `step` per frame, capped at `limit`.
    In { step: f64, limit: f64 },
    /// Zoom factor starts at `start` and shrinks by `step` per frame,
    /// floored at 1.0.
    Out { start: f64, step: f64 },
}

/// Zoom stage applied to a normalized stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomStage {
    pub ramp: ZoomRamp,
    /// Number of output frames the ramp runs for.
    pub frames: u32,
    /// Keep only the first decoded frame before zooming.
    pub first_frame_only: bool,
}

/// Per-input processing stage producing one normalized stream.
///
/// Every stage scales the input to fit the canvas preserving aspect ratio,
/// letterboxes it centered, and normalizes to [`FPS`] with square pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStage {
    /// Input index; the stage's output stream is addressed by it.
    pub index: usize,
    pub zoom: Option<ZoomStage>,
}

/// Encoder transition primitive used by a cross-transition chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XfadeKind {
    /// Dissolve.
    Fade,
    /// Directional wipe to the left.
    SlideLeft,
}

impl XfadeKind {
    /// Name of this transition in the encoder's filter syntax.
    pub fn as_str(&self) -> &'static str {
        match self {
            XfadeKind::Fade => "fade",
            XfadeKind::SlideLeft => "slideleft",
        }
    }
}

/// How the normalized streams combine into the output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSpec {
    /// Pairwise cross-transitions chained left to right: transition `i`
    /// consumes the output of transition `i-1` and the next raw stream.
    Xfade {
        kind: XfadeKind,
        /// Overlap duration in seconds.
        duration: f64,
        /// Start offset of transition `i`; always exactly N-1 entries for
        /// N inputs.
        offsets: Vec<f64>,
    },
    /// Plain concatenation in order, no overlap.
    Concat { count: usize },
}

/// Complete plan for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// Output canvas width in pixels.
    pub width: u32,
    /// Output canvas height in pixels.
    pub height: u32,
    pub inputs: Vec<InputClip>,
    pub streams: Vec<StreamStage>,
    pub chain: ChainSpec,
    /// Exact output length in seconds. This is the denominator for
    /// progress estimation and must match what the encoder produces.
    pub expected_duration: f64,
    /// Whether the encoder output is clamped to `expected_duration`.
    pub clamp_output: bool,
}

impl RenderPlan {
    /// Stream label mapped to the encoder's output.
    ///
    /// For a chain of N-1 transitions this is the final transition's
    /// output label.
    pub fn output_label(&self) -> String {
        match &self.chain {
            ChainSpec::Xfade { offsets, .. } => format!("vf{}", offsets.len().saturating_sub(1)),
            ChainSpec::Concat { .. } => "outv".to_string(),
        }
    }
}
