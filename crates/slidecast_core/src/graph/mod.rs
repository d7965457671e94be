//! Render graph construction.
//!
//! A render request is first translated into a typed plan (`plan`) carrying
//! the timing arithmetic for the four transition algorithms (`builder`),
//! then serialized into the encoder's argument syntax (`args`). The split
//! keeps the algorithm logic testable without touching filter-string
//! textual details.

mod args;
mod builder;
mod plan;

pub use args::encoder_args;
pub use builder::build_plan;
pub use plan::{
    ChainSpec, InputClip, RenderPlan, StreamStage, XfadeKind, ZoomRamp, ZoomStage, FPS,
    TRANSITION_DURATION,
};
