//! Render plan construction for the four transition algorithms.
//!
//! Pure and deterministic: `(image paths, settings)` in, plan out. The
//! settings are validated at construction, so every transition value is
//! handled here and the builder cannot fail on valid input.

use std::path::PathBuf;

use crate::models::{RenderSettings, Transition};

use super::plan::{
    ChainSpec, InputClip, RenderPlan, StreamStage, XfadeKind, ZoomRamp, ZoomStage, FPS,
    TRANSITION_DURATION,
};

/// Per-frame zoom increment for the plain zoom transition.
const ZOOM_STEP: f64 = 0.0015;
/// Zoom cap for the plain zoom transition.
const ZOOM_LIMIT: f64 = 1.5;
/// Per-frame ramp step for the Ken Burns effect.
const KENBURNS_STEP: f64 = 0.002;
/// Zoom-in cap for odd-indexed Ken Burns images.
const KENBURNS_IN_LIMIT: f64 = 1.3;
/// Zoom-out start for even-indexed Ken Burns images.
const KENBURNS_OUT_START: f64 = 1.5;

/// Build the render plan for the given images and settings.
///
/// `expected_duration` in the returned plan matches the encoder's actual
/// output length exactly; it is later used as the progress denominator.
pub fn build_plan(images: &[PathBuf], settings: &RenderSettings) -> RenderPlan {
    let (width, height) = settings.resolution.dimensions();
    let duration = settings.image_duration.seconds();
    let count = images.len();

    match settings.transition {
        Transition::Crossfade => xfade_plan(
            images,
            width,
            height,
            duration,
            XfadeKind::Fade,
            KenburnsZoom::Off,
        ),
        Transition::Slide => xfade_plan(
            images,
            width,
            height,
            duration,
            XfadeKind::SlideLeft,
            KenburnsZoom::Off,
        ),
        Transition::Kenburns => xfade_plan(
            images,
            width,
            height,
            duration,
            XfadeKind::Fade,
            KenburnsZoom::On,
        ),
        Transition::Zoom => {
            let frames = (duration * f64::from(FPS)) as u32;
            RenderPlan {
                width,
                height,
                inputs: input_clips(images, duration),
                streams: (0..count)
                    .map(|index| StreamStage {
                        index,
                        zoom: Some(ZoomStage {
                            ramp: ZoomRamp::In {
                                step: ZOOM_STEP,
                                limit: ZOOM_LIMIT,
                            },
                            frames,
                            first_frame_only: true,
                        }),
                    })
                    .collect(),
                chain: ChainSpec::Concat { count },
                expected_duration: count as f64 * duration,
                clamp_output: true,
            }
        }
    }
}

/// Whether the xfade chain carries alternating Ken Burns zoom stages.
enum KenburnsZoom {
    Off,
    On,
}

/// Plan for the cross-transition family (crossfade, slide, kenburns).
///
/// With N inputs there are exactly N-1 chained transitions; transition `i`
/// starts at `duration * (i+1) - 0.5`. Total output length is
/// `N * duration - 0.5 * (N-1)`.
fn xfade_plan(
    images: &[PathBuf],
    width: u32,
    height: u32,
    duration: f64,
    kind: XfadeKind,
    kenburns: KenburnsZoom,
) -> RenderPlan {
    let count = images.len();

    let (hold, clamp_output) = match kenburns {
        // Plain cross-transitions extend each input by the overlap.
        KenburnsZoom::Off => (duration + TRANSITION_DURATION, false),
        // Ken Burns extends via the zoom stage's frame count instead and
        // clamps the output to the exact total.
        KenburnsZoom::On => (duration, true),
    };

    let streams = (0..count)
        .map(|index| StreamStage {
            index,
            zoom: match kenburns {
                KenburnsZoom::Off => None,
                KenburnsZoom::On => Some(ZoomStage {
                    ramp: if index % 2 == 0 {
                        ZoomRamp::Out {
                            start: KENBURNS_OUT_START,
                            step: KENBURNS_STEP,
                        }
                    } else {
                        ZoomRamp::In {
                            step: KENBURNS_STEP,
                            limit: KENBURNS_IN_LIMIT,
                        }
                    },
                    frames: ((duration + TRANSITION_DURATION) * f64::from(FPS)) as u32,
                    first_frame_only: false,
                }),
            },
        })
        .collect();

    let offsets = (0..count.saturating_sub(1))
        .map(|i| duration * (i + 1) as f64 - TRANSITION_DURATION)
        .collect();

    RenderPlan {
        width,
        height,
        inputs: input_clips(images, hold),
        streams,
        chain: ChainSpec::Xfade {
            kind,
            duration: TRANSITION_DURATION,
            offsets,
        },
        expected_duration: count as f64 * duration
            - TRANSITION_DURATION * (count as f64 - 1.0),
        clamp_output,
    }
}

fn input_clips(images: &[PathBuf], hold: f64) -> Vec<InputClip> {
    images
        .iter()
        .map(|path| InputClip {
            path: path.clone(),
            hold,
        })
        .collect()
}
