//! Serialization of a render plan into ffmpeg argument tokens.
//!
//! This layer is mechanical: all timing decisions were made by the builder.
//! Produces one normalized stream `[v{i}]` per input, the transition chain,
//! and the output mapping/codec options.

use std::path::Path;

use super::plan::{ChainSpec, RenderPlan, ZoomRamp, FPS};

/// Render the complete encoder argument list for a plan.
///
/// `stats_period` controls how often the encoder emits progress lines on
/// its diagnostic stream.
pub fn encoder_args(plan: &RenderPlan, output: &Path, stats_period: f64) -> Vec<String> {
    let mut args = Vec::new();

    for input in &plan.inputs {
        args.push("-loop".to_string());
        args.push("1".to_string());
        args.push("-t".to_string());
        args.push(fmt_num(input.hold));
        args.push("-i".to_string());
        args.push(input.path.to_string_lossy().into_owned());
    }

    args.push("-y".to_string());
    args.push("-stats_period".to_string());
    args.push(fmt_num(stats_period));
    args.push("-filter_complex".to_string());
    args.push(filter_graph(plan));
    args.push("-map".to_string());
    args.push(format!("[{}]", plan.output_label()));

    if plan.clamp_output {
        args.push("-t".to_string());
        args.push(fmt_num(plan.expected_duration));
    }

    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push("-c:v".to_string());
    args.push("libx264".to_string());
    args.push(output.to_string_lossy().into_owned());

    args
}

/// Build the complete filter graph string.
fn filter_graph(plan: &RenderPlan) -> String {
    let mut graph = String::new();

    for stream in &plan.streams {
        let (w, h) = (plan.width, plan.height);
        graph.push_str(&format!("[{}:v]", stream.index));

        if let Some(zoom) = &stream.zoom {
            if zoom.first_frame_only {
                graph.push_str("select=eq(n\\,0),");
            }
            graph.push_str(&normalize_prefix(w, h));
            graph.push_str(&format!(
                "zoompan=z={}:d={}:x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={w}x{h}:fps={FPS},setsar=1",
                zoom_expr(zoom.ramp),
                zoom.frames,
            ));
        } else {
            graph.push_str(&normalize_prefix(w, h));
            graph.push_str(&format!("setsar=1,fps={FPS}"));
        }

        graph.push_str(&format!("[v{}];", stream.index));
    }

    match &plan.chain {
        ChainSpec::Xfade {
            kind,
            duration,
            offsets,
        } => {
            for (i, offset) in offsets.iter().enumerate() {
                let left = if i == 0 {
                    format!("[v{i}]")
                } else {
                    format!(";[vf{}]", i - 1)
                };
                graph.push_str(&format!(
                    "{left}[v{}]xfade=transition={}:duration={}:offset={}[vf{i}]",
                    i + 1,
                    kind.as_str(),
                    fmt_num(*duration),
                    fmt_num(*offset),
                ));
            }
        }
        ChainSpec::Concat { count } => {
            for i in 0..*count {
                graph.push_str(&format!("[v{i}]"));
            }
            graph.push_str(&format!("concat=n={count}:v=1:a=0[outv]"));
        }
    }

    graph
}

/// Scale-to-fit plus centered letterbox padding, shared by every stream.
fn normalize_prefix(w: u32, h: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,"
    )
}

/// Zoompan `z` expression for a ramp, evaluated once per output frame.
fn zoom_expr(ramp: ZoomRamp) -> String {
    match ramp {
        ZoomRamp::In { step, limit } => format!("'min(zoom+{step},{limit})'"),
        // Starts at `start` on the first frame, then decays toward 1.0.
        ZoomRamp::Out { start, step } => {
            format!("'if(lte(on,1),{start},max(1.0,zoom-{step}))'")
        }
    }
}

/// Format a number the way the encoder expects: no trailing zeros, no
/// exponent (`3.5`, `0.5`, `12`).
fn fmt_num(value: f64) -> String {
    format!("{value}")
}
