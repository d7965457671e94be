//! End-to-end registry tests against a scripted stand-in encoder.
//!
//! The scripts accept the real generated argument list, treat the final
//! argument as the output path, and emit ffmpeg-shaped progress lines on
//! stderr.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use slidecast_core::models::{
    ImageDuration, RenderSettings, Resolution, SessionStatus, Transition,
};
use slidecast_core::registry::{RegistryError, RenderRegistry};
use slidecast_core::supervisor::EncoderSupervisor;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_inputs(dir: &Path, n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| {
            let path = dir.join(format!("img{i}.jpg"));
            fs::write(&path, b"not really a jpeg").unwrap();
            path
        })
        .collect()
}

fn settings() -> RenderSettings {
    RenderSettings {
        resolution: Resolution::Hd720,
        image_duration: ImageDuration::new(2).unwrap(),
        transition: Transition::Crossfade,
    }
}

fn registry_with(script: &Path, output_dir: &Path) -> RenderRegistry {
    let supervisor = Arc::new(EncoderSupervisor::new(script));
    RenderRegistry::new(supervisor, output_dir)
}

fn wait_for_terminal(registry: &RenderRegistry, id: &str) -> SessionStatus {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let report = registry.status(id).unwrap();
        if report.status.is_terminal() {
            return report.status;
        }
        assert!(Instant::now() < deadline, "session never finished");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn happy_path_renders_and_hands_out_artifact_once() {
    let dir = tempfile::tempdir().unwrap();
    // 3 images at 2s with crossfade run 5s total; the second progress line
    // lands exactly on the expected duration.
    let script = write_script(
        dir.path(),
        "encoder.sh",
        "#!/bin/sh\n\
         for arg in \"$@\"; do out=\"$arg\"; done\n\
         printf 'time=00:00:02.50\\r' 1>&2\n\
         printf 'time=00:00:05.00\\r' 1>&2\n\
         printf 'fake video bytes' > \"$out\"\n",
    );
    let inputs = write_inputs(dir.path(), 3);
    let registry = registry_with(&script, &dir.path().join("out"));

    let id = registry.submit(inputs.clone(), settings()).unwrap();
    assert_eq!(wait_for_terminal(&registry, &id), SessionStatus::Completed);

    let report = registry.status(&id).unwrap();
    assert_eq!(report.progress, 100.0);
    assert!(report.error.is_none());

    // Inputs are deleted as soon as the artifact exists.
    for input in &inputs {
        assert!(!input.exists());
    }

    let bytes = registry.fetch_output(&id).unwrap();
    assert_eq!(bytes, b"fake video bytes");

    // The artifact is single-use: session and file are gone.
    assert_eq!(registry.session_count(), 0);
    assert!(!dir.path().join("out").join(format!("{id}.mp4")).exists());
    assert!(matches!(
        registry.fetch_output(&id),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn encoder_failure_surfaces_stderr_tail() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "encoder.sh",
        "#!/bin/sh\nprintf 'No such filter: xfade\\n' 1>&2\nexit 2\n",
    );
    let inputs = write_inputs(dir.path(), 3);
    let registry = registry_with(&script, &dir.path().join("out"));

    let id = registry.submit(inputs.clone(), settings()).unwrap();
    assert_eq!(wait_for_terminal(&registry, &id), SessionStatus::Error);

    let report = registry.status(&id).unwrap();
    let message = report.error.unwrap();
    assert!(message.contains("No such filter"), "got: {message}");

    // Failed sessions leave no files behind.
    for input in &inputs {
        assert!(!input.exists());
    }
    assert!(matches!(
        registry.fetch_output(&id),
        Err(RegistryError::NotReady { .. })
    ));
}

#[test]
fn cancel_kills_encode_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "encoder.sh", "#!/bin/sh\nsleep 30\n");
    let inputs = write_inputs(dir.path(), 3);
    let registry = registry_with(&script, &dir.path().join("out"));

    let id = registry.submit(inputs.clone(), settings()).unwrap();
    // Let the render thread reach the encoder (or not; a pre-spawn cancel
    // must behave identically).
    std::thread::sleep(Duration::from_millis(100));

    registry.cancel(&id).unwrap();

    let report = registry.status(&id).unwrap();
    assert_eq!(report.status, SessionStatus::Cancelled);
    for input in &inputs {
        assert!(!input.exists());
    }
    assert!(!dir.path().join("out").join(format!("{id}.mp4")).exists());

    // Cancelling twice is a state conflict, not a crash.
    assert!(matches!(
        registry.cancel(&id),
        Err(RegistryError::StateConflict { .. })
    ));
    assert!(matches!(
        registry.fetch_output(&id),
        Err(RegistryError::NotReady { .. })
    ));
}

#[test]
fn progress_is_strictly_increasing_and_capped() {
    let dir = tempfile::tempdir().unwrap();
    // Repeats and regressions in the stream must never move progress
    // backwards, and overshoot is clamped to 100.
    let script = write_script(
        dir.path(),
        "encoder.sh",
        "#!/bin/sh\n\
         for arg in \"$@\"; do out=\"$arg\"; done\n\
         printf 'time=00:00:01.00\\r' 1>&2\n\
         printf 'time=00:00:01.00\\r' 1>&2\n\
         printf 'frame=   15\\r' 1>&2\n\
         printf 'time=00:00:09.99\\r' 1>&2\n\
         printf 'done' > \"$out\"\n",
    );
    let inputs = write_inputs(dir.path(), 3);
    let registry = registry_with(&script, &dir.path().join("out"));

    let id = registry.submit(inputs, settings()).unwrap();
    assert_eq!(wait_for_terminal(&registry, &id), SessionStatus::Completed);

    assert_eq!(registry.status(&id).unwrap().progress, 100.0);
}
