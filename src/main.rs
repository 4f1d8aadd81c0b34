// src/main.rs - Headless replay of a recorded tracking session
use anyhow::{bail, Context, Result};
use rig_driver::app::RigSession;
use rig_driver::config::EngineSettings;
use rig_driver::data::{default_output_dir, DebugRecorder};
use rig_driver::idle::IdleClip;
use rig_driver::replay::{self, Recording};
use rig_driver::skeleton::Skeleton;
use rig_driver::storage::FileStorage;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(recording_path) = args.next() else {
        bail!("usage: rig_driver <recording.json> [output_dir]");
    };
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(default_output_dir);

    let recording = Recording::load(&recording_path)?;
    let settings = EngineSettings {
        profile: recording.profile,
        ..Default::default()
    };

    let storage = FileStorage::default_location();
    tracing::info!("settings stored in {}", storage.dir().display());

    let idle_clip = recording
        .idle_clip
        .as_ref()
        .and_then(|clip| IdleClip::from_source(clip, recording.profile));
    let mut session = RigSession::new(Skeleton::humanoid(), settings, Box::new(storage))
        .with_idle_clip(idle_clip)
        .with_solver_config(recording.solver.clone().unwrap_or_default());

    let mut recorder = DebugRecorder::new(&output_dir, None);
    let summary = replay::run(&recording, &mut session, &mut recorder);

    let csv_path = recorder
        .export_csv()
        .with_context(|| format!("failed to export ticks under {}", output_dir.display()))?;
    let snapshot_path = recorder.export_snapshot(&session).context("failed to export snapshot")?;

    println!(
        "{} frames ({} live / {} idle), {} solve errors",
        summary.frames,
        summary.live_ticks,
        summary.idle_ticks,
        session.metrics().error_count
    );
    println!("ticks:    {}", csv_path.display());
    println!("snapshot: {}", snapshot_path.display());
    Ok(())
}
