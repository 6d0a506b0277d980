//! # Raymarch frame loop
//!
//! Loads the scene, picks a buffer backend and drives
//! [`SceneManager::frame`] once per frame until the configured frame count
//! is reached. Top-level nodes are animated so steady frames exercise the
//! in-place transform update, and the scene file is reloaded when it changes
//! on disk.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::Result;
use raymarch::animation::Bobber;
use raymarch::config::{BackendKind, RuntimeConfig};
use raymarch::scene_file::{load_scene, LoadedScene};
use render::{
    FrameReport, FrameStatus, FrameUniforms, HostBackend, HostShapeBinding, SceneManager,
    ShapeBinding, ShapeBufferBackend, SyncOutcome, WgpuShapeBackend, WgpuShapeBinding,
};
use tracing::{debug, error, info, warn};

use crate::watcher;

/// Per-run counters logged at shutdown.
#[derive(Debug, Default, Clone, Copy)]
struct FrameTotals {
    frames: u64,
    skipped: u64,
    repacks: u64,
    updates: u64,
    records_updated: u64,
    unchanged: u64,
    failures: u64,
    reloads: u64,
}

impl FrameTotals {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        match report.status {
            FrameStatus::Skipped => self.skipped += 1,
            FrameStatus::Synced(SyncOutcome::Repacked { .. }) => self.repacks += 1,
            FrameStatus::Synced(SyncOutcome::Updated { records }) => {
                self.updates += 1;
                self.records_updated += records as u64;
            }
            FrameStatus::Synced(SyncOutcome::Unchanged) => self.unchanged += 1,
        }
    }
}

/// Runs the frame loop described by `config`.
///
/// # Errors
///
/// Fails when the initial scene cannot be loaded or, with the wgpu backend,
/// when no device is available. Per-frame upload failures and failed reloads
/// are logged and the loop carries on.
pub fn run(config: &RuntimeConfig) -> Result<()> {
    let scene = load_scene(&config.scene)?;

    match config.backend {
        BackendKind::Headless => {
            info!("Using host-memory shape buffers");
            drive(config, scene, HostBackend::new(), HostShapeBinding::new())
        }
        BackendKind::Wgpu => {
            let backend = WgpuShapeBackend::new_headless()?;
            let binding =
                WgpuShapeBinding::new(backend.device().clone(), backend.queue().clone());
            drive(config, scene, backend, binding)
        }
    }
}

fn start_watcher(config: &RuntimeConfig) -> Option<(notify::RecommendedWatcher, Receiver<PathBuf>)> {
    if !config.watch {
        return None;
    }
    match watcher::start(&config.scene) {
        Ok(watch) => Some(watch),
        Err(e) => {
            error!("Failed to start scene watcher: {e:?}");
            None
        }
    }
}

fn drive<B, S>(config: &RuntimeConfig, mut scene: LoadedScene, backend: B, mut binding: S) -> Result<()>
where
    B: ShapeBufferBackend,
    S: ShapeBinding<B::Buffer>,
{
    let scene_watch = start_watcher(config);
    let mut manager = SceneManager::new(backend);
    let mut bobber = Bobber::new(&scene.graph, &config.animation);
    let mut totals = FrameTotals::default();
    let frame_interval = config.frame_interval();
    let started = Instant::now();

    if config.frames == 0 {
        info!("Starting frame loop, running until interrupted...");
    } else {
        info!("Starting frame loop for {} frames...", config.frames);
    }

    while config.frames == 0 || totals.frames < config.frames {
        let frame_start = Instant::now();

        if let Some((_, reloads)) = &scene_watch {
            if reloads.try_iter().count() > 0 {
                match load_scene(&config.scene) {
                    Ok(reloaded) => {
                        scene = reloaded;
                        bobber = Bobber::new(&scene.graph, &config.animation);
                        manager.notify_scene_changed();
                        totals.reloads += 1;
                        info!("Scene reloaded");
                    }
                    Err(e) => error!("Failed to reload scene, keeping previous one: {e:#}"),
                }
            }
        }

        bobber.apply(&mut scene.graph, started.elapsed().as_secs_f32());
        let uniforms = FrameUniforms::new(&scene.camera, scene.light.as_ref());

        match manager.frame(&mut scene.shapes, &scene.graph, &mut binding, &uniforms) {
            Ok(report) => {
                totals.record(&report);
                if report.status == FrameStatus::Skipped {
                    warn!("Frame {} skipped: shader binding not ready", report.frame);
                }
                if config.report_every > 0 && report.frame % config.report_every == 0 {
                    info!(
                        "Frame {} complete. Shapes: {}, last sync: {:?}",
                        report.frame, report.shape_count, report.status
                    );
                } else {
                    debug!("Frame {}: {:?}", report.frame, report.status);
                }
            }
            Err(e) => {
                totals.frames += 1;
                totals.failures += 1;
                error!("Frame {} failed: {e}", totals.frames);
            }
        }

        if let Some(interval) = frame_interval {
            let frame_time = frame_start.elapsed();
            if frame_time < interval {
                std::thread::sleep(interval - frame_time);
            }
        }
    }

    manager.shutdown(&mut binding);
    info!(
        "Ran {} frames in {:.2?}: {} repacks, {} in-place updates ({} records), {} unchanged, {} skipped, {} failed, {} reloads",
        totals.frames,
        started.elapsed(),
        totals.repacks,
        totals.updates,
        totals.records_updated,
        totals.unchanged,
        totals.skipped,
        totals.failures,
        totals.reloads
    );
    Ok(())
}
